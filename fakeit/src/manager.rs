// vim: tw=80
//! The per-fake dispatcher: rule set, fallback and history.

use std::{
    fmt,
    sync::{Arc, Mutex}
};

use tracing::{debug, trace};

use crate::{
    call::{ArgumentList, CallDescriptor, FakeCall, FakeId},
    constraint::CallMatcher,
    error::{ConfigurationError, DispatchError, Exception},
    history::{CallOutcome, CallRecord, FakeHistory},
    lock,
    rule::{self, Base, Behavior, Rule},
    value::Value
};

type FallbackFn =
    dyn Fn(&FakeCall) -> Result<Option<Value>, DispatchError> + Send + Sync;

/// What a fake does with calls that no rule matches.  Always eligible.
#[derive(Clone)]
pub enum Fallback {
    /// Return the member's default value, or nothing for unit members.
    ReturnDefault,
    /// Forward the call to the underlying implementation.  Used by wrapping
    /// fakes.
    CallBase,
    Throw(Exception),
    Custom(Arc<FallbackFn>),
}

impl Fallback {
    pub fn custom<F>(f: F) -> Self
        where F: Fn(&FakeCall) -> Result<Option<Value>, DispatchError>
                 + Send + Sync + 'static
    {
        Fallback::Custom(Arc::new(f))
    }

    fn execute(&self, call: &mut FakeCall, base: &mut Base<'_>)
        -> Result<Option<Value>, DispatchError>
    {
        match self {
            Fallback::ReturnDefault => rule::default_value(call.member()),
            Fallback::CallBase => base(call),
            Fallback::Throw(e) => Err(DispatchError::Thrown(e.clone())),
            Fallback::Custom(f) => match f(call)? {
                Some(v) => rule::check_return(call.member(), v).map(Some),
                None => Ok(None)
            }
        }
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Fallback::ReturnDefault
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fallback::ReturnDefault => f.write_str("ReturnDefault"),
            Fallback::CallBase => f.write_str("CallBase"),
            Fallback::Throw(e) => f.debug_tuple("Throw").field(e).finish(),
            Fallback::Custom(_) => f.write_str("Custom")
        }
    }
}

#[derive(Debug, Default)]
struct RuleSet {
    rules: Vec<Rule>,
    fallback: Fallback,
}

impl RuleSet {
    /// Find the most recently added eligible rule matching the call and
    /// take one of its uses.
    fn claim(&mut self, call: &CallDescriptor) -> Option<(usize, Behavior)> {
        self.rules.iter_mut()
            .rev()
            .find(|r| r.is_eligible() && r.matcher().matches(call))
            .map(|r| {
                let behavior = r.claim();
                trace!(order = r.order(), remaining = ?r.remaining(),
                       "claimed a rule");
                (r.order(), behavior)
            })
    }
}

enum Selected {
    Rule(usize, Behavior),
    Fallback(Fallback),
}

/// The result of dispatching one call.
#[derive(Debug)]
pub struct Dispatched {
    /// What the caller of the faked member gets.
    pub result: Result<Option<Value>, DispatchError>,
    /// How the call was recorded.
    pub record: Arc<CallRecord>,
}

/// Owns everything that makes one fake behave like a fake: its rules, its
/// fallback and its history.
pub struct FakeManager {
    id: FakeId,
    type_name: String,
    rules: Mutex<RuleSet>,
    history: Arc<FakeHistory>,
}

impl FakeManager {
    pub fn new<S: Into<String>>(type_name: S) -> Self {
        let id = FakeId::next();
        FakeManager {
            id,
            type_name: type_name.into(),
            rules: Mutex::new(RuleSet::default()),
            history: FakeHistory::new(id)
        }
    }

    pub fn id(&self) -> FakeId {
        self.id
    }

    /// Name of the faked type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn history(&self) -> &Arc<FakeHistory> {
        &self.history
    }

    /// Add a rule that matches `matcher` and, until configured otherwise,
    /// does nothing.  Returns the rule's position, for later configuration.
    pub(crate) fn add_rule(&self, matcher: &CallMatcher)
        -> Result<usize, ConfigurationError>
    {
        if let Some(target) = matcher.target() {
            if target != self.id {
                return Err(ConfigurationError::ForeignTarget {
                    target: target.to_string(),
                    fake: self.id.to_string()
                });
            }
        }
        let matcher = matcher.clone().on(self.id);
        let mut rules = lock(&self.rules);
        let order = rules.rules.len();
        debug!(fake = %self.id, order, "added rule for {}", matcher);
        rules.rules.push(Rule::new(order, matcher));
        Ok(order)
    }

    /// Modify a rule in place.
    pub(crate) fn with_rule<F, R>(&self, order: usize, f: F) -> R
        where F: FnOnce(&mut Rule) -> R
    {
        f(&mut lock(&self.rules).rules[order])
    }

    pub fn set_fallback(&self, fallback: Fallback) {
        debug!(fake = %self.id, ?fallback, "fallback set");
        lock(&self.rules).fallback = fallback;
    }

    pub fn fallback(&self) -> Fallback {
        lock(&self.rules).fallback.clone()
    }

    /// How many rules have ever been added, including spent ones.
    pub fn rule_count(&self) -> usize {
        lock(&self.rules).rules.len()
    }

    /// Run one call through the rules and record it.
    ///
    /// `base` is the underlying implementation, used by rules and fallbacks
    /// that call it.
    pub fn dispatch(&self, descriptor: CallDescriptor, base: &mut Base<'_>)
        -> Dispatched
    {
        // Claim under the lock, but run user code outside of it so that
        // behaviors may call back into the same fake.
        let selected = {
            let mut rules = lock(&self.rules);
            match rules.claim(&descriptor) {
                Some((order, behavior)) => Selected::Rule(order, behavior),
                None => Selected::Fallback(rules.fallback.clone())
            }
        };
        let mut call = FakeCall::new(descriptor);
        let result = match selected {
            Selected::Rule(order, behavior) => {
                debug!(fake = %self.id, order, "{} matched a rule", call);
                behavior.execute(&mut call, base)
            },
            Selected::Fallback(fallback) => {
                debug!(fake = %self.id, ?fallback, "no rule matched {}", call);
                fallback.execute(&mut call, base)
            }
        };
        let outcome = match &result {
            Ok(v) => CallOutcome::Returned(v.clone()),
            Err(DispatchError::Thrown(e)) => CallOutcome::Threw(e.clone()),
            Err(e) => CallOutcome::Failed(e.to_string())
        };
        let (member, values) = call.into_parts();
        let record = self.history.append(ArgumentList::new(member, values),
                                         outcome);
        Dispatched{result, record}
    }
}

impl fmt::Debug for FakeManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FakeManager")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::{
        member::Member,
        rule::{Action, Producer, Uses},
        values
    };

    fn get_count() -> Member {
        Member::method("Counter", "get_count").returns::<i32>()
    }

    fn no_base(_: &mut FakeCall) -> Result<Option<Value>, DispatchError> {
        Err(DispatchError::NoBaseMethod{member: "none".to_owned()})
    }

    fn call(m: &FakeManager) -> Dispatched {
        let d = CallDescriptor::new(get_count(), m.id(), values![]).unwrap();
        m.dispatch(d, &mut no_base)
    }

    fn returns(m: &FakeManager, v: i32, uses: Uses) -> usize {
        let order = m.add_rule(&CallMatcher::new(&get_count())).unwrap();
        m.with_rule(order, |r| {
            let link = r.last_link();
            link.behavior.set_action(
                Action::Return(Producer::Const(Value::new(v))));
            link.uses = uses;
        });
        order
    }

    #[test]
    fn fallback_returns_default() {
        let m = FakeManager::new("Counter");
        let d = call(&m);
        assert_eq!(Some(Value::new(0i32)), d.result.unwrap());
        assert_eq!(1, m.history().len());
    }

    #[test]
    fn most_recent_rule_wins() {
        let m = FakeManager::new("Counter");
        returns(&m, 1, Uses::Unbounded);
        returns(&m, 2, Uses::Unbounded);
        assert_eq!(Some(Value::new(2i32)), call(&m).result.unwrap());
    }

    #[test]
    fn spent_rule_falls_through() {
        let m = FakeManager::new("Counter");
        returns(&m, 1, Uses::Unbounded);
        returns(&m, 2, Uses::Remaining(1));
        assert_eq!(Some(Value::new(2i32)), call(&m).result.unwrap());
        assert_eq!(Some(Value::new(1i32)), call(&m).result.unwrap());
        assert_eq!(2, m.rule_count());
    }

    #[test]
    fn throw_is_recorded() {
        let m = FakeManager::new("Counter");
        m.set_fallback(Fallback::Throw(Exception::msg("nope")));
        let d = call(&m);
        assert_eq!("nope", d.result.unwrap_err().to_string());
        assert!(d.record.threw());
        assert_eq!(1, m.history().len());
    }

    #[test]
    fn call_base_fallback() {
        let m = FakeManager::new("Counter");
        m.set_fallback(Fallback::CallBase);
        let d = call(&m);
        assert!(matches!(d.result, Err(DispatchError::NoBaseMethod{..})));
        assert!(matches!(d.record.outcome(), CallOutcome::Failed(_)));
    }

    #[test]
    fn custom_fallback_is_type_checked() {
        let m = FakeManager::new("Counter");
        m.set_fallback(Fallback::custom(|_| Ok(Some(Value::new("x")))));
        let d = call(&m);
        assert!(matches!(d.result,
                         Err(DispatchError::ReturnTypeMismatch{..})));
    }

    #[test]
    fn foreign_target() {
        let m = FakeManager::new("Counter");
        let matcher = CallMatcher::new(&get_count()).on(FakeId::next());
        let e = m.add_rule(&matcher).unwrap_err();
        assert!(matches!(e, ConfigurationError::ForeignTarget{..}));
    }

    #[test]
    fn rules_only_match_their_own_fake() {
        let m1 = FakeManager::new("Counter");
        let m2 = FakeManager::new("Counter");
        returns(&m1, 5, Uses::Unbounded);
        assert_eq!(Some(Value::new(0i32)), call(&m2).result.unwrap());
    }

    #[test]
    fn reentrant_behavior() {
        let m = Arc::new(FakeManager::new("Counter"));
        let order = m.add_rule(&CallMatcher::new(&get_count())).unwrap();
        let weak = Arc::downgrade(&m);
        m.with_rule(order, |r| {
            r.last_link().uses = Uses::Remaining(1);
            r.last_link().behavior.set_action(Action::Return(
                Producer::lazy(move |_| {
                    let m = weak.upgrade().unwrap();
                    let inner = call(&m).result.unwrap().unwrap();
                    let n = inner.downcast::<i32>().unwrap();
                    Value::new(n + 1)
                })));
        });
        assert_eq!(Some(Value::new(1i32)), call(&m).result.unwrap());
        assert_eq!(2, m.history().len());
    }
}
