// vim: tw=80
//! Configured behaviors and the rules that select them.

use std::{
    cell::RefCell,
    fmt,
    sync::Arc
};

use fragile::Fragile;

use crate::{
    call::FakeCall,
    constraint::CallMatcher,
    error::{ConfigurationError, DispatchError, Exception},
    member::{Member, Output},
    value::Value
};

type Factory<T> =
    Arc<dyn Fn(&FakeCall) -> Result<T, DispatchError> + Send + Sync>;

/// Something that yields a value each time a behavior runs: either a
/// constant or a user closure.
///
/// Closures are shared, not locked, so a closure may call back into the fake
/// that is running it, even through the same rule.
pub(crate) enum Producer<T> {
    Const(T),
    Lazy(Factory<T>),
}

impl<T: Clone + 'static> Producer<T> {
    pub(crate) fn lazy<F>(f: F) -> Self
        where F: Fn(&FakeCall) -> T + Send + Sync + 'static
    {
        let factory: Factory<T> =
            Arc::new(move |call: &FakeCall| Ok(f(call)));
        Producer::Lazy(factory)
    }

    /// Like [`lazy`](#method.lazy), but for closures that are neither `Send`
    /// nor `Fn`.  Calling it from any thread but the one that created it will
    /// panic.
    pub(crate) fn lazy_st<F>(f: F) -> Self
        where F: FnMut(&FakeCall) -> T + 'static
    {
        Producer::Lazy(Arc::new(single_threaded(f)))
    }

    fn produce(&self, call: &FakeCall) -> Result<T, DispatchError> {
        match self {
            Producer::Const(t) => Ok(t.clone()),
            Producer::Lazy(f) => f(call)
        }
    }
}

/// Wrap a thread-bound `FnMut` so it can be stored like any other closure.
///
/// A closure that is already running can't be borrowed again, so a
/// recursive call through it fails with [`DispatchError::Reentrant`].
pub(crate) fn single_threaded<F, T>(f: F)
    -> impl Fn(&FakeCall) -> Result<T, DispatchError> + Send + Sync + 'static
    where F: FnMut(&FakeCall) -> T + 'static, T: 'static
{
    let fragile = Fragile::new(RefCell::new(f));
    move |call: &FakeCall| -> Result<T, DispatchError> {
        let mut f = fragile.get().try_borrow_mut()
            .map_err(|_| DispatchError::Reentrant {
                member: call.member().to_string()
            })?;
        Ok((*f)(call))
    }
}

impl<T: Clone> Clone for Producer<T> {
    fn clone(&self) -> Self {
        match self {
            Producer::Const(t) => Producer::Const(t.clone()),
            Producer::Lazy(f) => Producer::Lazy(f.clone())
        }
    }
}

/// What a behavior ultimately does with the call.
#[derive(Clone)]
pub(crate) enum Action {
    /// Return the member's default value, or nothing.
    DoNothing,
    Return(Producer<Value>),
    Throw(Producer<Exception>),
    /// Delegate to the underlying implementation.
    CallBase,
}

type SideEffect =
    Arc<dyn Fn(&FakeCall) -> Result<(), DispatchError> + Send + Sync>;

/// The underlying implementation of a call, if there is one.
pub(crate) type Base<'a> =
    dyn FnMut(&mut FakeCall) -> Result<Option<Value>, DispatchError> + 'a;

/// Everything one link of a rule does when it runs: side effects first, then
/// the action, then out and ref assignments.
#[derive(Clone)]
pub(crate) struct Behavior {
    side_effects: Vec<SideEffect>,
    action: Action,
    out_and_ref: Option<Producer<Vec<Value>>>,
}

impl Behavior {
    pub(crate) fn new() -> Self {
        Behavior {
            side_effects: Vec::new(),
            action: Action::DoNothing,
            out_and_ref: None
        }
    }

    pub(crate) fn set_action(&mut self, action: Action) {
        self.action = action;
    }

    pub(crate) fn add_side_effect<F>(&mut self, f: F)
        where F: Fn(&FakeCall) + Send + Sync + 'static
    {
        let effect: SideEffect = Arc::new(move |call: &FakeCall| {
            f(call);
            Ok(())
        });
        self.side_effects.push(effect);
    }

    pub(crate) fn add_side_effect_st<F>(&mut self, f: F)
        where F: FnMut(&FakeCall) + 'static
    {
        self.side_effects.push(Arc::new(single_threaded(f)));
    }

    pub(crate) fn set_out_and_ref(&mut self, values: Producer<Vec<Value>>) {
        self.out_and_ref = Some(values);
    }

    pub(crate) fn execute(&self, call: &mut FakeCall, base: &mut Base<'_>)
        -> Result<Option<Value>, DispatchError>
    {
        for f in self.side_effects.iter() {
            f(call)?;
        }
        let result = match &self.action {
            Action::DoNothing => default_value(call.member()),
            Action::Return(p) => {
                let v = p.produce(call)?;
                check_return(call.member(), v).map(Some)
            },
            Action::Throw(p) => Err(DispatchError::Thrown(p.produce(call)?)),
            Action::CallBase => base(call)
        }?;
        if let Some(p) = &self.out_and_ref {
            let values = p.produce(call)?;
            assign_out_and_ref(call, values)?;
        }
        Ok(result)
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let action = match self.action {
            Action::DoNothing => "DoNothing",
            Action::Return(_) => "Return",
            Action::Throw(_) => "Throw",
            Action::CallBase => "CallBase"
        };
        f.debug_struct("Behavior")
            .field("side_effects", &self.side_effects.len())
            .field("action", &action)
            .field("out_and_ref", &self.out_and_ref.is_some())
            .finish()
    }
}

/// What a call returns when nothing says otherwise.
pub(crate) fn default_value(member: &Member)
    -> Result<Option<Value>, DispatchError>
{
    match member.output() {
        Output::Unit => Ok(None),
        output => output.default_value()
            .map(Some)
            .ok_or_else(|| ConfigurationError::NoDefaultValue {
                member: member.to_string(),
                type_name: output.type_name()
            }.into())
    }
}

/// Check a produced return value against the member's output type.
pub(crate) fn check_return(member: &Member, v: Value)
    -> Result<Value, DispatchError>
{
    if member.output().accepts(v.type_id()) {
        Ok(v)
    } else {
        Err(DispatchError::ReturnTypeMismatch {
            member: member.to_string(),
            expected: member.output().type_name(),
            actual: v.type_name()
        })
    }
}

fn assign_out_and_ref(call: &mut FakeCall, values: Vec<Value>)
    -> Result<(), ConfigurationError>
{
    let indices = call.member().out_and_ref_indices();
    if indices.len() != values.len() {
        return Err(ConfigurationError::OutAndRefCountMismatch {
            member: call.member().to_string(),
            expected: indices.len(),
            actual: values.len()
        });
    }
    for (i, v) in indices.into_iter().zip(values) {
        call.set_value(i, v)?;
    }
    Ok(())
}

/// How many more times a link may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Uses {
    Unbounded,
    Remaining(usize),
}

#[derive(Debug)]
pub(crate) struct Link {
    pub(crate) behavior: Behavior,
    pub(crate) uses: Uses,
}

/// A matcher plus a chain of behaviors, consumed front to back.
///
/// A rule configured without `then` has a chain of one.  Spent rules stay
/// where they are; they just stop matching.
#[derive(Debug)]
pub(crate) struct Rule {
    order: usize,
    matcher: CallMatcher,
    links: Vec<Link>,
    head: usize,
}

impl Rule {
    pub(crate) fn new(order: usize, matcher: CallMatcher) -> Self {
        let link = Link{behavior: Behavior::new(), uses: Uses::Unbounded};
        Rule{order, matcher, links: vec![link], head: 0}
    }

    pub(crate) fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn matcher(&self) -> &CallMatcher {
        &self.matcher
    }

    pub(crate) fn is_eligible(&self) -> bool {
        self.links[self.head].uses != Uses::Remaining(0)
    }

    /// Take one use of the current link and return its behavior.  The caller
    /// must have checked [`is_eligible`](#method.is_eligible).
    pub(crate) fn claim(&mut self) -> Behavior {
        let n_links = self.links.len();
        let link = &mut self.links[self.head];
        let behavior = link.behavior.clone();
        if let Uses::Remaining(n) = &mut link.uses {
            *n -= 1;
            if *n == 0 && self.head + 1 < n_links {
                self.head += 1;
            }
        }
        behavior
    }

    /// How many more times the rule can match, or `None` if unbounded.
    pub(crate) fn remaining(&self) -> Option<usize> {
        self.links[self.head..].iter()
            .try_fold(0, |acc, link| match link.uses {
                Uses::Unbounded => None,
                Uses::Remaining(n) => Some(acc + n)
            })
    }

    /// The link being configured: always the last one.
    pub(crate) fn last_link(&mut self) -> &mut Link {
        let last = self.links.len() - 1;
        &mut self.links[last]
    }

    /// Start a new link after the last one, which must be finite.
    pub(crate) fn then(&mut self) -> Result<(), ConfigurationError> {
        if self.last_link().uses == Uses::Unbounded {
            return Err(ConfigurationError::ThenWithoutRepeat);
        }
        // A link that was spent before its successor existed is skipped.
        let spent = self.links[self.head].uses == Uses::Remaining(0);
        self.links.push(Link{behavior: Behavior::new(), uses: Uses::Unbounded});
        if spent {
            self.head = self.links.len() - 1;
        }
        Ok(())
    }
}
