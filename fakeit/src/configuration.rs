// vim: tw=80
//! The fluent surface used to build rules.

use std::{
    any::{self, TypeId},
    error,
    fmt
};

use crate::{
    call::FakeCall,
    constraint::{ArgumentConstraint, CallMatcher},
    error::{ConfigurationError, Exception},
    manager::FakeManager,
    member::{Member, Output},
    rule::{Action, Producer, Rule, Uses},
    value::{Argument, Value}
};

/// Configures one rule of a fake.
///
/// Returned by [`Fake::configure`](crate::Fake::configure).  Every method
/// changes the rule in place, so the rule is already active while it is
/// being configured.  Methods that can't be misused return `&mut Self`;
/// the others return a `Result` and leave the rule unchanged on error.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// let get = Member::method("Store", "get").returns::<i32>();
/// let fake = Fake::dynamic("Store");
/// fake.configure(&CallMatcher::new(&get)).unwrap()
///     .returns(1i32).unwrap()
///     .once()
///     .then().unwrap()
///     .returns(2i32).unwrap();
/// assert_eq!(1, fake.call_as::<i32>(&get, values![]).unwrap());
/// assert_eq!(2, fake.call_as::<i32>(&get, values![]).unwrap());
/// assert_eq!(2, fake.call_as::<i32>(&get, values![]).unwrap());
/// ```
pub struct RuleGuard<'a> {
    manager: &'a FakeManager,
    order: usize,
    member: Member,
}

impl<'a> RuleGuard<'a> {
    pub(crate) fn new(manager: &'a FakeManager, matcher: &CallMatcher)
        -> Result<Self, ConfigurationError>
    {
        let order = manager.add_rule(matcher)?;
        let member = matcher.member().clone();
        Ok(RuleGuard{manager, order, member})
    }

    fn update<F: FnOnce(&mut Rule)>(&mut self, f: F) -> &mut Self {
        self.manager.with_rule(self.order, f);
        self
    }

    fn set_action(&mut self, action: Action) -> &mut Self {
        self.update(|r| r.last_link().behavior.set_action(action))
    }

    fn check_return_type<T: Argument>(&self) -> Result<(), ConfigurationError>
    {
        match self.member.output() {
            Output::Unit => Err(ConfigurationError::NoReturnValue {
                member: self.member.to_string()
            }),
            o if !o.accepts(TypeId::of::<T>()) =>
                Err(ConfigurationError::ReturnTypeMismatch {
                    member: self.member.to_string(),
                    expected: o.type_name(),
                    actual: any::type_name::<T>()
                }),
            _ => Ok(())
        }
    }

    /// The member this rule applies to
    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Return a clone of `t` from every matching call.
    pub fn returns<T: Argument>(&mut self, t: T)
        -> Result<&mut Self, ConfigurationError>
    {
        self.check_return_type::<T>()?;
        Ok(self.set_action(Action::Return(Producer::Const(Value::new(t)))))
    }

    /// Compute the return value from the call.
    ///
    /// `f` is not locked while it runs, so it may call the fake again, even
    /// through this same rule.  Keep mutable state behind a `Mutex` or an
    /// atomic.
    pub fn returns_lazily<T, F>(&mut self, f: F)
        -> Result<&mut Self, ConfigurationError>
        where T: Argument, F: Fn(&FakeCall) -> T + Send + Sync + 'static
    {
        self.check_return_type::<T>()?;
        let p = Producer::lazy(move |call: &FakeCall| Value::new(f(call)));
        Ok(self.set_action(Action::Return(p)))
    }

    /// Single-threaded version of [`returns_lazily`](#method.returns_lazily).
    /// The fake must only be called from the thread that configured it, and
    /// a recursive call through `f` fails with [`DispatchError::Reentrant`].
    ///
    /// [`DispatchError::Reentrant`]: crate::DispatchError::Reentrant
    pub fn returns_lazily_st<T, F>(&mut self, mut f: F)
        -> Result<&mut Self, ConfigurationError>
        where T: Argument, F: FnMut(&FakeCall) -> T + 'static
    {
        self.check_return_type::<T>()?;
        let p = Producer::lazy_st(move |call: &FakeCall| Value::new(f(call)));
        Ok(self.set_action(Action::Return(p)))
    }

    /// Raise `e` to the caller of every matching call.
    pub fn throws<E>(&mut self, e: E) -> &mut Self
        where E: error::Error + Send + Sync + 'static
    {
        self.set_action(Action::Throw(Producer::Const(Exception::new(e))))
    }

    /// Build a new error for every matching call.
    pub fn throws_lazily<E, F>(&mut self, f: F) -> &mut Self
        where E: error::Error + Send + Sync + 'static,
              F: Fn(&FakeCall) -> E + Send + Sync + 'static
    {
        let p = Producer::lazy(move |call: &FakeCall| Exception::new(f(call)));
        self.set_action(Action::Throw(p))
    }

    /// Run `f` before the rule's action.  May be given more than once; the
    /// callbacks run in the order they were added.  Like
    /// [`returns_lazily`](#method.returns_lazily), `f` may call the fake
    /// again.
    pub fn invokes<F>(&mut self, f: F) -> &mut Self
        where F: Fn(&FakeCall) + Send + Sync + 'static
    {
        self.update(|r| r.last_link().behavior.add_side_effect(f))
    }

    /// Single-threaded version of [`invokes`](#method.invokes).
    pub fn invokes_st<F>(&mut self, f: F) -> &mut Self
        where F: FnMut(&FakeCall) + 'static
    {
        self.update(|r| r.last_link().behavior.add_side_effect_st(f))
    }

    /// Forward matching calls to the underlying implementation.
    pub fn calls_base_method(&mut self) -> &mut Self {
        self.set_action(Action::CallBase)
    }

    /// Return the default value, or nothing.
    pub fn does_nothing(&mut self) -> &mut Self {
        self.set_action(Action::DoNothing)
    }

    /// Write `values` to the member's out and ref parameters, in order, after
    /// the action has run.
    pub fn assigns_out_and_ref_parameters(&mut self, values: Vec<Value>)
        -> Result<&mut Self, ConfigurationError>
    {
        let indices = self.member.out_and_ref_indices();
        if indices.len() != values.len() {
            return Err(ConfigurationError::OutAndRefCountMismatch {
                member: self.member.to_string(),
                expected: indices.len(),
                actual: values.len()
            });
        }
        for (i, v) in indices.into_iter().zip(values.iter()) {
            let p = &self.member.parameters()[i];
            if p.type_id() != v.type_id() {
                return Err(ConfigurationError::ArgumentTypeMismatch {
                    member: self.member.to_string(),
                    index: i,
                    name: p.name().to_owned(),
                    expected: p.type_name(),
                    actual: v.type_name()
                });
            }
        }
        Ok(self.update(|r| r.last_link().behavior
            .set_out_and_ref(Producer::Const(values))))
    }

    /// Compute the out and ref values from the call.  Count and types are
    /// checked when the call happens.
    pub fn assigns_out_and_ref_parameters_lazily<F>(&mut self, f: F)
        -> &mut Self
        where F: Fn(&FakeCall) -> Vec<Value> + Send + Sync + 'static
    {
        self.update(|r| r.last_link().behavior
            .set_out_and_ref(Producer::lazy(f)))
    }

    /// Let the current behavior run `n` times, after which the rule moves on
    /// to the next behavior, or stops matching if there is none.
    pub fn number_of_times(&mut self, n: usize)
        -> Result<&mut Self, ConfigurationError>
    {
        if n == 0 {
            return Err(ConfigurationError::ZeroRepeat);
        }
        Ok(self.update(|r| r.last_link().uses = Uses::Remaining(n)))
    }

    pub fn once(&mut self) -> &mut Self {
        self.update(|r| r.last_link().uses = Uses::Remaining(1))
    }

    pub fn twice(&mut self) -> &mut Self {
        self.update(|r| r.last_link().uses = Uses::Remaining(2))
    }

    /// Start configuring the behavior used once the current one is spent.
    pub fn then(&mut self) -> Result<&mut Self, ConfigurationError> {
        self.manager.with_rule(self.order, Rule::then)?;
        Ok(self)
    }
}

impl<'a> fmt::Debug for RuleGuard<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RuleGuard")
            .field("fake", &self.manager.id())
            .field("order", &self.order)
            .field("member", self.member.id())
            .finish()
    }
}

/// Configures calls to a property setter.
///
/// Returned by [`Fake::configure_setter`](crate::Fake::configure_setter).
/// Choose which assigned values to match, then configure the rule as usual.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// # use std::sync::{Arc, Mutex};
/// let set_title = Member::setter::<String, _, _>("Widget", "title");
/// let fake = Fake::dynamic("Widget");
/// let hits = Arc::new(Mutex::new(0));
/// let h = hits.clone();
/// fake.configure_setter(&CallMatcher::new(&set_title)).unwrap()
///     .to(String::from("hello")).unwrap()
///     .invokes(move |_| *h.lock().unwrap() += 1);
/// fake.call(&set_title, values![String::from("hello")]).unwrap();
/// fake.call(&set_title, values![String::from("bye")]).unwrap();
/// assert_eq!(1, *hits.lock().unwrap());
/// ```
pub struct SetterGuard<'a> {
    manager: &'a FakeManager,
    matcher: CallMatcher,
}

impl<'a> SetterGuard<'a> {
    pub(crate) fn new(manager: &'a FakeManager, matcher: &CallMatcher)
        -> Result<Self, ConfigurationError>
    {
        if !matcher.member().is_setter() {
            return Err(ConfigurationError::NotASetter {
                member: matcher.member().to_string()
            });
        }
        Ok(SetterGuard{manager, matcher: matcher.clone()})
    }

    /// Only match assignments of `value`.
    pub fn to<T: Argument>(self, value: T)
        -> Result<RuleGuard<'a>, ConfigurationError>
    {
        self.to_matching(ArgumentConstraint::equal_to(value))
    }

    /// Only match assignments of values accepted by `constraint`.
    pub fn to_matching(self, constraint: ArgumentConstraint)
        -> Result<RuleGuard<'a>, ConfigurationError>
    {
        let matcher = self.matcher.set_last(constraint)?;
        RuleGuard::new(self.manager, &matcher)
    }

    /// Match assignments of any value.
    pub fn to_any_value(self) -> Result<RuleGuard<'a>, ConfigurationError> {
        self.to_matching(ArgumentConstraint::ignored())
    }
}

impl<'a> fmt::Debug for SetterGuard<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SetterGuard")
            .field("fake", &self.manager.id())
            .field("matcher", &self.matcher)
            .finish()
    }
}
