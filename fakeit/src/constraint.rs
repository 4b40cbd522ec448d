// vim: tw=80
//! Argument constraints and call matchers.
//!
//! An [`ArgumentConstraint`] decides whether one actual argument is
//! acceptable.  A [`CallMatcher`] combines a member with one constraint per
//! parameter (plus an optional predicate over the whole argument list) and
//! decides whether a whole call is acceptable.  Both are used twice: by
//! rules, to pick a behavior, and by assertions, to count calls.

use std::{
    any::{self, TypeId},
    fmt,
    marker::PhantomData,
    sync::Arc
};

use predicates::prelude::*;
use predicates_tree::CaseTreeExt;

use crate::{
    call::{ArgumentList, CallDescriptor, FakeId},
    error::ConfigurationError,
    member::Member,
    value::{Argument, Value}
};

/// A `Predicate` with its argument type erased.
trait ErasedPredicate: Send + Sync {
    fn eval_value(&self, v: &Value) -> bool;

    /// Explain why `v` failed the predicate
    fn explain_value(&self, v: &Value) -> Option<String>;
}

struct TypedPredicate<T, P> {
    predicate: P,
    _t: PhantomData<fn(&T)>
}

impl<T, P> ErasedPredicate for TypedPredicate<T, P>
    where T: Argument, P: Predicate<T> + Send + Sync
{
    fn eval_value(&self, v: &Value) -> bool {
        v.downcast_ref::<T>()
            .map(|t| self.predicate.eval(t))
            .unwrap_or(false)
    }

    fn explain_value(&self, v: &Value) -> Option<String> {
        let t = v.downcast_ref::<T>()?;
        self.predicate.find_case(false, t)
            .map(|case| case.tree().to_string())
    }
}

#[derive(Clone)]
enum Kind {
    Equal(Value),
    Predicate {
        type_id: TypeId,
        type_name: &'static str,
        predicate: Arc<dyn ErasedPredicate>,
    },
    Ignored,
}

/// A named predicate over a single argument.
///
/// Constraints are immutable once built and cheap to clone.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// # use fakeit::predicate::*;
/// let positive = ArgumentConstraint::that::<i32, _>(gt(0));
/// assert!(positive.matches(&Value::new(5i32)));
/// assert!(!positive.matches(&Value::new(-5i32)));
/// assert_eq!("var > 0", positive.to_string());
/// ```
#[derive(Clone)]
pub struct ArgumentConstraint {
    kind: Kind,
    description: String,
}

impl ArgumentConstraint {
    /// Matches arguments equal to `t`.
    pub fn equal_to<T: Argument>(t: T) -> Self {
        let value = Value::new(t);
        let description = format!("{:?}", value);
        ArgumentConstraint{kind: Kind::Equal(value), description}
    }

    /// Matches anything.  Used for arguments whose value doesn't matter, like
    /// out parameters.
    pub fn ignored() -> Self {
        ArgumentConstraint {
            kind: Kind::Ignored,
            description: "<Ignored>".to_owned()
        }
    }

    /// Matches arguments accepted by a [`Predicate`].  The predicate's
    /// `Display` output becomes the description.
    ///
    /// The argument type usually has to be named, because most predicates
    /// can evaluate more than one type: `that::<u32, _>(predicate::eq(5))`.
    pub fn that<T, P>(predicate: P) -> Self
        where T: Argument, P: Predicate<T> + Send + Sync + 'static
    {
        let description = predicate.to_string();
        let predicate = TypedPredicate{predicate, _t: PhantomData};
        ArgumentConstraint {
            kind: Kind::Predicate {
                type_id: TypeId::of::<T>(),
                type_name: any::type_name::<T>(),
                predicate: Arc::new(predicate)
            },
            description
        }
    }

    /// Matches arguments for which `f` returns true.
    ///
    /// This is equivalent to calling [`that`](#method.that) with a function
    /// predicate, like `that(predicate::function(f))`, but with a better
    /// description.
    pub fn matching<T, F, D>(f: F, description: D) -> Self
        where T: Argument,
              F: Fn(&T) -> bool + Send + Sync + 'static,
              D: Into<String>
    {
        let mut c = Self::that::<T, _>(predicate::function(f));
        c.description = description.into();
        c
    }

    pub fn matches(&self, v: &Value) -> bool {
        match &self.kind {
            Kind::Equal(expected) => expected == v,
            Kind::Predicate{predicate, ..} => predicate.eval_value(v),
            Kind::Ignored => true
        }
    }

    /// A case tree explaining why `v` was rejected, when the constraint can
    /// provide one.
    pub fn explain(&self, v: &Value) -> Option<String> {
        match &self.kind {
            Kind::Predicate{predicate, ..} => predicate.explain_value(v),
            _ => None
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.kind, Kind::Ignored)
    }

    /// The argument type this constraint can match, if it cares.
    fn type_id(&self) -> Option<(TypeId, &'static str)> {
        match &self.kind {
            Kind::Equal(v) => Some((v.type_id(), v.type_name())),
            Kind::Predicate{type_id, type_name, ..} =>
                Some((*type_id, *type_name)),
            Kind::Ignored => None
        }
    }
}

impl fmt::Debug for ArgumentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("ArgumentConstraint").field(&self.description).finish()
    }
}

impl fmt::Display for ArgumentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[derive(Clone)]
struct ArgumentsPredicate {
    f: Arc<dyn Fn(&ArgumentList) -> bool + Send + Sync>,
    description: String,
}

/// Everything needed to recognize a call: the member, optionally the fake it
/// was made on, one constraint per argument, and optionally a predicate over
/// the whole argument list.
///
/// The same matcher drives rules and assertions.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// # use fakeit::predicate::*;
/// let add = Member::method("Calculator", "add")
///     .param::<i32>("a")
///     .param::<i32>("b")
///     .returns::<i32>();
/// let m = CallMatcher::new(&add)
///     .with(0, ArgumentConstraint::equal_to(1i32)).unwrap()
///     .with(1, ArgumentConstraint::that::<i32, _>(lt(10))).unwrap();
/// assert_eq!("Calculator::add(1, var < 10)", m.to_string());
/// ```
#[derive(Clone)]
pub struct CallMatcher {
    member: Member,
    target: Option<FakeId>,
    constraints: Vec<ArgumentConstraint>,
    predicate: Option<ArgumentsPredicate>,
}

impl CallMatcher {
    /// Match every call to `member`, whatever the arguments.
    pub fn new(member: &Member) -> Self {
        let constraints = member.parameters().iter()
            .map(|_| ArgumentConstraint::ignored())
            .collect();
        CallMatcher {
            member: member.clone(),
            target: None,
            constraints,
            predicate: None
        }
    }

    /// Match calls to `member` whose arguments satisfy `constraints`, one per
    /// parameter.
    pub fn with_arguments<I>(member: &Member, constraints: I)
        -> Result<Self, ConfigurationError>
        where I: IntoIterator<Item = ArgumentConstraint>
    {
        let constraints: Vec<_> = constraints.into_iter().collect();
        if constraints.len() != member.arity() {
            return Err(ConfigurationError::ArityMismatch {
                member: member.to_string(),
                expected: member.arity(),
                actual: constraints.len()
            });
        }
        constraints.into_iter()
            .enumerate()
            .try_fold(CallMatcher::new(member), |m, (i, c)| m.with(i, c))
    }

    /// Replace the constraint on argument `index`.
    pub fn with(mut self, index: usize, constraint: ArgumentConstraint)
        -> Result<Self, ConfigurationError>
    {
        let p = self.member.parameters().get(index)
            .ok_or_else(|| ConfigurationError::NoSuchArgument {
                member: self.member.to_string(),
                index
            })?;
        if let Some((type_id, type_name)) = constraint.type_id() {
            if type_id != p.type_id() {
                return Err(ConfigurationError::ArgumentTypeMismatch {
                    member: self.member.to_string(),
                    index,
                    name: p.name().to_owned(),
                    expected: p.type_name(),
                    actual: type_name
                });
            }
        }
        self.constraints[index] = constraint;
        Ok(self)
    }

    /// Shortcut for `with(index, ArgumentConstraint::equal_to(t))`
    pub fn with_value<T: Argument>(self, index: usize, t: T)
        -> Result<Self, ConfigurationError>
    {
        self.with(index, ArgumentConstraint::equal_to(t))
    }

    /// Additionally require the whole argument list to satisfy `f`.
    pub fn when_arguments_match<F, D>(mut self, f: F, description: D) -> Self
        where F: Fn(&ArgumentList) -> bool + Send + Sync + 'static,
              D: Into<String>
    {
        self.predicate = Some(ArgumentsPredicate {
            f: Arc::new(f),
            description: description.into()
        });
        self
    }

    /// Only match calls made on `target`.
    pub fn on(mut self, target: FakeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn target(&self) -> Option<FakeId> {
        self.target
    }

    pub fn constraints(&self) -> &[ArgumentConstraint] {
        &self.constraints
    }

    /// Does this matcher accept an actual call?
    pub fn matches(&self, call: &CallDescriptor) -> bool {
        self.matches_parts(call.member(), call.target(), call.arguments())
    }

    pub(crate) fn matches_parts(&self, member: &Member, target: FakeId,
                                arguments: &ArgumentList) -> bool
    {
        if self.member.id() != member.id() {
            return false;
        }
        if self.target.map(|t| t != target).unwrap_or(false) {
            return false;
        }
        let args_match = self.constraints.iter()
            .zip(arguments.values())
            .all(|(c, v)| c.matches(v));
        args_match && self.predicate.as_ref()
            .map(|p| (p.f)(arguments))
            .unwrap_or(true)
    }

    /// Why did a call to the same member fail to match?  One line per
    /// rejected argument.
    pub(crate) fn explain(&self, arguments: &ArgumentList) -> Vec<String> {
        let mut reasons = Vec::new();
        for (i, (c, v)) in self.constraints.iter()
            .zip(arguments.values())
            .enumerate()
        {
            if c.matches(v) {
                continue;
            }
            let name = self.member.parameters()[i].name();
            match c.explain(v) {
                Some(tree) => reasons.push(format!("argument `{}`: {}", name,
                                                   tree)),
                None => reasons.push(format!("argument `{}`: {:?} is not {}",
                                             name, v, c))
            }
        }
        if let Some(p) = &self.predicate {
            if reasons.is_empty() && !(p.f)(arguments) {
                reasons.push(format!("arguments do not match {}",
                                     p.description));
            }
        }
        reasons
    }

    /// Make this matcher describe a property setter call with the given
    /// value constraint.
    pub(crate) fn set_last(mut self, constraint: ArgumentConstraint)
        -> Result<Self, ConfigurationError>
    {
        if !self.member.is_setter() {
            return Err(ConfigurationError::NotASetter {
                member: self.member.to_string()
            });
        }
        let last = self.member.arity() - 1;
        self.constraints[last] = ArgumentConstraint::ignored();
        self.with(last, constraint)
    }
}

impl fmt::Debug for CallMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CallMatcher")
            .field("member", self.member.id())
            .field("target", &self.target)
            .field("constraints", &self.constraints)
            .finish()
    }
}

impl fmt::Display for CallMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.member)?;
        for (i, c) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", c)?;
        }
        f.write_str(")")?;
        if let Some(p) = &self.predicate {
            write!(f, " when arguments match {}", p.description)?;
        }
        Ok(())
    }
}
