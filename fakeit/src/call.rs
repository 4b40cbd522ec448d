// vim: tw=80
//! Actual calls, as delivered by a proxy.

use std::{
    fmt,
    ops::Index,
    sync::atomic::{AtomicU64, Ordering}
};

use crate::{
    error::ConfigurationError,
    member::{Member, Parameter},
    value::{Argument, Value}
};

static NEXT_FAKE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one faked instance for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeId(u64);

impl FakeId {
    pub(crate) fn next() -> Self {
        FakeId(NEXT_FAKE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FakeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fake #{}", self.0)
    }
}

/// The arguments of one call, by position, with their parameter names.
#[derive(Clone, Debug)]
pub struct ArgumentList {
    member: Member,
    values: Vec<Value>,
}

impl ArgumentList {
    pub(crate) fn new(member: Member, values: Vec<Value>) -> Self {
        ArgumentList{member, values}
    }

    /// The member these arguments were passed to
    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<T: Argument>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(Value::downcast_ref::<T>)
    }

    /// Look an argument up by its parameter name
    pub fn by_name<T: Argument>(&self, name: &str) -> Option<&T> {
        self.member.parameters().iter()
            .position(|p| p.name() == name)
            .and_then(|i| self.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Parameter, &Value)> {
        self.member.parameters().iter().zip(self.values.iter())
    }

    pub(crate) fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Index<usize> for ArgumentList {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

/// Write arguments the way they'd appear in source: `(1, "abc")`
pub(crate) fn fmt_arguments(values: &[Value], f: &mut fmt::Formatter)
    -> fmt::Result
{
    f.write_str("(")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{:?}", v)?;
    }
    f.write_str(")")
}

/// Normalized identity of one actual invocation: which member, on which fake,
/// with which argument values.
///
/// Built once per invocation by the interception adapter and never modified
/// afterwards.
#[derive(Clone, Debug)]
pub struct CallDescriptor {
    target: FakeId,
    arguments: ArgumentList,
}

impl CallDescriptor {
    /// Check the arguments against the member's parameters and build the
    /// descriptor.
    pub fn new(member: Member, target: FakeId, arguments: Vec<Value>)
        -> Result<Self, ConfigurationError>
    {
        if member.arity() != arguments.len() {
            return Err(ConfigurationError::ArityMismatch {
                member: member.to_string(),
                expected: member.arity(),
                actual: arguments.len()
            });
        }
        for (i, (p, v)) in member.parameters().iter().zip(arguments.iter())
            .enumerate()
        {
            if p.type_id() != v.type_id() {
                return Err(ConfigurationError::ArgumentTypeMismatch {
                    member: member.to_string(),
                    index: i,
                    name: p.name().to_owned(),
                    expected: p.type_name(),
                    actual: v.type_name()
                });
            }
        }
        let arguments = ArgumentList::new(member, arguments);
        Ok(CallDescriptor{target, arguments})
    }

    pub fn member(&self) -> &Member {
        &self.arguments.member
    }

    pub fn target(&self) -> FakeId {
        self.target
    }

    pub fn arguments(&self) -> &ArgumentList {
        &self.arguments
    }
}

impl fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.member())?;
        fmt_arguments(self.arguments.values(), f)
    }
}

/// A call in progress, as seen by configured behaviors.
///
/// Starts as a copy of the [`CallDescriptor`].  Behaviors may write the out
/// and ref arguments; whatever they hold when the behavior finishes is what
/// gets recorded and written back to the caller.
#[derive(Debug)]
pub struct FakeCall {
    target: FakeId,
    arguments: ArgumentList,
}

impl FakeCall {
    pub(crate) fn new(descriptor: CallDescriptor) -> Self {
        FakeCall{target: descriptor.target, arguments: descriptor.arguments}
    }

    pub fn member(&self) -> &Member {
        &self.arguments.member
    }

    /// The fake that received the call
    pub fn target(&self) -> FakeId {
        self.target
    }

    pub fn arguments(&self) -> &ArgumentList {
        &self.arguments
    }

    /// Shortcut for `self.arguments().get(index)`
    pub fn argument<T: Argument>(&self, index: usize) -> Option<&T> {
        self.arguments.get(index)
    }

    /// Set the value of an out or ref argument.
    pub fn set_argument_value<T: Argument>(&mut self, index: usize, value: T)
        -> Result<(), ConfigurationError>
    {
        self.set_value(index, Value::new(value))
    }

    pub(crate) fn set_value(&mut self, index: usize, value: Value)
        -> Result<(), ConfigurationError>
    {
        let member = &self.arguments.member;
        let p = member.parameters().get(index)
            .ok_or_else(|| ConfigurationError::NoSuchArgument {
                member: member.to_string(),
                index
            })?;
        if !p.kind().is_out_or_ref() {
            return Err(ConfigurationError::NotOutOrRef {
                member: member.to_string(),
                index
            });
        }
        if p.type_id() != value.type_id() {
            return Err(ConfigurationError::ArgumentTypeMismatch {
                member: member.to_string(),
                index,
                name: p.name().to_owned(),
                expected: p.type_name(),
                actual: value.type_name()
            });
        }
        self.arguments.values[index] = value;
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Member, Vec<Value>) {
        let member = self.arguments.member.clone();
        (member, self.arguments.into_values())
    }
}

impl fmt::Display for FakeCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.member())?;
        fmt_arguments(self.arguments.values(), f)
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::values;

    fn try_parse() -> Member {
        Member::method("Parser", "try_parse")
            .param::<String>("text")
            .out_param::<i32>("result")
            .returns::<bool>()
    }

    #[test]
    fn descriptor_checks_arity() {
        let e = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values![String::from("1")])
            .unwrap_err();
        assert_eq!(e, ConfigurationError::ArityMismatch {
            member: "Parser::try_parse".to_owned(),
            expected: 2,
            actual: 1
        });
    }

    #[test]
    fn descriptor_checks_types() {
        let e = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values!["1", 0i32])
            .unwrap_err();
        assert!(matches!(e,
            ConfigurationError::ArgumentTypeMismatch{index: 0, ..}));
    }

    #[test]
    fn display() {
        let d = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values![String::from("42"), 0i32])
            .unwrap();
        assert_eq!("Parser::try_parse(\"42\", 0)", d.to_string());
    }

    #[test]
    fn by_name() {
        let d = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values![String::from("42"), 7i32])
            .unwrap();
        assert_eq!(Some(&7), d.arguments().by_name::<i32>("result"));
        assert_eq!(None, d.arguments().by_name::<i32>("missing"));
    }

    #[test]
    fn set_out_argument() {
        let d = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values![String::from("42"), 0i32])
            .unwrap();
        let mut call = FakeCall::new(d);
        call.set_argument_value(1, 42i32).unwrap();
        assert_eq!(Some(&42), call.argument::<i32>(1));
    }

    #[test]
    fn set_in_argument() {
        let d = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values![String::from("42"), 0i32])
            .unwrap();
        let mut call = FakeCall::new(d);
        let e = call.set_argument_value(0, String::new()).unwrap_err();
        assert!(matches!(e, ConfigurationError::NotOutOrRef{index: 0, ..}));
    }

    #[test]
    fn set_wrong_type() {
        let d = CallDescriptor::new(try_parse(), FakeId::next(),
                                    values![String::from("42"), 0i32])
            .unwrap();
        let mut call = FakeCall::new(d);
        let e = call.set_argument_value(1, 1u8).unwrap_err();
        assert!(matches!(e,
            ConfigurationError::ArgumentTypeMismatch{index: 1, ..}));
    }
}
