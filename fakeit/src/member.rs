// vim: tw=80
//! Descriptions of the members a fake can intercept.

use std::{
    any::{self, TypeId},
    fmt,
    sync::Arc
};

use crate::value::{Argument, Value};

/// Identity of a member: which type declares it, what it is called, and the
/// types of its parameters.
///
/// Two calls target "the same method" iff their `MemberId`s are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId {
    declaring_type: String,
    name: String,
    signature: Vec<&'static str>,
}

impl MemberId {
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type names, in order
    pub fn signature(&self) -> &[&'static str] {
        &self.signature
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// How an argument is passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    In,
    /// Written by the callee; whatever the caller passed in is ignored.
    Out,
    /// Read and possibly written by the callee.
    Ref,
}

impl ParamKind {
    pub fn is_out_or_ref(self) -> bool {
        self != ParamKind::In
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    kind: ParamKind,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// What a member returns.
#[derive(Clone, Debug)]
pub enum Output {
    Unit,
    Value {
        type_id: TypeId,
        type_name: &'static str,
        /// Produces the value returned when nothing was configured.
        default: Option<fn() -> Value>,
    },
}

impl Output {
    /// The value a call returns when no rule says otherwise.  `None` for unit
    /// members and for types without a known default.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Output::Unit => None,
            Output::Value{default, ..} => default.map(|f| f())
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Output::Unit => "()",
            Output::Value{type_name, ..} => *type_name
        }
    }

    /// Can a value of this type be returned?
    pub fn accepts(&self, type_id: TypeId) -> bool {
        match self {
            Output::Unit => type_id == TypeId::of::<()>(),
            Output::Value{type_id: t, ..} => *t == type_id
        }
    }
}

fn default_value<T: Argument + Default>() -> Value {
    Value::new(T::default())
}

/// Everything the engine needs to know about a member: its identity, its
/// parameters and its output.
///
/// Proxies usually build these once, in a `lazy_static!` block.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// let add = Member::method("Calculator", "add")
///     .param::<i32>("a")
///     .param::<i32>("b")
///     .returns::<i32>();
/// assert_eq!(2, add.arity());
/// assert_eq!("Calculator::add", add.to_string());
/// ```
#[derive(Clone, Debug)]
pub struct Member {
    id: MemberId,
    parameters: Arc<[Parameter]>,
    output: Output,
}

impl Member {
    /// A member that takes no arguments and returns nothing, until told
    /// otherwise.
    pub fn method<D, N>(declaring_type: D, name: N) -> Self
        where D: Into<String>, N: Into<String>
    {
        let id = MemberId {
            declaring_type: declaring_type.into(),
            name: name.into(),
            signature: Vec::new()
        };
        Member{id, parameters: Arc::from(Vec::new()), output: Output::Unit}
    }

    /// The setter of a property: `set_<name>(value: T)`.
    pub fn setter<T, D, N>(declaring_type: D, property: N) -> Self
        where T: Argument, D: Into<String>, N: AsRef<str>
    {
        Member::method(declaring_type, format!("set_{}", property.as_ref()))
            .param::<T>("value")
    }

    /// The getter of a property: `get_<name>() -> T`.
    pub fn getter<T, D, N>(declaring_type: D, property: N) -> Self
        where T: Argument + Default, D: Into<String>, N: AsRef<str>
    {
        Member::method(declaring_type, format!("get_{}", property.as_ref()))
            .returns::<T>()
    }

    fn push_param<T: Argument>(mut self, name: &str, kind: ParamKind) -> Self {
        let mut parameters = self.parameters.to_vec();
        parameters.push(Parameter {
            name: name.to_owned(),
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            kind
        });
        self.parameters = Arc::from(parameters);
        self.id.signature.push(any::type_name::<T>());
        self
    }

    pub fn param<T: Argument>(self, name: &str) -> Self {
        self.push_param::<T>(name, ParamKind::In)
    }

    pub fn out_param<T: Argument>(self, name: &str) -> Self {
        self.push_param::<T>(name, ParamKind::Out)
    }

    pub fn ref_param<T: Argument>(self, name: &str) -> Self {
        self.push_param::<T>(name, ParamKind::Ref)
    }

    /// The member returns a `T`, defaulting to `T::default()` when no rule
    /// supplies a value.
    pub fn returns<T: Argument + Default>(mut self) -> Self {
        self.output = Output::Value {
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            default: Some(default_value::<T>)
        };
        self
    }

    /// The member returns a `T` that has no natural default.  Unconfigured
    /// calls to it fail with
    /// [`ConfigurationError::NoDefaultValue`](crate::ConfigurationError).
    pub fn returns_without_default<T: Argument>(mut self) -> Self {
        self.output = Output::Value {
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            default: None
        };
        self
    }

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn declaring_type(&self) -> &str {
        self.id.declaring_type()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Positions of the out and ref parameters, in order.
    pub fn out_and_ref_indices(&self) -> Vec<usize> {
        self.parameters.iter()
            .enumerate()
            .filter(|(_, p)| p.kind.is_out_or_ref())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_setter(&self) -> bool {
        self.name().starts_with("set_") && self.arity() >= 1 &&
            matches!(self.output, Output::Unit)
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Member) -> bool {
        self.id == other.id
    }
}

impl Eq for Member {}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}
