// vim: tw=80
//! The seam between a proxy and the fake's dispatcher.
//!
//! A proxy implements [`InterceptedCall`] for each invocation it receives
//! (or uses the ready-made [`BasicCall`]) and hands it to its
//! [`Interceptor`].  The interceptor turns it into a
//! [`CallDescriptor`](crate::CallDescriptor), dispatches it, and writes the
//! resulting out and ref values back into the invocation.

use std::{any, fmt, sync::Arc};

use crate::{
    call::{CallDescriptor, FakeCall},
    error::DispatchError,
    manager::FakeManager,
    member::Member,
    value::{Argument, Value}
};

/// One invocation of a faked member, as seen by the proxy that received it.
pub trait InterceptedCall {
    fn member(&self) -> &Member;

    /// The current argument values, in order.
    fn arguments(&self) -> Vec<Value>;

    /// Overwrite an out or ref argument.
    fn set_argument_value(&mut self, index: usize, value: Value);

    /// Run the real implementation of the member, if there is one.
    fn call_base_method(&mut self) -> Result<Option<Value>, DispatchError>;
}

/// A proxy's handle on its fake.  Cheap to clone.
#[derive(Clone)]
pub struct Interceptor {
    manager: Arc<FakeManager>,
}

impl Interceptor {
    pub(crate) fn new(manager: Arc<FakeManager>) -> Self {
        Interceptor{manager}
    }

    pub fn manager(&self) -> &Arc<FakeManager> {
        &self.manager
    }

    /// Dispatch one invocation and return what the caller should get.
    ///
    /// Out and ref arguments are written back to `call` whether or not the
    /// call succeeded.
    pub fn intercept(&self, call: &mut dyn InterceptedCall)
        -> Result<Option<Value>, DispatchError>
    {
        let member = call.member().clone();
        let descriptor = CallDescriptor::new(member.clone(), self.manager.id(),
                                             call.arguments())?;
        let out_and_ref = member.out_and_ref_indices();
        let dispatched = {
            let mut base = |fake_call: &mut FakeCall| {
                for &i in out_and_ref.iter() {
                    call.set_argument_value(i, fake_call.arguments()[i].clone());
                }
                let result = call.call_base_method();
                let current = call.arguments();
                for &i in out_and_ref.iter() {
                    fake_call.set_value(i, current[i].clone())?;
                }
                result
            };
            self.manager.dispatch(descriptor, &mut base)
        };
        for &i in out_and_ref.iter() {
            call.set_argument_value(i, dispatched.record.arguments()[i].clone());
        }
        dispatched.result
    }

    /// Like [`intercept`](#method.intercept), but with the return value
    /// downcast to the member's output type.  Use `()` for members that
    /// return nothing.
    pub fn invoke<T: Argument + Clone>(&self, call: &mut dyn InterceptedCall)
        -> Result<T, DispatchError>
    {
        let member = call.member().to_string();
        self.intercept(call)?
            .unwrap_or_else(Value::unit)
            .downcast::<T>()
            .map_err(|v| DispatchError::ReturnTypeMismatch {
                member,
                expected: any::type_name::<T>(),
                actual: v.type_name()
            })
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Interceptor").field(&self.manager.id()).finish()
    }
}

type BaseMethod<'a> =
    dyn FnMut(&mut [Value]) -> Result<Option<Value>, DispatchError> + 'a;

/// An [`InterceptedCall`] for hand-written proxies.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// trait Parser {
///     fn try_parse(&self, text: &str, result: &mut i32) -> bool;
/// }
///
/// lazy_static! {
///     static ref TRY_PARSE: Member = Member::method("Parser", "try_parse")
///         .param::<String>("text")
///         .out_param::<i32>("result")
///         .returns::<bool>();
/// }
///
/// struct FakeParser(Interceptor);
///
/// impl Parser for FakeParser {
///     fn try_parse(&self, text: &str, result: &mut i32) -> bool {
///         let mut call = BasicCall::new(&TRY_PARSE,
///                                       values![text.to_owned(), *result]);
///         let r = self.0.invoke::<bool>(&mut call).unwrap();
///         *result = *call.argument::<i32>(1).unwrap();
///         r
///     }
/// }
///
/// let fake = Fake::create_with(|i| Ok(FakeParser(i)),
///                              FakeOptions::for_interface("Parser")).unwrap();
/// fake.configure(&CallMatcher::new(&TRY_PARSE)).unwrap()
///     .returns(true).unwrap()
///     .assigns_out_and_ref_parameters(values![42i32]).unwrap();
/// let mut n = 0;
/// assert!(fake.try_parse("42", &mut n));
/// assert_eq!(42, n);
/// ```
pub struct BasicCall<'a> {
    member: &'a Member,
    arguments: Vec<Value>,
    base: Option<Box<BaseMethod<'a>>>,
}

impl<'a> BasicCall<'a> {
    pub fn new(member: &'a Member, arguments: Vec<Value>) -> Self {
        BasicCall{member, arguments, base: None}
    }

    /// Provide the real implementation, for rules that call it.  It may
    /// modify out and ref arguments in place.
    pub fn with_base<F>(mut self, f: F) -> Self
        where F: FnMut(&mut [Value]) -> Result<Option<Value>, DispatchError>
                 + 'a
    {
        self.base = Some(Box::new(f));
        self
    }

    pub fn argument<T: Argument>(&self, index: usize) -> Option<&T> {
        self.arguments.get(index).and_then(Value::downcast_ref::<T>)
    }

    pub fn into_arguments(self) -> Vec<Value> {
        self.arguments
    }
}

impl<'a> InterceptedCall for BasicCall<'a> {
    fn member(&self) -> &Member {
        self.member
    }

    fn arguments(&self) -> Vec<Value> {
        self.arguments.clone()
    }

    fn set_argument_value(&mut self, index: usize, value: Value) {
        self.arguments[index] = value;
    }

    fn call_base_method(&mut self) -> Result<Option<Value>, DispatchError> {
        match self.base.as_mut() {
            Some(f) => f(&mut self.arguments),
            None => Err(DispatchError::NoBaseMethod {
                member: self.member.to_string()
            })
        }
    }
}
