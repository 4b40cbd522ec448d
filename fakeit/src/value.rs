// vim: tw=80
//! Type-erased argument and return values.
//!
//! A proxy hands the interception engine its arguments without the engine
//! knowing their types.  Each one is boxed into a [`Value`], which can be
//! cloned, compared and downcast back into the concrete type.

use std::{
    any::{self, TypeId},
    fmt
};

use downcast::{downcast, Any};

/// Anything that can flow through a fake as an argument or a return value.
///
/// Implemented for every `'static` type that is `Clone + Debug + PartialEq +
/// Send + Sync`.  Collections compare element-wise, in order, because that is
/// what their `PartialEq` does.
pub trait Argument: Any + fmt::Debug + Send + Sync {
    #[doc(hidden)]
    fn clone_argument(&self) -> Box<dyn Argument>;

    #[doc(hidden)]
    fn eq_argument(&self, other: &dyn Argument) -> bool;
}
downcast!(dyn Argument);

impl<T> Argument for T
    where T: Any + Clone + fmt::Debug + PartialEq + Send + Sync
{
    fn clone_argument(&self) -> Box<dyn Argument> {
        Box::new(self.clone())
    }

    fn eq_argument(&self, other: &dyn Argument) -> bool {
        match other.downcast_ref::<T>() {
            Ok(o) => self == o,
            Err(_) => false
        }
    }
}

/// One boxed argument or return value.
///
/// Never wrap a `Value` inside another `Value`: use the original.
pub struct Value {
    inner: Box<dyn Argument>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Argument>(t: T) -> Self {
        Value {
            inner: Box::new(t),
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>()
        }
    }

    /// The value of a call that returns nothing.
    pub fn unit() -> Self {
        Value::new(())
    }

    pub fn is<T: Argument>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Argument>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>().ok()
    }

    pub fn downcast_mut<T: Argument>(&mut self) -> Option<&mut T> {
        (*self.inner).downcast_mut::<T>().ok()
    }

    /// Recover the concrete value, or get the `Value` back unchanged if it
    /// holds some other type.
    pub fn downcast<T: Argument + Clone>(self) -> Result<T, Value> {
        match self.downcast_ref::<T>() {
            Some(t) => Ok(t.clone()),
            None => Err(self)
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Value {
            inner: (*self.inner).clone_argument(),
            type_id: self.type_id,
            type_name: self.type_name
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.type_id == other.type_id &&
            (*self.inner).eq_argument(&*other.inner)
    }
}

/// Box each element of a tuple-free argument list.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// let args = values![1i32, String::from("two")];
/// assert_eq!(Some(&1i32), args[0].downcast_ref::<i32>());
/// ```
#[macro_export]
macro_rules! values {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($v:expr),+ $(,)?) => {
        vec![$( $crate::Value::new($v), )+]
    };
}
