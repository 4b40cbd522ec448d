// vim: tw=80
//! Everything that can go wrong while configuring, calling or verifying a
//! fake.

use std::{
    error,
    fmt,
    sync::Arc
};

use thiserror::Error;

/// A fake was configured in a way that can never work.
///
/// Returned synchronously to the code doing the configuring.  Never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{member} takes {expected} argument(s) but {actual} were given")]
    ArityMismatch {
        member: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} (`{name}`) of {member} is a {expected}, not a {actual}")]
    ArgumentTypeMismatch {
        member: String,
        index: usize,
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A value given at configuration time has the wrong type.  Values
    /// produced while a call is running are reported as
    /// [`DispatchError::ReturnTypeMismatch`] instead.
    #[error("{member} returns {expected}, not {actual}")]
    ReturnTypeMismatch {
        member: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{member} does not return a value")]
    NoReturnValue { member: String },

    #[error("cannot produce a default {type_name} for {member}")]
    NoDefaultValue {
        member: String,
        type_name: &'static str,
    },

    #[error("The number of times to repeat must be greater than zero")]
    ZeroRepeat,

    #[error("then() requires the current behavior to have a repeat count")]
    ThenWithoutRepeat,

    #[error("{member} has {expected} out and ref parameter(s) but {actual} value(s) were given")]
    OutAndRefCountMismatch {
        member: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} of {member} is not an out or ref parameter")]
    NotOutOrRef { member: String, index: usize },

    #[error("{member} has no argument {index}")]
    NoSuchArgument { member: String, index: usize },

    #[error("{member} is not a property setter")]
    NotASetter { member: String },

    #[error("the call was described on {target} but configured on {fake}")]
    ForeignTarget { target: String, fake: String },

    #[error("Arguments for constructor specified for interface type.")]
    ConstructorArgumentsForInterface,
}

/// The reason a proxy generator could not produce a fake.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct GenerationFailure {
    reason: String,
}

impl GenerationFailure {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        GenerationFailure{reason: reason.into()}
    }

    /// The generator's explanation, verbatim.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A user-supplied error raised by a faked call.
///
/// Configured with `throws`, and handed back verbatim to whoever called the
/// faked member.  Cheap to clone so that the same exception can be thrown by
/// every matching call and also kept in the call history.
#[derive(Clone)]
pub struct Exception(Arc<dyn error::Error + Send + Sync>);

impl Exception {
    pub fn new<E>(e: E) -> Self
        where E: error::Error + Send + Sync + 'static
    {
        Exception(Arc::new(e))
    }

    /// An exception that only carries a message.
    pub fn msg<S: Into<String>>(msg: S) -> Self {
        let msg: String = msg.into();
        let boxed: Box<dyn error::Error + Send + Sync> = msg.into();
        Exception(Arc::from(boxed))
    }

    /// Look at the concrete error inside.
    pub fn downcast_ref<E: error::Error + 'static>(&self) -> Option<&E> {
        (*self.0).downcast_ref::<E>()
    }

    pub fn is<E: error::Error + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Exception").field(&self.0).finish()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl error::Error for Exception {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.0.source()
    }
}

/// Why a faked call did not produce a value.
#[derive(Clone, Debug, Error)]
pub enum DispatchError {
    /// The matching rule was configured to throw.
    #[error(transparent)]
    Thrown(Exception),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{member} has no underlying implementation to call")]
    NoBaseMethod { member: String },

    /// A lazily produced return value, or a custom fallback's result, has
    /// the wrong type.
    #[error("{member} produced a {actual} where a {expected} was expected")]
    ReturnTypeMismatch {
        member: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A single-threaded closure was called again while it was still
    /// running.
    #[error("a closure configured for {member} was called recursively")]
    Reentrant { member: String },
}

impl DispatchError {
    /// The thrown exception, if this is a configured throw.
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            DispatchError::Thrown(e) => Some(e),
            _ => None
        }
    }
}

impl From<Exception> for DispatchError {
    fn from(e: Exception) -> Self {
        DispatchError::Thrown(e)
    }
}

/// A call assertion was not met.
///
/// The message lists the expected call, how many times it was expected, how
/// many times it was found, and the calls to the same member that had
/// different arguments.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionError {
    pub(crate) message: String,
    pub(crate) expected: String,
    pub(crate) actual_count: usize,
    pub(crate) near_misses: Vec<String>,
}

impl AssertionError {
    /// Description of the call that was asserted on.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// How many matching calls were found.
    pub fn actual_count(&self) -> usize {
        self.actual_count
    }

    /// Calls to the same member whose arguments did not match.
    pub fn near_misses(&self) -> &[String] {
        &self.near_misses
    }
}

/// Umbrella error for callers that don't care which stage failed.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
}
