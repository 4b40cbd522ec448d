// vim: tw=80
//! Runtime fakes for Rust.
//!
//! Fakeit provides the engine behind a fake object: something that stands in
//! for a real collaborator, records every call made to it, and answers each
//! call according to rules configured by the test.
//!
//! # Usage
//!
//! A fake is reached through a proxy.  The proxy implements the faked trait
//! and forwards every invocation to an [`Interceptor`].  Proxies can be
//! written by hand with [`BasicCall`], produced by any [`ProxyGenerator`], or
//! replaced altogether with a [`DynamicProxy`], which is called by member
//! description.  Whichever is used, the basic idea is the same:
//! * Describe the faked members with [`Member`].
//! * Create a [`Fake`].
//! * Configure rules with [`Fake::configure`].  Each rule has a
//!   [`CallMatcher`] saying which calls it applies to, and a behavior.
//! * Hand the fake to the code under test.
//! * Assert on the recorded calls with [`Fake::assert_that`].
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Behaviors`](#behaviors)
//! * [`Repeat counts`](#repeat-counts)
//! * [`Out and ref parameters`](#out-and-ref-parameters)
//! * [`Fallbacks`](#fallbacks)
//! * [`Assertions`](#assertions)
//! * [`Ordered assertions`](#ordered-assertions)
//! * [`Threads`](#threads)
//!
//! ## Getting Started
//! ```
//! use fakeit::*;
//!
//! let get_count = Member::method("Counter", "get_count").returns::<i32>();
//! let fake = Fake::dynamic("Counter");
//!
//! // Unconfigured calls return the default value
//! assert_eq!(0, fake.call_as::<i32>(&get_count, values![]).unwrap());
//!
//! fake.configure(&fake.call_to(&get_count)).unwrap()
//!     .returns(42i32).unwrap();
//! assert_eq!(42, fake.call_as::<i32>(&get_count, values![]).unwrap());
//!
//! assert_eq!(2, fake.recorded_calls().len());
//! ```
//!
//! ## Matching arguments
//!
//! A [`CallMatcher`] holds one [`ArgumentConstraint`] per parameter.  By
//! default every argument is ignored.  Constraints can require equality,
//! satisfy any [`Predicate`], or run a closure.  A predicate over the whole
//! argument list can be added with
//! [`when_arguments_match`](CallMatcher::when_arguments_match).
//!
//! When more than one rule matches a call, the most recently added one wins.
//! ```
//! # use fakeit::*;
//! use fakeit::predicate::*;
//!
//! let add = Member::method("Calculator", "add")
//!     .param::<i32>("a")
//!     .param::<i32>("b")
//!     .returns::<i32>();
//! let fake = Fake::dynamic("Calculator");
//! fake.configure(&fake.call_to(&add)).unwrap()
//!     .returns(-1i32).unwrap();
//! fake.configure(&fake.call_to(&add)
//!     .with(0, ArgumentConstraint::that::<i32, _>(gt(10))).unwrap()
//!     .with_value(1, 1i32).unwrap()
//! ).unwrap()
//!     .returns(100i32).unwrap();
//!
//! assert_eq!(100, fake.call_as::<i32>(&add, values![11i32, 1i32]).unwrap());
//! assert_eq!(-1, fake.call_as::<i32>(&add, values![9i32, 1i32]).unwrap());
//! ```
//!
//! ## Behaviors
//!
//! A rule can return a value, compute one, raise an error, run callbacks,
//! call the real implementation, or do nothing.  Errors raised with
//! [`throws`](RuleGuard::throws) reach the caller as
//! [`DispatchError::Thrown`] and the call is still recorded.
//! ```
//! # use fakeit::*;
//! #[derive(Debug, thiserror::Error)]
//! #[error("disk full")]
//! struct DiskFull;
//!
//! let save = Member::method("Store", "save");
//! let fake = Fake::dynamic("Store");
//! fake.configure(&fake.call_to(&save)).unwrap()
//!     .throws(DiskFull);
//!
//! let e = fake.call(&save, values![]).unwrap_err();
//! assert!(e.exception().unwrap().is::<DiskFull>());
//! assert!(fake.recorded_calls()[0].threw());
//! ```
//!
//! ## Repeat counts
//!
//! A behavior can be limited to a number of uses.  Once they are spent, the
//! rule moves on to the behavior configured after [`then`](RuleGuard::then),
//! or stops matching and lets older rules and the fallback handle the call.
//! ```
//! # use fakeit::*;
//! let next = Member::method("Sequence", "next").returns::<u32>();
//! let fake = Fake::dynamic("Sequence");
//! fake.configure(&fake.call_to(&next)).unwrap()
//!     .returns(1u32).unwrap().once()
//!     .then().unwrap()
//!     .returns(2u32).unwrap().twice();
//! let got = (0..4)
//!     .map(|_| fake.call_as::<u32>(&next, values![]).unwrap())
//!     .collect::<Vec<_>>();
//! assert_eq!(vec![1, 2, 2, 0], got);
//! ```
//!
//! ## Out and ref parameters
//!
//! Out and ref parameters are declared with
//! [`out_param`](Member::out_param) and [`ref_param`](Member::ref_param).
//! Rules assign them with
//! [`assigns_out_and_ref_parameters`](RuleGuard::assigns_out_and_ref_parameters),
//! and the new values are written back into the invocation.
//! ```
//! # use fakeit::*;
//! let try_get = Member::method("Dict", "try_get")
//!     .param::<String>("key")
//!     .out_param::<i32>("value")
//!     .returns::<bool>();
//! let fake = Fake::dynamic("Dict");
//! fake.configure(&fake.call_to(&try_get)).unwrap()
//!     .returns(true).unwrap()
//!     .assigns_out_and_ref_parameters(values![7i32]).unwrap();
//!
//! let mut args = values![String::from("seven"), 0i32];
//! fake.call_mut(&try_get, &mut args).unwrap();
//! assert_eq!(Some(&7), args[1].downcast_ref::<i32>());
//! ```
//!
//! ## Fallbacks
//!
//! Calls that match no rule go to the fake's [`Fallback`].  By default it
//! returns the member's default value.  Members declared with
//! [`returns_without_default`](Member::returns_without_default) have none, so
//! unconfigured calls to them fail.  A wrapping fake forwards unmatched calls
//! to the real implementation instead.
//! ```
//! # use fakeit::*;
//! let double = Member::method("Doubler", "double")
//!     .param::<i32>("x")
//!     .returns::<i32>();
//! let generator = DynamicProxyGenerator::new().with_class(
//!     ClassInfo::new("Doubler").with_base(|_member, args| {
//!         let x = *args[0].downcast_ref::<i32>().unwrap();
//!         Ok(Some(Value::new(2 * x)))
//!     }));
//! let fake = Fake::create(&generator,
//!                         FakeOptions::for_class("Doubler").wrapping())
//!     .unwrap();
//! assert_eq!(8, fake.call_as::<i32>(&double, values![4i32]).unwrap());
//! ```
//!
//! ## Assertions
//!
//! [`Fake::assert_that`] checks how many recorded calls match.  Failures
//! panic with a message listing the expected call, the count found and
//! every recorded call, with the reasons each call to the same member didn't
//! match.
//! ```should_panic(expected = "Expected to find it exactly once but found it twice")
//! # use fakeit::*;
//! let save = Member::method("Store", "save").param::<u32>("id");
//! let fake = Fake::dynamic("Store");
//! fake.call(&save, values![1u32]).unwrap();
//! fake.call(&save, values![1u32]).unwrap();
//! fake.assert_that(&fake.call_to(&save)).must_have_happened(Repeated::Once);
//! ```
//!
//! ## Ordered assertions
//!
//! Assertions can be chained with [`then`](OrderedAssertion::then) to
//! require that calls happened in order.  Other calls may happen in between,
//! and the calls may be spread over several fakes.
//! ```
//! # use fakeit::*;
//! let open = Member::method("File", "open");
//! let log = Member::method("Log", "write").param::<String>("line");
//! let file = Fake::dynamic("File");
//! let logger = Fake::dynamic("Log");
//! file.call(&open, values![]).unwrap();
//! logger.call(&log, values![String::from("opened")]).unwrap();
//!
//! file.assert_that(&file.call_to(&open))
//!     .must_have_happened_once()
//!     .then(&logger.assert_that(&logger.call_to(&log)), Repeated::Once);
//! ```
//!
//! ## Threads
//!
//! Fakes are `Send + Sync`.  Rules may be added while other threads call the
//! fake; each call sees the rules that existed when it started, and no two
//! calls can both take the last use of a limited rule.  Closures that are not
//! `Send` can be given to the `_st` variants of the configuration methods,
//! like [`returns_lazily_st`](RuleGuard::returns_lazily_st), but then the
//! fake must only be called from the thread that configured it.
//!
//! Closures are never locked while they run, so a behavior may call the fake
//! that is running it, even recursively through the same rule.
//! ```
//! # use fakeit::*;
//! # use std::sync::Arc;
//! let fact = Member::method("Math", "fact")
//!     .param::<u64>("n")
//!     .returns::<u64>();
//! let fake = Arc::new(Fake::dynamic("Math"));
//! let weak = Arc::downgrade(&fake);
//! let f = fact.clone();
//! fake.configure(&fake.call_to(&fact)).unwrap()
//!     .returns_lazily(move |call| {
//!         let n = *call.argument::<u64>(0).unwrap();
//!         match n {
//!             0 | 1 => 1,
//!             _ => n * weak.upgrade().unwrap()
//!                 .call_as::<u64>(&f, values![n - 1]).unwrap()
//!         }
//!     }).unwrap();
//! assert_eq!(120, fake.call_as::<u64>(&fact, values![5u64]).unwrap());
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

mod assertion;
mod call;
mod configuration;
mod constraint;
mod error;
mod fake;
mod history;
mod interception;
mod manager;
mod member;
mod proxy;
mod repeat;
mod rule;
mod value;

pub use predicates::prelude::{Predicate, predicate};

/// For declaring members once per proxy
pub use lazy_static::lazy_static;

pub use crate::{
    assertion::{verify, verify_ordered, CallAssertion, OrderedAssertion},
    call::{ArgumentList, CallDescriptor, FakeCall, FakeId},
    configuration::{RuleGuard, SetterGuard},
    constraint::{ArgumentConstraint, CallMatcher},
    error::{
        AssertionError,
        ConfigurationError,
        DispatchError,
        Error,
        Exception,
        GenerationFailure
    },
    fake::Fake,
    history::{CallHistory, CallOutcome, CallRecord, FakeHistory},
    interception::{BasicCall, InterceptedCall, Interceptor},
    manager::{Dispatched, Fallback, FakeManager},
    member::{Member, MemberId, Output, ParamKind, Parameter},
    proxy::{
        ClassInfo,
        DynamicProxy,
        DynamicProxyGenerator,
        FakeOptions,
        ProxyGenerator,
        ProxyKind,
        ProxyRequest
    },
    repeat::Repeated,
    value::{Argument, Value}
};

/// Lock a mutex, ignoring poison.  A user closure that panicked while a
/// fake's lock was held must not wedge every later call.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
