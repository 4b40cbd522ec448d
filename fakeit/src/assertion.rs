// vim: tw=80
//! Checking recorded calls against expectations.
//!
//! Everything here works on snapshots of call histories.  Nothing here ever
//! changes a history or a rule.

use std::{
    fmt::Write,
    sync::Arc
};

use tracing::debug;

use crate::{
    constraint::CallMatcher,
    error::AssertionError,
    history::{self, CallHistory, CallRecord, FakeHistory},
    repeat::Repeated
};

fn matches(matcher: &CallMatcher, record: &CallRecord) -> bool {
    matcher.matches_parts(record.member(), record.fake(), record.arguments())
}

fn count_text(n: usize) -> String {
    match n {
        1 => "once".to_owned(),
        2 => "twice".to_owned(),
        n => format!("{} times", n)
    }
}

/// Calls to the matcher's member whose arguments didn't match, each followed
/// by the reasons why.
fn near_misses(matcher: &CallMatcher, records: &[Arc<CallRecord>])
    -> Vec<String>
{
    records.iter()
        .filter(|r| r.member().id() == matcher.member().id())
        .filter(|r| !matches(matcher, r))
        .map(|r| {
            let mut s = r.to_string();
            for reason in matcher.explain(r.arguments()) {
                write!(s, "\n      {}", reason).unwrap_or(());
            }
            s
        })
        .collect()
}

/// Append the list of recorded calls to a failure message.
fn list_calls(msg: &mut String, matcher: Option<&CallMatcher>,
              records: &[Arc<CallRecord>])
{
    for (i, r) in records.iter().enumerate() {
        write!(msg, "\n  {}: {}", i + 1, r).unwrap_or(());
        let Some(m) = matcher else { continue };
        if r.member().id() == m.member().id() && !matches(m, r) {
            for reason in m.explain(r.arguments()) {
                write!(msg, "\n      {}", reason).unwrap_or(());
            }
        }
    }
}

/// Check that the calls accepted by `matcher` happened the number of times
/// `repeated` allows, in any order.
pub fn verify(matcher: &CallMatcher, repeated: &Repeated,
              records: &[Arc<CallRecord>]) -> Result<(), AssertionError>
{
    let count = records.iter().filter(|r| matches(matcher, r)).count();
    if repeated.matches(count) {
        return Ok(());
    }
    let mut message = format!(
        "Assertion failed for the following call:\n  {}\n\
         Expected to find it {} ",
        matcher, repeated);
    if records.is_empty() {
        message.push_str("but no calls were made to the fake.");
    } else {
        write!(message, "but found it {} among the calls:", count_text(count))
            .unwrap_or(());
        list_calls(&mut message, Some(matcher), records);
    }
    debug!("{}", message);
    Err(AssertionError {
        message,
        expected: matcher.to_string(),
        actual_count: count,
        near_misses: near_misses(matcher, records)
    })
}

/// Check that every step happened as often as it says, and that the steps
/// happened in the given order.
///
/// The records are scanned once.  Each step consumes the fewest matching
/// calls its repeat specification accepts, starting after the last call
/// consumed by the previous step.  Unrelated calls may come in between.
pub fn verify_ordered(steps: &[(CallMatcher, Repeated)],
                      records: &[Arc<CallRecord>])
    -> Result<(), AssertionError>
{
    for (matcher, repeated) in steps {
        verify(matcher, repeated, records)?;
    }
    let mut pos = 0;
    for (matcher, repeated) in steps {
        let found = records[pos..].iter()
            .enumerate()
            .filter(|(_, r)| matches(matcher, r))
            .map(|(i, _)| pos + i)
            .collect::<Vec<_>>();
        match repeated.least_positive(found.len()) {
            Some(n) => pos = found[n - 1] + 1,
            None if found.is_empty() && repeated.matches(0) => (),
            None => return Err(order_failure(steps, matcher, found.len(),
                                             records))
        }
    }
    Ok(())
}

fn order_failure(steps: &[(CallMatcher, Repeated)], failed: &CallMatcher,
                 found: usize, records: &[Arc<CallRecord>]) -> AssertionError
{
    let mut message =
        "Assertion failed for the following calls, in this order:".to_owned();
    for (m, r) in steps {
        write!(message, "\n  {} {}", m, r).unwrap_or(());
    }
    write!(message,
           "\nThe call {} was not found in the expected position among the calls:",
           failed).unwrap_or(());
    list_calls(&mut message, None, records);
    debug!("{}", message);
    AssertionError {
        message,
        expected: failed.to_string(),
        actual_count: found,
        near_misses: Vec::new()
    }
}

/// Where an assertion looks for calls.
#[derive(Clone, Debug)]
enum Scope {
    Fake(Arc<FakeHistory>),
    Global,
}

fn snapshot(scopes: &[Scope]) -> Vec<Arc<CallRecord>> {
    let mut fakes: Vec<&Arc<FakeHistory>> = Vec::new();
    for scope in scopes {
        match scope {
            Scope::Global => return CallHistory::global().snapshot(),
            Scope::Fake(h) => {
                if !fakes.iter().any(|f| f.fake() == h.fake()) {
                    fakes.push(h);
                }
            }
        }
    }
    history::merge(fakes.iter().map(|h| h.snapshot()))
}

/// An expectation about calls, waiting to be checked.
///
/// The `must_*` methods panic with the [`AssertionError`] message on failure,
/// which fails the surrounding test.  [`check`](#method.check) returns the
/// error instead.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// let save = Member::method("Store", "save").param::<u32>("id");
/// let fake = Fake::dynamic("Store");
/// fake.call(&save, values![1u32]).unwrap();
/// fake.call(&save, values![2u32]).unwrap();
///
/// fake.assert_that(&CallMatcher::new(&save)).must_have_happened(2usize..);
/// fake.assert_that(&CallMatcher::new(&save).with_value(0, 3u32).unwrap())
///     .must_not_have_happened();
/// ```
#[derive(Clone, Debug)]
pub struct CallAssertion {
    matcher: CallMatcher,
    scope: Scope,
}

impl CallAssertion {
    pub(crate) fn new(matcher: &CallMatcher, history: Arc<FakeHistory>)
        -> Self
    {
        CallAssertion{matcher: matcher.clone(), scope: Scope::Fake(history)}
    }

    /// Look for matching calls among the calls to every live fake.
    pub fn global(matcher: &CallMatcher) -> Self {
        CallAssertion{matcher: matcher.clone(), scope: Scope::Global}
    }

    pub fn matcher(&self) -> &CallMatcher {
        &self.matcher
    }

    /// How many matching calls have been recorded so far.
    pub fn count(&self) -> usize {
        snapshot(&[self.scope.clone()]).iter()
            .filter(|r| matches(&self.matcher, r))
            .count()
    }

    pub fn check<R: Into<Repeated>>(&self, repeated: R)
        -> Result<(), AssertionError>
    {
        let records = snapshot(&[self.scope.clone()]);
        verify(&self.matcher, &repeated.into(), &records)
    }

    /// Panic unless the call happened as often as `repeated` says.  The
    /// result can be chained with [`then`](OrderedAssertion::then).
    pub fn must_have_happened<R: Into<Repeated>>(&self, repeated: R)
        -> OrderedAssertion
    {
        let repeated = repeated.into();
        if let Err(e) = self.check(repeated.clone()) {
            panic!("{}", e);
        }
        OrderedAssertion {
            steps: vec![(self.matcher.clone(), repeated)],
            scopes: vec![self.scope.clone()]
        }
    }

    pub fn must_have_happened_once(&self) -> OrderedAssertion {
        self.must_have_happened(Repeated::Once)
    }

    pub fn must_not_have_happened(&self) {
        self.must_have_happened(Repeated::Never);
    }
}

/// A chain of call assertions that must also have happened in order.
///
/// # Examples
/// ```
/// # use fakeit::*;
/// let open = Member::method("File", "open");
/// let close = Member::method("File", "close");
/// let fake = Fake::dynamic("File");
/// fake.call(&open, values![]).unwrap();
/// fake.call(&close, values![]).unwrap();
///
/// fake.assert_that(&CallMatcher::new(&open))
///     .must_have_happened_once()
///     .then(&fake.assert_that(&CallMatcher::new(&close)), Repeated::Once);
/// ```
#[derive(Clone, Debug)]
pub struct OrderedAssertion {
    steps: Vec<(CallMatcher, Repeated)>,
    scopes: Vec<Scope>,
}

impl OrderedAssertion {
    /// Like [`then`](#method.then), but return the error instead of
    /// panicking.
    pub fn try_then<R: Into<Repeated>>(mut self, next: &CallAssertion,
                                       repeated: R)
        -> Result<Self, AssertionError>
    {
        self.steps.push((next.matcher.clone(), repeated.into()));
        self.scopes.push(next.scope.clone());
        let records = snapshot(&self.scopes);
        verify_ordered(&self.steps, &records)?;
        Ok(self)
    }

    /// Panic unless `next` happened as often as `repeated` says, after
    /// everything earlier in the chain.
    pub fn then<R: Into<Repeated>>(self, next: &CallAssertion, repeated: R)
        -> Self
    {
        match self.try_then(next, repeated) {
            Ok(s) => s,
            Err(e) => panic!("{}", e)
        }
    }
}
