// vim: tw=80
//! The log of every call made to every fake.
//!
//! Each fake owns a [`FakeHistory`].  All of them draw their sequence numbers
//! from one process-wide counter, so records can be merged across fakes into
//! a single total order.  [`CallHistory::global`] is that merged view.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
        Weak
    }
};

use lazy_static::lazy_static;
use tracing::trace;

use crate::{
    call::{fmt_arguments, ArgumentList, FakeId},
    error::Exception,
    lock,
    member::Member,
    value::{Argument, Value}
};

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref GLOBAL: CallHistory = CallHistory {
        fakes: Mutex::new(Vec::new())
    };
}

/// How a recorded call ended.
#[derive(Clone, Debug)]
pub enum CallOutcome {
    /// The call returned.  `None` for members that return nothing.
    Returned(Option<Value>),
    /// A configured exception was raised to the caller.
    Threw(Exception),
    /// The call could not be completed, for example because no default value
    /// exists for the member's return type.
    Failed(String),
}

/// One completed call.  Immutable once recorded.
#[derive(Clone, Debug)]
pub struct CallRecord {
    sequence: u64,
    ordinal: usize,
    fake: FakeId,
    arguments: ArgumentList,
    outcome: CallOutcome,
}

impl CallRecord {
    /// Process-wide position of this call.  Strictly increasing in the order
    /// calls were recorded, across all fakes.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Position of this call within its own fake's history.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn fake(&self) -> FakeId {
        self.fake
    }

    pub fn member(&self) -> &Member {
        self.arguments.member()
    }

    /// The actual arguments, including values written to out and ref
    /// parameters.
    pub fn arguments(&self) -> &ArgumentList {
        &self.arguments
    }

    pub fn argument<T: Argument>(&self, index: usize) -> Option<&T> {
        self.arguments.get(index)
    }

    pub fn outcome(&self) -> &CallOutcome {
        &self.outcome
    }

    /// The value the call returned, if it returned one of type `T`.
    pub fn return_value<T: Argument>(&self) -> Option<&T> {
        match &self.outcome {
            CallOutcome::Returned(Some(v)) => v.downcast_ref::<T>(),
            _ => None
        }
    }

    pub fn threw(&self) -> bool {
        matches!(self.outcome, CallOutcome::Threw(_))
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.member())?;
        fmt_arguments(self.arguments.values(), f)
    }
}

/// The calls received by a single fake, in the order they completed.
#[derive(Debug)]
pub struct FakeHistory {
    fake: FakeId,
    records: Mutex<Vec<Arc<CallRecord>>>,
}

impl FakeHistory {
    /// Create a history and make it visible through [`CallHistory::global`].
    pub(crate) fn new(fake: FakeId) -> Arc<Self> {
        let history = Arc::new(FakeHistory {
            fake,
            records: Mutex::new(Vec::new())
        });
        CallHistory::global().register(&history);
        history
    }

    pub fn fake(&self) -> FakeId {
        self.fake
    }

    /// Record a completed call.
    pub(crate) fn append(&self, arguments: ArgumentList, outcome: CallOutcome)
        -> Arc<CallRecord>
    {
        let mut records = lock(&self.records);
        // Numbered under the lock, so that per-fake order and global order
        // always agree.
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(CallRecord {
            sequence,
            ordinal: records.len(),
            fake: self.fake,
            arguments,
            outcome
        });
        trace!(fake = %self.fake, sequence, "recorded {}", record);
        records.push(record.clone());
        record
    }

    /// A copy of the log as it is right now.
    pub fn snapshot(&self) -> Vec<Arc<CallRecord>> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    /// Forget every call recorded so far.  Sequence numbers are never reused.
    pub fn clear(&self) {
        lock(&self.records).clear();
    }
}

/// Process-wide view over the histories of every live fake.
///
/// Fakes register themselves when they are created and drop out when the
/// last reference to them goes away.
#[derive(Debug)]
pub struct CallHistory {
    fakes: Mutex<Vec<Weak<FakeHistory>>>,
}

impl CallHistory {
    pub fn global() -> &'static CallHistory {
        &GLOBAL
    }

    fn register(&self, history: &Arc<FakeHistory>) {
        let mut fakes = lock(&self.fakes);
        fakes.retain(|w| w.strong_count() > 0);
        fakes.push(Arc::downgrade(history));
    }

    fn live(&self) -> Vec<Arc<FakeHistory>> {
        lock(&self.fakes).iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Every recorded call of every live fake, ordered by sequence number.
    pub fn snapshot(&self) -> Vec<Arc<CallRecord>> {
        merge(self.live().iter().map(|h| h.snapshot()))
    }

    /// Every recorded call of the given fakes, ordered by sequence number.
    pub fn snapshot_of(&self, fakes: &[FakeId]) -> Vec<Arc<CallRecord>> {
        merge(self.live().iter()
            .filter(|h| fakes.contains(&h.fake))
            .map(|h| h.snapshot()))
    }

    /// Clear the history of every live fake.  Meant to be called between
    /// tests that share fakes.
    pub fn clear(&self) {
        for h in self.live() {
            h.clear();
        }
    }
}

/// Merge several logs into one, by sequence number.
pub(crate) fn merge<I>(logs: I) -> Vec<Arc<CallRecord>>
    where I: IntoIterator<Item = Vec<Arc<CallRecord>>>
{
    let mut all: Vec<_> = logs.into_iter().flatten().collect();
    all.sort_by_key(|r| r.sequence);
    all
}

#[cfg(test)]
mod t {
    use std::thread;

    use super::*;
    use crate::values;

    fn get_count() -> Member {
        Member::method("Counter", "get_count").returns::<i32>()
    }

    fn args() -> ArgumentList {
        ArgumentList::new(get_count(), values![])
    }

    #[test]
    fn append_is_monotonic() {
        let h = FakeHistory::new(FakeId::next());
        let a = h.append(args(), CallOutcome::Returned(Some(Value::new(0i32))));
        let b = h.append(args(), CallOutcome::Returned(Some(Value::new(1i32))));
        assert!(a.sequence() < b.sequence());
        assert_eq!(0, a.ordinal());
        assert_eq!(1, b.ordinal());
        assert_eq!(Some(&1), b.return_value::<i32>());
        assert_eq!(2, h.len());
    }

    #[test]
    fn concurrent_appends_never_share_a_sequence() {
        let h = FakeHistory::new(FakeId::next());
        let threads = (0..8).map(|_| {
            let h = h.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    h.append(args(), CallOutcome::Returned(None));
                }
            })
        }).collect::<Vec<_>>();
        for t in threads {
            t.join().unwrap();
        }
        let records = h.snapshot();
        assert_eq!(800, records.len());
        for w in records.windows(2) {
            assert!(w[0].sequence() < w[1].sequence());
        }
    }

    #[test]
    fn global_merges_fakes() {
        let h1 = FakeHistory::new(FakeId::next());
        let h2 = FakeHistory::new(FakeId::next());
        let a = h1.append(args(), CallOutcome::Returned(None));
        let b = h2.append(args(), CallOutcome::Returned(None));
        let c = h1.append(args(), CallOutcome::Returned(None));
        let merged = CallHistory::global().snapshot_of(&[h1.fake(), h2.fake()]);
        let seqs = merged.iter().map(|r| r.sequence()).collect::<Vec<_>>();
        assert_eq!(vec![a.sequence(), b.sequence(), c.sequence()], seqs);
    }

    #[test]
    fn dropped_fakes_leave_the_global_view() {
        let fake = FakeId::next();
        {
            let h = FakeHistory::new(fake);
            h.append(args(), CallOutcome::Returned(None));
        }
        assert!(CallHistory::global().snapshot_of(&[fake]).is_empty());
    }

    #[test]
    fn clear() {
        let h = FakeHistory::new(FakeId::next());
        let a = h.append(args(), CallOutcome::Returned(None));
        h.clear();
        assert!(h.is_empty());
        let b = h.append(args(), CallOutcome::Returned(None));
        assert!(a.sequence() < b.sequence());
    }

    #[test]
    fn display() {
        let h = FakeHistory::new(FakeId::next());
        let r = h.append(args(), CallOutcome::Returned(None));
        assert_eq!("Counter::get_count()", r.to_string());
    }
}
