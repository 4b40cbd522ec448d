// vim: tw=80
//! How many times a call is expected to have happened.

use std::{
    fmt,
    ops::{Range, RangeFrom, RangeInclusive, RangeToInclusive},
    sync::Arc
};

/// A quantified constraint on a call count.
///
/// Ranges convert into the corresponding variant.  Half-open ranges exclude
/// their end:
/// ```
/// # use fakeit::*;
/// assert!(Repeated::from(2usize..4).matches(3));
/// assert!(!Repeated::from(2usize..4).matches(4));
/// assert!(Repeated::from(2usize..=4).matches(4));
/// assert!(Repeated::from(2usize..).matches(100));
/// assert_eq!("at most twice", Repeated::from(..=2usize).to_string());
/// ```
#[derive(Clone)]
pub enum Repeated {
    Never,
    Once,
    Twice,
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    /// Inclusive on both ends.
    Between(usize, usize),
    Matching(Arc<dyn Fn(usize) -> bool + Send + Sync>, String),
}

impl Repeated {
    /// A count accepted by an arbitrary predicate.
    pub fn matching<F, D>(f: F, description: D) -> Self
        where F: Fn(usize) -> bool + Send + Sync + 'static,
              D: Into<String>
    {
        Repeated::Matching(Arc::new(f), description.into())
    }

    pub fn matches(&self, count: usize) -> bool {
        match self {
            Repeated::Never => count == 0,
            Repeated::Once => count == 1,
            Repeated::Twice => count == 2,
            Repeated::Exactly(n) => count == *n,
            Repeated::AtLeast(n) => count >= *n,
            Repeated::AtMost(n) => count <= *n,
            Repeated::Between(min, max) => *min <= count && count <= *max,
            Repeated::Matching(f, _) => f(count)
        }
    }

    /// The smallest positive count, no greater than `available`, that this
    /// specification accepts.
    pub(crate) fn least_positive(&self, available: usize) -> Option<usize> {
        match self {
            Repeated::Never => None,
            Repeated::Once => Some(1).filter(|n| *n <= available),
            Repeated::Twice => Some(2).filter(|n| *n <= available),
            Repeated::Exactly(n) | Repeated::AtLeast(n) =>
                Some((*n).max(1)).filter(|n| *n <= available),
            Repeated::AtMost(n) => Some(1).filter(|_| *n >= 1 && available >= 1),
            Repeated::Between(min, max) => Some((*min).max(1))
                .filter(|n| n <= max && *n <= available),
            Repeated::Matching(f, _) => (1..=available).find(|n| f(*n))
        }
    }
}

fn times(f: &mut fmt::Formatter, n: usize) -> fmt::Result {
    match n {
        1 => f.write_str("once"),
        2 => f.write_str("twice"),
        n => write!(f, "{} times", n)
    }
}

impl fmt::Display for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Repeated::Never => f.write_str("never"),
            Repeated::Once => f.write_str("exactly once"),
            Repeated::Twice => f.write_str("exactly twice"),
            Repeated::Exactly(n) => {
                f.write_str("exactly ")?;
                times(f, *n)
            },
            Repeated::AtLeast(n) => {
                f.write_str("at least ")?;
                times(f, *n)
            },
            Repeated::AtMost(n) => {
                f.write_str("at most ")?;
                times(f, *n)
            },
            Repeated::Between(min, max) =>
                write!(f, "between {} and {} times", min, max),
            Repeated::Matching(_, d) =>
                write!(f, "a number of times matching {}", d)
        }
    }
}

impl fmt::Debug for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Repeated({})", self)
    }
}

impl From<usize> for Repeated {
    fn from(n: usize) -> Self {
        Repeated::Exactly(n)
    }
}

/// `2..4` accepts 2 or 3.
impl From<Range<usize>> for Repeated {
    fn from(r: Range<usize>) -> Self {
        if r.end <= r.start {
            Repeated::matching(|_| false, format!("{:?}", r))
        } else {
            Repeated::Between(r.start, r.end - 1)
        }
    }
}

impl From<RangeInclusive<usize>> for Repeated {
    fn from(r: RangeInclusive<usize>) -> Self {
        Repeated::Between(*r.start(), *r.end())
    }
}

impl From<RangeFrom<usize>> for Repeated {
    fn from(r: RangeFrom<usize>) -> Self {
        Repeated::AtLeast(r.start)
    }
}

impl From<RangeToInclusive<usize>> for Repeated {
    fn from(r: RangeToInclusive<usize>) -> Self {
        Repeated::AtMost(r.end)
    }
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn never() {
        assert!(Repeated::Never.matches(0));
        assert!(!Repeated::Never.matches(1));
    }

    #[test]
    fn exactly() {
        for n in 0..5 {
            assert_eq!(n == 3, Repeated::Exactly(3).matches(n));
        }
        assert!(Repeated::Once.matches(1));
        assert!(!Repeated::Twice.matches(1));
    }

    #[test]
    fn at_least() {
        assert!(!Repeated::AtLeast(2).matches(1));
        assert!(Repeated::AtLeast(2).matches(2));
        assert!(Repeated::AtLeast(2).matches(200));
    }

    #[test]
    fn at_most() {
        assert!(Repeated::AtMost(2).matches(0));
        assert!(!Repeated::AtMost(2).matches(3));
    }

    #[test]
    fn between() {
        let r = Repeated::Between(2, 4);
        assert_eq!(vec![false, false, true, true, true, false],
                   (0..6).map(|n| r.matches(n)).collect::<Vec<_>>());
    }

    #[test]
    fn empty_range() {
        #[allow(clippy::reversed_empty_ranges)]
        let r = Repeated::from(3usize..3);
        assert!(!r.matches(3));
        assert!(!r.matches(0));
    }

    #[test]
    fn matching() {
        let even = Repeated::matching(|n| n % 2 == 0, "an even count");
        assert!(even.matches(4));
        assert!(!even.matches(3));
        assert_eq!("a number of times matching an even count",
                   even.to_string());
    }

    #[test]
    fn display() {
        assert_eq!("never", Repeated::Never.to_string());
        assert_eq!("exactly once", Repeated::Exactly(1).to_string());
        assert_eq!("exactly 3 times", Repeated::Exactly(3).to_string());
        assert_eq!("at least once", Repeated::AtLeast(1).to_string());
        assert_eq!("between 2 and 4 times", Repeated::Between(2, 4).to_string());
    }

    #[test]
    fn least_positive() {
        assert_eq!(None, Repeated::Never.least_positive(10));
        assert_eq!(Some(1), Repeated::AtLeast(0).least_positive(10));
        assert_eq!(Some(3), Repeated::Exactly(3).least_positive(3));
        assert_eq!(None, Repeated::Exactly(3).least_positive(2));
        assert_eq!(Some(2), Repeated::Between(2, 5).least_positive(3));
        assert_eq!(Some(1), Repeated::AtMost(3).least_positive(3));
        let odd = Repeated::matching(|n| n % 2 == 1 && n > 1, "odd");
        assert_eq!(Some(3), odd.least_positive(4));
    }
}
