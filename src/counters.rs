//! Counters shared by every connection and read by the reporter.
//!
//! The server keeps three 32-bit counters:
//!
//! | Counter | Reset | Meaning |
//! |---------|-------|---------|
//! | `new` | every report | first-seen records in the current interval |
//! | `duplicate` | every report | already-seen records in the current interval |
//! | `total` | never | unique records since the process started |
//!
//! # Design
//!
//! 1. **Lock-free updates**: every counter is a single atomic, so sessions
//!    never block each other when counting.
//!
//! 2. **Cache line padding**: each atomic is wrapped in
//!    [`crossbeam_utils::CachePadded`]. The three counters are bumped from
//!    different tasks at the same time; padding keeps them from sharing a
//!    cache line.
//!
//! 3. **Relaxed ordering**: counters do not publish other memory, so all
//!    operations use `Ordering::Relaxed`.
//!
//! 4. **Swap on reset**: `value_and_reset()` is a single atomic swap with
//!    zero. An increment that lands while the reporter runs is counted in
//!    exactly one interval.
//!
//! The lifetime `total` is wrapped in [`NonResettable`], so the reporter can
//! treat all three counters uniformly through [`Observable`] and still never
//! reset it.
//!
//! ```rust
//! use numeri::counters::{CounterSet, Observable};
//!
//! let counters = CounterSet::new();
//! counters.record_new();
//! counters.record_duplicate();
//!
//! let report = counters.report();
//! assert_eq!((report.new, report.duplicate, report.total), (1, 1, 1));
//!
//! // `new` and `duplicate` start over, `total` keeps counting.
//! assert_eq!(counters.new_counter().value(), 0);
//! assert_eq!(counters.total_counter().value(), 1);
//! ```

pub mod unsigned;

use std::fmt::{Debug, Display};

use crate::adapters::NonResettable;
use crate::snapshot::Report;
use unsigned::Unsigned;

/// A trait for counters that can be read and reset by name.
///
/// This trait provides a common interface for the reporter and the
/// observers, so they can treat resettable and lifetime counters alike.
///
/// # Examples
///
/// ```rust
/// use numeri::counters::Observable;
/// use numeri::counters::unsigned::Unsigned;
///
/// let counter = Unsigned::new().with_name("new");
/// counter.increment();
///
/// assert_eq!(counter.name(), "new");
/// assert_eq!(counter.value_and_reset(), 1);
/// assert_eq!(counter.value(), 0);
/// ```
pub trait Observable: Debug + Send + Sync {
    /// Returns the name of this counter, or an empty string.
    fn name(&self) -> &str;

    /// Returns the current value of the counter.
    fn value(&self) -> u32;

    /// Returns the current value and resets the counter atomically.
    ///
    /// Implementations that must never be reset return the value unchanged,
    /// see [`NonResettable`].
    fn value_and_reset(&self) -> u32;
}

impl Display for dyn Observable + '_ {
    /// Formats the counter as `name:value` if named, or just `value` otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.name().is_empty() {
            write!(f, "{}:{}", self.name(), self.value())
        } else {
            write!(f, "{}", self.value())
        }
    }
}

/// The three server counters.
///
/// Created once per server and shared by reference with every session and
/// with the reporter.
#[derive(Debug)]
pub struct CounterSet {
    new: Unsigned,
    duplicate: Unsigned,
    total: NonResettable<Unsigned>,
}

impl CounterSet {
    /// Creates a counter set with every counter at zero.
    pub const fn new() -> Self {
        Self {
            new: Unsigned::new().with_name("new"),
            duplicate: Unsigned::new().with_name("duplicate"),
            total: NonResettable::new(Unsigned::new().with_name("total")),
        }
    }

    /// Counts a first-seen record: bumps `new` and `total`.
    ///
    /// Returns the lifetime total observed after the increment.
    #[inline]
    pub fn record_new(&self) -> u32 {
        self.new.increment();
        self.total.increment()
    }

    /// Counts an already-seen record. Returns the interval's duplicate count.
    #[inline]
    pub fn record_duplicate(&self) -> u32 {
        self.duplicate.increment()
    }

    /// Returns the counter of first-seen records in the current interval.
    pub fn new_counter(&self) -> &Unsigned {
        &self.new
    }

    /// Returns the counter of duplicate records in the current interval.
    pub fn duplicate_counter(&self) -> &Unsigned {
        &self.duplicate
    }

    /// Returns the lifetime counter of unique records.
    pub fn total_counter(&self) -> &NonResettable<Unsigned> {
        &self.total
    }

    /// Returns the counters in report order: `new`, `duplicate`, `total`.
    pub fn observables(&self) -> [&dyn Observable; 3] {
        [&self.new, &self.duplicate, &self.total]
    }

    /// Reads all counters without resetting anything.
    pub fn snapshot(&self) -> Report {
        let [new, duplicate, total] = self.observables().map(|c| c.value());
        Report::new(new, duplicate, total)
    }

    /// Reads all counters and resets the interval ones.
    ///
    /// The three reads are not a transaction: an update landing between
    /// them may show up in `total` but in the next interval's `new`.
    pub fn report(&self) -> Report {
        let [new, duplicate, total] = self.observables().map(|c| c.value_and_reset());
        Report::new(new, duplicate, total)
    }
}

impl Default for CounterSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let counters = CounterSet::new();
        assert_eq!(counters.snapshot(), Report::new(0, 0, 0));
    }

    #[test]
    fn test_record_new() {
        let counters = CounterSet::new();
        assert_eq!(counters.record_new(), 1);
        assert_eq!(counters.record_new(), 2);
        assert_eq!(counters.new_counter().value(), 2);
        assert_eq!(counters.total_counter().value(), 2);
        assert_eq!(counters.duplicate_counter().value(), 0);
    }

    #[test]
    fn test_record_duplicate() {
        let counters = CounterSet::new();
        assert_eq!(counters.record_duplicate(), 1);
        assert_eq!(counters.record_duplicate(), 2);
        assert_eq!(counters.snapshot(), Report::new(0, 2, 0));
    }

    #[test]
    fn test_report_resets_interval_counters_only() {
        let counters = CounterSet::new();
        counters.record_new();
        counters.record_new();
        counters.record_duplicate();

        assert_eq!(counters.report(), Report::new(2, 1, 2));
        assert_eq!(counters.snapshot(), Report::new(0, 0, 2));

        counters.record_new();
        assert_eq!(counters.report(), Report::new(1, 0, 3));
    }

    #[test]
    fn test_snapshot_does_not_reset() {
        let counters = CounterSet::new();
        counters.record_new();
        assert_eq!(counters.snapshot(), Report::new(1, 0, 1));
        assert_eq!(counters.snapshot(), Report::new(1, 0, 1));
    }

    #[test]
    fn test_observable_names() {
        let counters = CounterSet::new();
        let names: Vec<&str> = counters.observables().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["new", "duplicate", "total"]);
    }

    #[test]
    fn test_dyn_format() {
        let counters = CounterSet::new();
        counters.record_new();
        let formatted: Vec<String> = counters
            .observables()
            .iter()
            .map(|c| format!("{}", c))
            .collect();
        assert_eq!(formatted, ["new:1", "duplicate:0", "total:1"]);
    }

    #[test]
    fn test_concurrent_totals() {
        use std::sync::Arc;
        use std::thread;

        let counters = Arc::new(CounterSet::new());
        let mut handles = vec![];

        for i in 0..4 {
            let counters = Arc::clone(&counters);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    if i % 2 == 0 {
                        counters.record_new();
                    } else {
                        counters.record_duplicate();
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.report(), Report::new(500, 500, 500));
    }

    #[test]
    fn test_reports_lose_no_updates() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let counters = Arc::new(CounterSet::new());
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let counters = Arc::clone(&counters);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    counters.record_new();
                }
                done.store(true, Ordering::Release);
            })
        };

        let mut seen = 0u32;
        while !done.load(Ordering::Acquire) {
            seen += counters.report().new;
        }
        writer.join().unwrap();
        seen += counters.report().new;

        assert_eq!(seen, 10_000);
        assert_eq!(counters.total_counter().value(), 10_000);
    }
}
