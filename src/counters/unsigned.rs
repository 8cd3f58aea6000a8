//! 32-bit unsigned counter backed by a single cache-padded atomic.
//!
//! This module provides [`Unsigned`], the counter type behind every entry of
//! the [`CounterSet`](crate::counters::CounterSet). Updates are lock-free and
//! every operation returns the value it observed.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;
use std::fmt::Debug;

use crate::counters::Observable;

/// A lock-free 32-bit counter.
///
/// Arithmetic wraps on overflow, like the underlying [`AtomicU32`].
///
/// # Examples
///
/// Basic usage:
///
/// ```rust
/// use numeri::counters::unsigned::Unsigned;
/// use numeri::counters::Observable;
///
/// let counter = Unsigned::new();
/// assert_eq!(counter.increment(), 1);
/// assert_eq!(counter.add(5), 6);
/// assert_eq!(counter.value(), 6);
/// ```
///
/// Multi-threaded usage:
///
/// ```rust
/// use numeri::counters::unsigned::Unsigned;
/// use numeri::counters::Observable;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(Unsigned::new());
/// let mut handles = vec![];
///
/// for _ in 0..4 {
///     let c = Arc::clone(&counter);
///     handles.push(thread::spawn(move || {
///         for _ in 0..1000 {
///             c.increment();
///         }
///     }));
/// }
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(counter.value(), 4000);
/// ```
pub struct Unsigned {
    name: &'static str,
    value: CachePadded<AtomicU32>,
}

impl Unsigned {
    /// Creates a new counter initialized to zero with no name.
    pub const fn new() -> Self {
        Unsigned {
            value: CachePadded::new(AtomicU32::new(0)),
            name: "",
        }
    }

    /// Sets the name of this counter, returning `self` for method chaining.
    ///
    /// The name is used when formatting the counter and by the observers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use numeri::counters::unsigned::Unsigned;
    /// use numeri::counters::Observable;
    ///
    /// let counter = Unsigned::new().with_name("duplicate");
    /// assert_eq!(counter.name(), "duplicate");
    /// ```
    pub const fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Adds one and returns the value after the increment.
    #[inline]
    pub fn increment(&self) -> u32 {
        self.add(1)
    }

    /// Adds `value` and returns the value after the addition.
    #[inline]
    pub fn add(&self, value: u32) -> u32 {
        self.value
            .fetch_add(value, Ordering::Relaxed)
            .wrapping_add(value)
    }
}

impl Observable for Unsigned {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    #[inline]
    fn value(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }

    /// Swaps the counter with zero and returns the previous value.
    #[inline]
    fn value_and_reset(&self) -> u32 {
        self.value.swap(0, Ordering::Relaxed)
    }
}

impl Default for Unsigned {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Unsigned {
    /// Output format: `name{value}`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.value.load(Ordering::Relaxed))
    }
}
