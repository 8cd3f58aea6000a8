//! Non-resettable wrapper for lifetime counters.
//!
//! This module provides [`NonResettable`], a wrapper that prevents a counter
//! from being reset when `value_and_reset()` is called. The server uses it for
//! the lifetime `total`, which the reporter reads every interval together
//! with the resettable counters.
//!
//! # Example
//!
//! ```rust
//! use numeri::counters::unsigned::Unsigned;
//! use numeri::counters::Observable;
//! use numeri::adapters::NonResettable;
//!
//! let counter = NonResettable::new(Unsigned::new().with_name("total"));
//! counter.add(100);
//!
//! // value_and_reset() returns the value but does NOT reset
//! assert_eq!(counter.value_and_reset(), 100);
//! assert_eq!(counter.value(), 100);
//! ```

use crate::counters::Observable;
use std::fmt::{self, Debug};
use std::ops::Deref;

/// A wrapper that prevents a counter from being reset.
///
/// Reads go to the inner counter; `value_and_reset()` behaves like
/// `value()`. Updates reach the inner counter through [`Deref`].
pub struct NonResettable<T> {
    inner: T,
}

impl<T> NonResettable<T> {
    /// Creates a new non-resettable wrapper around the given counter.
    pub const fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Returns a reference to the inner counter.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner counter.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Observable> Observable for NonResettable<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn value(&self) -> u32 {
        self.inner.value()
    }

    /// Returns the current value without resetting the counter.
    fn value_and_reset(&self) -> u32 {
        self.inner.value()
    }
}

impl<T: Debug> Debug for NonResettable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonResettable")
            .field("inner", &self.inner)
            .finish()
    }
}

/// Allows transparent access to the inner counter's methods.
impl<T> Deref for NonResettable<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

// No DerefMut: a mutable path to the inner counter could reset it.
