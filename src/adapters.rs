//! Wrapper types for extending counter functionality.
//!
//! | Wrapper | Description |
//! |---------|-------------|
//! | [`NonResettable`] | Prevents reset on `value_and_reset()` - for lifetime counters |

mod non_resettable;

pub use non_resettable::NonResettable;
