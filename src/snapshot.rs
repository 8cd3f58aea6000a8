//! Point-in-time reports of the server counters.
//!
//! A [`Report`] is what the reporter hands to every
//! [`Observer`](crate::observers::Observer) once per interval. With the
//! `serde` feature it can be serialized with any serde format:
//!
//! ```toml
//! [dependencies]
//! numeri = { version = "0.1", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use numeri::snapshot::Report;
//!
//! let report = Report::new(3, 1, 42).with_timestamp(1_700_000_000_000);
//! assert_eq!(report.entries(), [("new", 3), ("duplicate", 1), ("total", 42)]);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counter values captured at one reporting boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Report {
    /// Optional timestamp in milliseconds since Unix epoch.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub timestamp_ms: Option<u64>,
    /// First-seen records in the interval.
    pub new: u32,
    /// Already-seen records in the interval.
    pub duplicate: u32,
    /// Unique records since the server started.
    pub total: u32,
}

impl Report {
    /// Creates a report without a timestamp.
    pub const fn new(new: u32, duplicate: u32, total: u32) -> Self {
        Self {
            timestamp_ms: None,
            new,
            duplicate,
            total,
        }
    }

    /// Attaches a timestamp, in milliseconds since Unix epoch.
    pub const fn with_timestamp(self, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            ..self
        }
    }

    /// Attaches the current wall-clock time.
    pub fn stamped_now(self) -> Self {
        self.with_timestamp(current_timestamp_ms())
    }

    /// Valid frames processed in the interval.
    pub fn processed(&self) -> u64 {
        u64::from(self.new) + u64::from(self.duplicate)
    }

    /// Returns `(name, value)` pairs in report order.
    pub fn entries(&self) -> [(&'static str, u32); 3] {
        [
            ("new", self.new),
            ("duplicate", self.duplicate),
            ("total", self.total),
        ]
    }
}

/// Returns the current time in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
