//! Observers receiving the periodic counter reports.
//!
//! Once per interval the [`Reporter`](crate::reporter::Reporter) takes a
//! single [`Report`] and hands it to every registered [`Observer`]:
//!
//! - [`text`] - the operator line printed to stdout (default)
//! - [`table`] - a Name/Value table using the `tabled` crate
//! - [`json`] - one JSON object per report
//!
//! Any `Fn(&Report) + Send + Sync` closure is an observer as well.
//!
//! # Feature Flags
//!
//! - `table` - Enables the [`table`] module
//! - `json` - Enables the [`json`] module
//! - `full` - Enables all observer modules
//!
//! # Example
//!
//! ```rust
//! use numeri::observers::{Observer, text::TextObserver};
//! use numeri::snapshot::Report;
//!
//! let report = Report::new(4, 1, 10);
//! let line = TextObserver::new().render(&report);
//! assert!(line.contains("Received 4 unique numbers, 1 duplicate(s). Unique total: 10"));
//!
//! let closure = |report: &Report| assert_eq!(report.total, 10);
//! closure.observe(&report).unwrap();
//! ```

mod error;

pub use error::{ObserverError, Result};

pub mod text;

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;

use crate::snapshot::Report;

/// A destination for counter reports.
pub trait Observer: Send + Sync {
    /// Consumes one report.
    fn observe(&self, report: &Report) -> Result<()>;
}

impl<F> Observer for F
where
    F: Fn(&Report) + Send + Sync,
{
    fn observe(&self, report: &Report) -> Result<()> {
        self(report);
        Ok(())
    }
}
