//! JSON observer for serializing reports.
//!
//! This module provides [`JsonObserver`], which prints each [`Report`] as
//! one JSON object using serde.
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! numeri = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use numeri::observers::json::JsonObserver;
//! use numeri::snapshot::Report;
//!
//! let json = JsonObserver::new().to_json(&Report::new(12, 3, 240)).unwrap();
//! assert_eq!(json, r#"{"new":12,"duplicate":3,"total":240}"#);
//! ```

use std::io::{self, Write};

use crate::observers::{Observer, Result};
use crate::snapshot::{current_timestamp_ms, Report};

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Whether to pretty-print the JSON output.
    pub pretty: bool,
    /// Whether to stamp reports that carry no timestamp with the current time.
    pub include_timestamp: bool,
}

/// An observer that prints each report as JSON on stdout.
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates a new JSON observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JSON observer with the specified configuration.
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty-printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Enables or disables timestamp inclusion.
    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Serializes a report to a JSON string.
    ///
    /// Without `include_timestamp` the timestamp is dropped even when the
    /// report carries one.
    pub fn to_json(&self, report: &Report) -> Result<String> {
        let report = match (self.config.include_timestamp, report.timestamp_ms) {
            (true, Some(_)) => *report,
            (true, None) => report.with_timestamp(current_timestamp_ms()),
            (false, _) => Report {
                timestamp_ms: None,
                ..*report
            },
        };

        let json = if self.config.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(json)
    }
}

impl Observer for JsonObserver {
    fn observe(&self, report: &Report) -> Result<()> {
        let json = self.to_json(report)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        stdout.flush()?;
        Ok(())
    }
}
