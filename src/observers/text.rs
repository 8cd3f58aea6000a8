//! Plain-text observer: the operator-facing report line.
//!
//! ```text
//!
//! Received 12 unique numbers, 3 duplicate(s). Unique total: 240
//!
//! ```

use std::io::{self, Write};

use crate::observers::{Observer, Result};
use crate::snapshot::Report;

/// Prints each report as one human-readable line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextObserver;

impl TextObserver {
    /// Creates a new text observer.
    pub fn new() -> Self {
        Self
    }

    /// Renders a report, surrounded by blank lines.
    pub fn render(&self, report: &Report) -> String {
        format!(
            "\nReceived {} unique numbers, {} duplicate(s). Unique total: {}\n\n",
            report.new, report.duplicate, report.total
        )
    }
}

impl Observer for TextObserver {
    fn observe(&self, report: &Report) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(self.render(report).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}
