//! Table observer for pretty-printing reports.
//!
//! This module provides [`TableObserver`], which renders a [`Report`] as a
//! formatted table using the `tabled` crate.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! numeri = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use numeri::observers::table::{TableObserver, TableStyle};
//! use numeri::snapshot::Report;
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded);
//! println!("{}", observer.render(&Report::new(12, 3, 240)));
//! // ╭───────────┬───────╮
//! // │ Name      │ Value │
//! // ├───────────┼───────┤
//! // │ new       │ 12    │
//! // │ duplicate │ 3     │
//! // │ total     │ 240   │
//! // ╰───────────┴───────╯
//! ```

use std::io::{self, Write};

use crate::observers::{Observer, Result};
use crate::snapshot::Report;
use tabled::{settings::Style, Table, Tabled};

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row.
    pub show_header: bool,
    /// Custom title for the table (optional).
    pub title: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
        }
    }
}

/// Internal row representation for tabled.
#[derive(Tabled)]
struct CounterRow {
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: u32,
}

/// An observer that renders each report as a table on stdout.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    ///
    /// Default style is [`TableStyle::Rounded`] with a header row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets an optional title printed above the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    /// Renders the report as a formatted table string.
    pub fn render(&self, report: &Report) -> String {
        let rows: Vec<CounterRow> = report
            .entries()
            .into_iter()
            .map(|(name, value)| CounterRow { name, value })
            .collect();

        let mut table = Table::new(&rows);
        self.apply_style(&mut table);

        if !self.config.show_header {
            table.with(tabled::settings::Remove::row(
                tabled::settings::object::Rows::first(),
            ));
        }

        if let Some(ref title) = self.config.title {
            format!("{}\n{}", title, table)
        } else {
            table.to_string()
        }
    }
}

impl Observer for TableObserver {
    fn observe(&self, report: &Report) -> Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", self.render(report))?;
        stdout.flush()?;
        Ok(())
    }
}
