//! Number deduplication server.
//!
//! Run with:
//! ```bash
//! cargo run --bin numeri_server -- --help
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use numeri::config::{AcceptErrorPolicy, ServerConfig, DEFAULT_RECORD_LOG};
use numeri::observers::json::JsonObserver;
use numeri::observers::table::{TableObserver, TableStyle};
use numeri::observers::text::TextObserver;
use numeri::server::Server;
use tracing::{error, Level};

/// Report output format.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// One "Received ..." line per interval
    #[default]
    Text,
    /// Name/Value table
    Table,
    /// One JSON object per interval
    Json,
}

/// Behavior on accept errors outside of shutdown.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum AcceptErrors {
    /// Stop the server with a non-zero exit status
    #[default]
    FailFast,
    /// Log and keep accepting
    Continue,
}

impl From<AcceptErrors> for AcceptErrorPolicy {
    fn from(choice: AcceptErrors) -> Self {
        match choice {
            AcceptErrors::FailFast => AcceptErrorPolicy::FailFast,
            AcceptErrors::Continue => AcceptErrorPolicy::Continue,
        }
    }
}

/// Accepts 9-digit numbers from up to 5 concurrent clients and logs each
/// unique one. Send "terminate" to shut down.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:4000")]
    addr: SocketAddr,

    /// Seconds between reports
    #[arg(short, long, default_value = "10")]
    report_interval: u64,

    /// Disable periodic reports
    #[arg(long)]
    no_report: bool,

    /// File receiving one line per unique number (recreated at startup)
    #[arg(short, long, default_value = DEFAULT_RECORD_LOG)]
    log_file: PathBuf,

    /// Write unique numbers to stderr instead of a file
    #[arg(long, conflicts_with = "log_file")]
    no_log_file: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Accept error policy
    #[arg(long, value_enum, default_value = "fail-fast")]
    accept_errors: AcceptErrors,

    /// Log debug events
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> ServerConfig {
        let config = ServerConfig::new()
            .with_addr(self.addr)
            .with_report_interval(Duration::from_secs(self.report_interval))
            .with_reporting(!self.no_report)
            .with_accept_errors(self.accept_errors.into());
        if self.no_log_file {
            config.without_record_file()
        } else {
            config.with_record_file(&self.log_file)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let server = Server::bind(args.config())
        .await
        .with_context(|| format!("cannot start server on {}", args.addr))?;

    let server = match args.format {
        OutputFormat::Text => server.with_observer(TextObserver::new()),
        OutputFormat::Table => server.with_observer(
            TableObserver::new()
                .with_style(TableStyle::Rounded)
                .with_title("Interval report"),
        ),
        OutputFormat::Json => server.with_observer(JsonObserver::new().include_timestamp(true)),
    };

    if let Err(e) = server.run().await {
        error!(error = %e, "fatal server error");
        std::process::exit(1);
    }
    Ok(())
}
