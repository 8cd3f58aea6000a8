//! Server configuration.
//!
//! [`ServerConfig`] is a plain struct with a [`Default`] implementation and
//! consuming `with_*` builder methods. Protocol constants and the connection
//! cap live here as well, but they are policy, not configuration: nothing
//! outside this module can change them.
//!
//! # Examples
//!
//! ```rust
//! use numeri::config::{AcceptErrorPolicy, ServerConfig};
//! use std::time::Duration;
//!
//! let config = ServerConfig::default()
//!     .with_addr("127.0.0.1:0".parse().unwrap())
//!     .with_report_interval(Duration::from_secs(1))
//!     .with_accept_errors(AcceptErrorPolicy::Continue)
//!     .without_record_file();
//!
//! assert!(config.record_log.is_none());
//! ```

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

/// TCP port the server listens on by default.
pub const DEFAULT_PORT: u16 = 4000;

/// Hard cap on concurrently open client connections.
pub const MAX_CONNECTIONS: usize = 5;

/// Period between two reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Default path of the record log.
pub const DEFAULT_RECORD_LOG: &str = "numbers.log";

/// What the acceptor does when `accept()` fails while no shutdown is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcceptErrorPolicy {
    /// Stop the server and surface the error to the caller.
    #[default]
    FailFast,
    /// Log the error, back off briefly and keep accepting.
    Continue,
}

/// Configuration for a [`Server`](crate::server::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub addr: SocketAddr,
    /// Period of the reporter.
    pub report_interval: Duration,
    /// Whether the reporter runs at all.
    pub reporting: bool,
    /// Policy applied to accept errors outside of shutdown.
    pub accept_errors: AcceptErrorPolicy,
    /// File receiving one line per new record; `None` writes to stderr.
    pub record_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            report_interval: DEFAULT_REPORT_INTERVAL,
            reporting: true,
            accept_errors: AcceptErrorPolicy::default(),
            record_log: Some(PathBuf::from(DEFAULT_RECORD_LOG)),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listening address.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the reporting period.
    ///
    /// A zero period is bumped to one millisecond.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Enables or disables the reporter.
    pub fn with_reporting(mut self, enabled: bool) -> Self {
        self.reporting = enabled;
        self
    }

    /// Sets the accept error policy.
    pub fn with_accept_errors(mut self, policy: AcceptErrorPolicy) -> Self {
        self.accept_errors = policy;
        self
    }

    /// Sets the path of the record log file.
    pub fn with_record_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_log = Some(path.into());
        self
    }

    /// Sends record lines to stderr instead of a file.
    pub fn without_record_file(mut self) -> Self {
        self.record_log = None;
        self
    }
}
