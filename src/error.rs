//! Errors surfaced by the server.
//!
//! Per-connection problems never show up here: a malformed frame or a peer
//! going away only ends that session (see [`ProtocolError`]). A
//! [`ServerError`] stops the whole server.
//!
//! [`ProtocolError`]: crate::protocol::ProtocolError

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// `accept()` failed while no shutdown was pending.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The bound address could not be read back.
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// The record log file could not be created.
    #[error("failed to create record log {}: {source}", path.display())]
    RecordLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
