//! Unified error type for all observers.
//!
//! Every observer returns [`ObserverError`], so the reporter can drive a mix
//! of observers with one error path.

use thiserror::Error;

/// Unified error type for all observer operations.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Error writing the rendered report.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the JSON observer.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by a custom observer.
    #[error("observer error: {0}")]
    Custom(String),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;
