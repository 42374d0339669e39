//! Error types for sweep-rs

use thiserror::Error;

/// Result type alias for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Sweep error types
///
/// None of these are fatal to the scheduler: a failed pass is logged and the
/// loop moves on to the next tick.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Missing credentials, unreadable config or sender list
    #[error("Configuration error: {0}")]
    Config(String),

    /// TCP/TLS/login/select failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// IMAP command failed mid-pass
    #[error("IMAP error: {0}")]
    Imap(String),

    /// Unparsable header value
    #[error("Parse error: {0}")]
    Parse(String),

    /// Log or status file could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<async_imap::error::Error> for SweepError {
    fn from(e: async_imap::error::Error) -> Self {
        SweepError::Imap(e.to_string())
    }
}
