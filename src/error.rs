//! # Error Types
//!
//! This module defines error types used throughout the relay.
//!
//! Nothing here is fatal to the engine: every variant is handled locally by
//! the poll cycle, which logs it and moves on. [`RelayError::is_transport`]
//! picks out the errors that count toward the failure streak.

use thiserror::Error;

/// Main error type for relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network-level errors (connect, timeout, reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Response body did not match any known job shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Printer connection or write failure
    #[error("Device error: {0}")]
    Device(String),

    /// Vendor print integration refused the job
    #[error("Vendor integration error: {0}")]
    Vendor(String),

    /// Page rendering or spool submission failed
    #[error("Print surface error: {0}")]
    Surface(String),

    /// Invalid or missing configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Whether this error counts as a transport failure of a poll.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status(_))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(e.to_string()),
        }
    }
}
