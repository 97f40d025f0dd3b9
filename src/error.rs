//! Error types for fileshare
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ShareError
pub type Result<T> = std::result::Result<T, ShareError>;

/// Unified error type for fileshare operations
#[derive(Debug, Error)]
pub enum ShareError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Path escapes shared directory: {0}")]
    PathEscape(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server failed: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShareError {
    /// Wrap a socket-level failure against `addr`
    pub fn connection(addr: &str, err: std::io::Error) -> Self {
        ShareError::Connection(format!("{}: {}", addr, err))
    }
}
