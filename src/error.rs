//! Error types for memcluster
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using MemclusterError
pub type Result<T> = std::result::Result<T, MemclusterError>;

/// Unified error type for memcluster operations
#[derive(Debug, Error)]
pub enum MemclusterError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The response stream no longer matches the pending command's grammar.
    /// Fatal for the connection: the request/response queues cannot be
    /// realigned, so the socket is torn down and reconnected.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
