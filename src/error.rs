//! Error types for i2c-bridge
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type for i2c-bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// Cannot connect, short read, zero-length read or timeout.
    /// Always invalidates the client's socket.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A response that cannot be decoded, or lacks the expected field
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Remote Errors
    // -------------------------------------------------------------------------
    /// The server answered with `status: error`
    #[error("Remote error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    /// Rejected on the client before anything is sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
