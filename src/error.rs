//! Error types for maildrop
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using MaildropError
pub type Result<T> = std::result::Result<T, MaildropError>;

/// Unified error type for maildrop operations
#[derive(Debug, Error)]
pub enum MaildropError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Frame Errors
    // -------------------------------------------------------------------------
    /// The frame itself could not be decoded: bad magic number, unknown
    /// message kind, short header, or a header value that does not fit
    /// its declared field. Always fatal to that frame.
    #[error("Frame error: {0}")]
    Frame(String),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    /// The frame decoded structurally but violates a domain rule,
    /// such as an empty user name. Fatal to that request only.
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    // -------------------------------------------------------------------------
    // Cryptography Errors
    // -------------------------------------------------------------------------
    #[error("Crypto error: {0}")]
    Crypto(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
