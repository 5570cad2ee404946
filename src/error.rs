//! Error types for the turnstile crate.

use thiserror::Error;

/// Main error type for limiter operations.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid limit policy (non-positive limit or window)
    #[error("Invalid limit policy: {0}")]
    Policy(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
