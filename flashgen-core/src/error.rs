//! Error types for the flashgen core library.

use thiserror::Error;

/// Top-level error type for core flashgen operations.
#[derive(Error, Debug)]
pub enum FlashgenError {
    /// A generation request failed input validation.
    #[error("Invalid request: {}", .0.join(", "))]
    InvalidRequest(Vec<String>),

    /// Configuration error (missing API key, unparsable TOML, bad override).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlashgenError {
    /// Validation messages, if this is an [`FlashgenError::InvalidRequest`].
    #[must_use]
    pub fn validation_messages(&self) -> &[String] {
        match self {
            Self::InvalidRequest(messages) => messages,
            _ => &[],
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, FlashgenError>;
