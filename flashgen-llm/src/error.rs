//! LLM failure types.
//!
//! [`RawFailure`] is what the generation client reports. [`ClassifiedError`]
//! is what the rest of the pipeline reasons about; it is only built by
//! [`crate::classify`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Unclassified failure from a single generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "failure", content = "detail", rename_all = "snake_case")]
pub enum RawFailure {
    /// The request handed to the client was malformed.
    #[error("Invalid generation input: {0}")]
    InvalidInput(String),

    /// The assembled result (with metadata) failed the full output schema.
    #[error("Generated result failed schema validation: {0}")]
    Schema(String),

    /// Provider output could not be parsed into the expected deck shape.
    #[error("Failed to parse LLM output: {0}")]
    Parse(String),

    /// Provider answered with a non-success HTTP status.
    #[error("LLM provider returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The call failed before a status was received (connect, timeout, TLS).
    #[error("LLM request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            RawFailure::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_timeout() {
            RawFailure::Transport(format!("timed out: {err}"))
        } else {
            RawFailure::Transport(err.to_string())
        }
    }
}

/// Failure taxonomy used for retry and status-code decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed request or malformed assembled result.
    Validation,
    /// Provider-side throttling.
    RateLimit,
    /// Provider rejected the call (4xx other than 429).
    ApiError,
    /// Provider output failed structural parsing.
    ParsingError,
    /// Anything else, including provider 5xx.
    Unknown,
}

impl ErrorKind {
    /// Snake-case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::RateLimit => "rate_limit",
            Self::ApiError => "api_error",
            Self::ParsingError => "parsing_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure after classification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
    pub(crate) retryable: bool,
    pub(crate) raw: RawFailure,
}

impl ClassifiedError {
    /// Failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable description copied from the raw failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether another attempt may succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// The raw failure this was classified from.
    #[must_use]
    pub fn raw(&self) -> &RawFailure {
        &self.raw
    }

    /// The raw failure as structured JSON, for diagnostics.
    #[must_use]
    pub fn details(&self) -> serde_json::Value {
        serde_json::to_value(&self.raw).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for ClassifiedError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ClassifiedError", 4)?;
        s.serialize_field("type", &self.kind)?;
        s.serialize_field("message", &self.message)?;
        s.serialize_field("retryable", &self.retryable)?;
        s.serialize_field("details", &self.raw)?;
        s.end()
    }
}
