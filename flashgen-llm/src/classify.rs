//! Error Classifier — maps a [`RawFailure`] to a [`ClassifiedError`].
//!
//! First match wins:
//!
//! | Raw failure                                   | Kind            | Retryable |
//! |-----------------------------------------------|-----------------|-----------|
//! | `InvalidInput`, `Schema`                      | `validation`    | no        |
//! | `Status` 429                                  | `rate_limit`    | yes       |
//! | `Parse`, or a message mentioning parse/format | `parsing_error` | no        |
//! | `Status` 400–499                              | `api_error`     | no        |
//! | `Status` 500–599                              | `unknown`       | yes       |
//! | anything else                                 | `unknown`       | no        |
//!
//! Provider 5xx is checked after the 4xx bucket but the ranges are disjoint,
//! so server-side errors always come out retryable.

use crate::error::{ClassifiedError, ErrorKind, RawFailure};

/// Classify a raw failure. Pure: equal inputs give equal outputs.
#[must_use]
pub fn classify(raw: &RawFailure) -> ClassifiedError {
    let (kind, retryable) = match raw {
        RawFailure::InvalidInput(_) | RawFailure::Schema(_) => (ErrorKind::Validation, false),
        RawFailure::Status { status: 429, .. } => (ErrorKind::RateLimit, true),
        RawFailure::Parse(_) => (ErrorKind::ParsingError, false),
        RawFailure::Status { message, .. } | RawFailure::Transport(message)
            if mentions_parsing(message) =>
        {
            (ErrorKind::ParsingError, false)
        }
        RawFailure::Status { status: 400..=499, .. } => (ErrorKind::ApiError, false),
        RawFailure::Status { status: 500..=599, .. } => (ErrorKind::Unknown, true),
        RawFailure::Status { .. } | RawFailure::Transport(_) => (ErrorKind::Unknown, false),
    };

    ClassifiedError {
        kind,
        message: raw.to_string(),
        retryable,
        raw: raw.clone(),
    }
}

fn mentions_parsing(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("parse") || lower.contains("format")
}
