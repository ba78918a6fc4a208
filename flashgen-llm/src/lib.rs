//! # flashgen-llm — LLM side of the generation pipeline
//!
//! Turns a validated [`GenerationRequest`](flashgen_core::GenerationRequest)
//! into a [`GenerationResult`](flashgen_core::GenerationResult) through a
//! remote chat model:
//!
//! ```text
//! RetryOrchestrator ──▶ StructuredGenerator ──▶ dyn ChatBackend ──▶ provider
//!        │                     │
//!        │ classify()          └─ prompt, parse, shape check, metadata, re-validate
//!        ▼
//!  ClassifiedError (retryable?) ──▶ wait (backoff) ──▶ next attempt
//! ```
//!
//! - [`StructuredGenerator`] never retries; it reports a [`RawFailure`].
//! - [`classify`] maps every `RawFailure` to a [`ClassifiedError`].
//! - [`RetryOrchestrator`] owns the retry budget and backoff waits.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod classify;
pub mod client;
pub mod error;
pub mod prompt;
pub mod retry;
pub mod structured;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use backend::ChatBackend;
pub use classify::classify;
pub use client::OpenAiCompatibleBackend;
pub use error::{ClassifiedError, ErrorKind, RawFailure};
pub use retry::RetryOrchestrator;
pub use structured::{GenerationSettings, StructuredGenerator};
pub use types::{ChatRequest, ChatResponse};
