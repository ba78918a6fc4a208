//! # flashgen core library
//!
//! Network-free building blocks of the flashcard generation pipeline:
//!
//! - **Data model** — [`GenerationRequest`], [`Flashcard`], [`GenerationResult`]
//! - **Quota Gate** — per-client sliding-window admission ([`QuotaGate`])
//! - **Retry policy** — attempt budget and exponential backoff schedule ([`RetryPolicy`])
//! - **Fallback** — deterministic template cards used when the LLM path fails
//! - **Configuration** — `flashgen.toml` plus environment overrides
//!
//! The LLM-facing half of the pipeline lives in `flashgen-llm`; the facade
//! that composes both lives in `flashgen-server`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod quota;
pub mod retry;
pub mod types;

pub use config::FlashgenConfig;
pub use error::FlashgenError;
pub use quota::{QuotaDecision, QuotaGate};
pub use retry::RetryPolicy;
pub use types::*;
