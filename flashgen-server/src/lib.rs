//! # flashgen-server — pipeline facade and HTTP surface
//!
//! [`Pipeline`] composes the Quota Gate, the Retry Orchestrator and the
//! template fallback into one `generate` call. [`routes::router`] exposes it
//! over HTTP; `main.rs` wires configuration, logging and shutdown.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod pipeline;
pub mod routes;

pub use pipeline::{GenerationOutcome, Pipeline, PipelineError};
pub use routes::{router, AppState};
