//! Retry Orchestrator — bounded retries with exponential backoff around the
//! [`StructuredGenerator`].
//!
//! ```text
//! ATTEMPT ─ok─▶ DONE
//!    │
//!  fail ─▶ classify ─ retryable & budget left ─▶ WAIT ─▶ ATTEMPT
//!                  └─ otherwise ──────────────▶ FAILED(last ClassifiedError)
//! ```
//!
//! Waits are `tokio::time::sleep`, so they suspend only the calling task and
//! follow the paused test clock. Dropping the returned future cancels any
//! pending wait or in-flight attempt.

use std::sync::Arc;

use flashgen_core::metrics::PipelineCounters;
use flashgen_core::{GenerationRequest, GenerationResult, RetryPolicy};
use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::ClassifiedError;
use crate::structured::StructuredGenerator;

/// Drives a [`StructuredGenerator`] under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryOrchestrator {
    generator: StructuredGenerator,
    policy: RetryPolicy,
    counters: Option<Arc<PipelineCounters>>,
}

impl RetryOrchestrator {
    /// Orchestrate `generator` with `policy`.
    #[must_use]
    pub fn new(generator: StructuredGenerator, policy: RetryPolicy) -> Self {
        Self {
            generator,
            policy,
            counters: None,
        }
    }

    /// Record attempts and retries into shared counters.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<PipelineCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// The wrapped generator (the health check calls it directly).
    #[must_use]
    pub fn generator(&self) -> &StructuredGenerator {
        &self.generator
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run until success, a non-retryable failure, or an exhausted budget.
    ///
    /// # Errors
    /// The [`ClassifiedError`] of the last attempt.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult, ClassifiedError> {
        let mut attempt: u32 = 0;
        loop {
            if let Some(c) = &self.counters {
                PipelineCounters::bump(&c.llm_attempts);
            }

            let raw = match self.generator.invoke(request).await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(topic = request.topic(), attempts = attempt + 1, "Generation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(raw) => raw,
            };

            let error = classify(&raw);
            if !error.retryable() {
                warn!(kind = %error.kind(), attempt = attempt + 1, error = %error, "Non-retryable generation failure");
                return Err(error);
            }
            if !self.policy.should_retry(attempt) {
                warn!(
                    kind = %error.kind(),
                    attempts = attempt + 1,
                    error = %error,
                    "Generation retries exhausted"
                );
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                kind = %error.kind(),
                attempt = attempt + 1,
                max_attempts = self.policy.max_attempts(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Retrying generation"
            );
            if let Some(c) = &self.counters {
                PipelineCounters::bump(&c.llm_retries);
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::structured::GenerationSettings;
    use crate::testing::{deck_json, status, ScriptedBackend};
    use flashgen_core::Difficulty;

    fn request() -> GenerationRequest {
        GenerationRequest::new("Photosynthesis", 2, Difficulty::Medium).expect("valid")
    }

    fn orchestrator(backend: Arc<ScriptedBackend>, policy: RetryPolicy) -> RetryOrchestrator {
        RetryOrchestrator::new(
            StructuredGenerator::new(backend, GenerationSettings::default()),
            policy,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn counters_track_attempts_and_retries() {
        let backend = Arc::new(
            ScriptedBackend::new("m")
                .respond(Err(status(503)))
                .respond(Ok(deck_json("Photosynthesis", 2))),
        );
        let counters = Arc::new(PipelineCounters::new());
        let orch = orchestrator(backend, RetryPolicy::default()).with_counters(counters.clone());

        orch.run(&request()).await.expect("second attempt succeeds");
        assert_eq!(counters.llm_attempts.load(Ordering::Relaxed), 2);
        assert_eq!(counters.llm_retries.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_means_single_attempt() {
        let backend = Arc::new(ScriptedBackend::new("m").respond_n(&Err(status(429)), 5));
        let orch = orchestrator(backend.clone(), RetryPolicy::no_retries());

        let err = orch.run(&request()).await.expect_err("no retries allowed");
        assert!(err.retryable());
        assert_eq!(backend.call_count(), 1);
    }
}
