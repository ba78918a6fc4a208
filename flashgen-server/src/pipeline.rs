//! Pipeline Facade — the one operation the HTTP layer calls.
//!
//! ```text
//! validate ──▶ QuotaGate ──▶ RetryOrchestrator ──ok──▶ cards (source = llm)
//!    │            │                 │
//!  Invalid    RateLimited         error ──▶ fallback (source = fallback)
//!                                       └─▶ Generation(err) if fallback is off
//! ```
//!
//! Validation runs first so malformed requests never spend quota. Quota
//! rejections are a hard stop; the orchestrator is not called.

use std::sync::Arc;
use std::time::Duration;

use flashgen_core::metrics::PipelineCounters;
use flashgen_core::{
    fallback, CardSource, FlashgenConfig, FlashgenError, GenerationRequest, GenerationResult,
    QuotaDecision, QuotaGate,
};
use flashgen_llm::{
    ChatBackend, ClassifiedError, GenerationSettings, RawFailure, RetryOrchestrator,
    StructuredGenerator,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A successful facade call.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The cards and their provenance metadata.
    pub result: GenerationResult,
    /// Whether the LLM or the template generator produced them.
    pub source: CardSource,
    /// The admission decision for this request.
    pub rate_limit: QuotaDecision,
}

/// Why the facade did not return cards.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// The request failed input validation. Quota was not consumed.
    #[error("Invalid input: {}", .0.join(", "))]
    Invalid(Vec<String>),

    /// The client is over quota.
    #[error("Rate limit exceeded; retry in {}s", .0.retry_after_secs.unwrap_or(0))]
    RateLimited(QuotaDecision),

    /// Generation failed and the template fallback is disabled.
    #[error("Generation failed: {0}")]
    Generation(ClassifiedError),
}

impl From<FlashgenError> for PipelineError {
    fn from(err: FlashgenError) -> Self {
        match err {
            FlashgenError::InvalidRequest(messages) => Self::Invalid(messages),
            other => Self::Invalid(vec![other.to_string()]),
        }
    }
}

/// Owned pipeline state: constructed once at startup, shared by handlers.
#[derive(Clone)]
pub struct Pipeline {
    quota: QuotaGate,
    orchestrator: RetryOrchestrator,
    counters: Arc<PipelineCounters>,
    fallback_enabled: bool,
}

impl Pipeline {
    /// Assemble a pipeline around an existing backend.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        config: &FlashgenConfig,
    ) -> Self {
        let counters = Arc::new(PipelineCounters::new());
        let generator = StructuredGenerator::new(backend, GenerationSettings::from(&config.llm));
        let orchestrator =
            RetryOrchestrator::new(generator, config.retry.policy()).with_counters(counters.clone());
        Self {
            quota: QuotaGate::from_config(&config.quota),
            orchestrator,
            counters,
            fallback_enabled: config.fallback.enabled,
        }
    }

    /// Run one request for `client_id`.
    ///
    /// `request` is the outcome of upstream shape validation (deserialization
    /// into [`GenerationRequest`]), so invalid input is still counted and
    /// reported here.
    ///
    /// # Errors
    /// See [`PipelineError`].
    pub async fn generate(
        &self,
        client_id: &str,
        request: Result<GenerationRequest, FlashgenError>,
    ) -> Result<GenerationOutcome, PipelineError> {
        PipelineCounters::bump(&self.counters.requests);

        let request = request.map_err(|e| {
            PipelineCounters::bump(&self.counters.invalid_requests);
            debug!(client = client_id, error = %e, "Rejected invalid generation request");
            PipelineError::from(e)
        })?;

        let decision = self.quota.check(client_id);
        if !decision.allowed {
            PipelineCounters::bump(&self.counters.rate_limited);
            info!(
                client = client_id,
                retry_after = decision.retry_after_secs,
                "Client over quota"
            );
            return Err(PipelineError::RateLimited(decision));
        }

        match self.orchestrator.run(&request).await {
            Ok(result) => {
                PipelineCounters::bump(&self.counters.llm_successes);
                info!(
                    client = client_id,
                    topic = request.topic(),
                    cards = result.cards.len(),
                    "Generated flashcards"
                );
                Ok(GenerationOutcome {
                    result,
                    source: CardSource::Llm,
                    rate_limit: decision,
                })
            }
            Err(err) if self.fallback_enabled => {
                PipelineCounters::bump(&self.counters.fallbacks_served);
                warn!(
                    client = client_id,
                    topic = request.topic(),
                    kind = %err.kind(),
                    error = %err,
                    "LLM generation failed, serving template cards"
                );
                Ok(GenerationOutcome {
                    result: fallback::generate_result(&request),
                    source: CardSource::Fallback,
                    rate_limit: decision,
                })
            }
            Err(err) => {
                PipelineCounters::bump(&self.counters.generation_errors);
                warn!(client = client_id, kind = %err.kind(), error = %err, "LLM generation failed");
                Err(PipelineError::Generation(err))
            }
        }
    }

    /// Trial generation of one easy card. No quota, no retries, no fallback.
    ///
    /// # Errors
    /// The raw failure of the trial call.
    pub async fn health(&self) -> Result<(), RawFailure> {
        self.orchestrator.generator().health_check().await
    }

    /// The quota gate (shared state).
    #[must_use]
    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Pipeline counters.
    #[must_use]
    pub fn counters(&self) -> &PipelineCounters {
        &self.counters
    }

    /// Model used for LLM generation.
    #[must_use]
    pub fn model(&self) -> &str {
        self.orchestrator.generator().model()
    }

    /// Spawn the background sweep of expired quota windows.
    ///
    /// The caller owns the handle and aborts it at shutdown.
    #[must_use]
    pub fn spawn_quota_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let quota = self.quota.clone();
        // `interval` panics on a zero period.
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = quota.purge_expired();
                if purged > 0 {
                    debug!(purged, "Swept expired quota windows");
                }
            }
        })
    }
}
