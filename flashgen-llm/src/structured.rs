//! Structured Generation Client.
//!
//! One call per invocation: render the prompt, ask the backend, parse the
//! reply into the deck shape, stamp metadata, then validate the complete
//! result a second time. Any problem is returned as a [`RawFailure`];
//! nothing here retries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use flashgen_core::config::LlmConfig;
use flashgen_core::{Difficulty, Flashcard, GenerationRequest, GenerationResult};
use tracing::debug;

use crate::backend::ChatBackend;
use crate::error::RawFailure;
use crate::prompt;
use crate::types::{ChatRequest, LlmDeck};

/// Sampling and timeout settings applied to every call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.request_timeout(),
        }
    }
}

/// Prompt → backend → parsed, validated [`GenerationResult`].
#[derive(Clone)]
pub struct StructuredGenerator {
    backend: Arc<dyn ChatBackend>,
    settings: GenerationSettings,
}

impl StructuredGenerator {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    /// Model identifier of the underlying backend.
    #[must_use]
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Make exactly one generation attempt.
    ///
    /// # Errors
    /// Returns the unclassified [`RawFailure`] of the first step that failed.
    pub async fn invoke(&self, request: &GenerationRequest) -> Result<GenerationResult, RawFailure> {
        let (system, user) = prompt::build_messages(request);
        let chat = ChatRequest::new(system, user)
            .with_sampling(self.settings.temperature, self.settings.max_tokens)
            .with_timeout(self.settings.timeout);

        let response = self.backend.complete(&chat).await?;
        let deck = parse_deck(&response.text)?;
        check_deck_shape(&deck, request)?;

        let result = assemble_result(deck, request, self.backend.model());
        validate_result(&result, request)?;

        debug!(
            topic = request.topic(),
            cards = result.cards.len(),
            latency_ms = response.latency_ms,
            "Structured generation succeeded"
        );
        Ok(result)
    }

    /// Trial call used by the health endpoint: one easy card about "test".
    ///
    /// # Errors
    /// Returns whatever the trial invocation failed with.
    pub async fn health_check(&self) -> Result<(), RawFailure> {
        let probe = GenerationRequest::new("test", 1, Difficulty::Easy)
            .map_err(|e| RawFailure::InvalidInput(e.to_string()))?;
        self.invoke(&probe).await.map(|_| ())
    }
}

/// Decode model output into an [`LlmDeck`], tolerating a markdown code fence.
///
/// # Errors
/// [`RawFailure::Parse`] if the text is not a JSON deck.
pub fn parse_deck(text: &str) -> Result<LlmDeck, RawFailure> {
    let payload = strip_code_fence(text);
    serde_json::from_str(payload).map_err(|e| {
        let preview: String = payload.chars().take(200).collect();
        RawFailure::Parse(format!("{e}; raw text: '{preview}'"))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First validation pass: the deck matches what was asked for.
///
/// # Errors
/// [`RawFailure::Parse`] describing the first mismatch.
pub fn check_deck_shape(deck: &LlmDeck, request: &GenerationRequest) -> Result<(), RawFailure> {
    let expected = request.count() as usize;
    if deck.cards.len() != expected {
        return Err(RawFailure::Parse(format!(
            "expected {expected} cards, model returned {}",
            deck.cards.len()
        )));
    }
    for (i, card) in deck.cards.iter().enumerate() {
        if card.question.trim().is_empty() {
            return Err(RawFailure::Parse(format!("card {i}: question cannot be empty")));
        }
        if card.answer.trim().is_empty() {
            return Err(RawFailure::Parse(format!("card {i}: answer cannot be empty")));
        }
    }
    Ok(())
}

fn assemble_result(deck: LlmDeck, request: &GenerationRequest, model: &str) -> GenerationResult {
    let cards = deck
        .cards
        .into_iter()
        .map(|c| {
            Flashcard::new(c.question, c.answer, c.difficulty)
                .with_explanation(c.explanation)
                .with_tags(c.tags)
        })
        .collect();
    GenerationResult::new(request, cards, model)
}

/// Second validation pass over the complete result, metadata included.
///
/// # Errors
/// [`RawFailure::Schema`] describing the first violation.
pub fn validate_result(result: &GenerationResult, request: &GenerationRequest) -> Result<(), RawFailure> {
    if result.topic.trim().is_empty() {
        return Err(RawFailure::Schema("topic is empty".into()));
    }
    if result.cards.len() != request.count() as usize {
        return Err(RawFailure::Schema(format!(
            "card count {} does not match requested {}",
            result.cards.len(),
            request.count()
        )));
    }
    if let Some(i) = result.cards.iter().position(|c| !c.is_well_formed()) {
        return Err(RawFailure::Schema(format!("card {i} has an empty side")));
    }
    let mut ids = HashSet::new();
    if let Some(card) = result.cards.iter().find(|c| !ids.insert(&c.id)) {
        return Err(RawFailure::Schema(format!("duplicate card id {}", card.id)));
    }
    if result.metadata.model.trim().is_empty() {
        return Err(RawFailure::Schema("metadata.model is empty".into()));
    }
    if result.metadata.prompt_version != prompt::version() {
        return Err(RawFailure::Schema(format!(
            "metadata.promptVersion is '{}', expected '{}'",
            result.metadata.prompt_version,
            prompt::version()
        )));
    }
    Ok(())
}
