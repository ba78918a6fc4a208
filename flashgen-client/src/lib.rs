//! # flashgen-client — the UI-facing generation call
//!
//! [`FlashcardClient::generate_flashcards`] asks a flashgen server for a deck,
//! retrying transient failures with the same backoff policy the server uses
//! against its LLM provider. If every attempt fails it builds the deck from
//! the local templates, so callers get cards for valid input unless the
//! server's own quota turns them away.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::time::Duration;

use flashgen_core::{fallback, DeckSize, Difficulty, Flashcard, GenerationRequest, GenerationResult, RetryPolicy};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced to the UI. Generation problems never are.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The request was rejected locally before any network call.
    #[error("Invalid input: {}", .0.join(", "))]
    InvalidInput(Vec<String>),

    /// The server's per-client quota is spent. Not retried, no templates.
    #[error("Rate limit exceeded, try again in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the quota window resets.
        retry_after_secs: u64,
    },
}

/// One failed attempt against the server.
#[derive(Debug)]
struct AttemptFailure {
    retryable: bool,
    message: String,
    /// Set when the server's quota gate rejected the request.
    quota_retry_after: Option<u64>,
}

impl AttemptFailure {
    fn retryable(message: impl Into<String>) -> Self {
        Self {
            retryable: true,
            message: message.into(),
            quota_retry_after: None,
        }
    }

    fn terminal(message: impl Into<String>) -> Self {
        Self {
            retryable: false,
            message: message.into(),
            quota_retry_after: None,
        }
    }
}

#[derive(Deserialize)]
struct SuccessBody {
    data: GenerationResult,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    retryable: Option<bool>,
    /// Only present on quota rejections.
    #[serde(default, rename = "retryAfter")]
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// HTTP client for a flashgen server.
#[derive(Clone)]
pub struct FlashcardClient {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl FlashcardClient {
    /// Client for the server at `base_url` with the default retry policy.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Per-attempt request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate a deck of `size` cards about `topic`.
    ///
    /// # Errors
    /// [`ClientError::InvalidInput`] for bad input and
    /// [`ClientError::RateLimited`] when the server's quota is spent. Other
    /// server and network failures end in template cards instead.
    pub async fn generate_flashcards(
        &self,
        topic: &str,
        size: DeckSize,
        difficulty: Difficulty,
    ) -> Result<Vec<Flashcard>, ClientError> {
        let request = GenerationRequest::new(topic.trim(), size.count(), difficulty)
            .map_err(|e| ClientError::InvalidInput(e.validation_messages().to_vec()))?;

        let mut attempt: u32 = 0;
        loop {
            match self.attempt(&request).await {
                Ok(result) => return Ok(prepare_cards(result.cards, request.topic())),
                Err(AttemptFailure {
                    quota_retry_after: Some(retry_after_secs),
                    ..
                }) => {
                    warn!(retry_after_secs, "Flashcard quota exhausted");
                    return Err(ClientError::RateLimited { retry_after_secs });
                }
                Err(failure) if failure.retryable && self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %failure.message,
                        "Flashcard request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    warn!(
                        attempts = attempt + 1,
                        error = %failure.message,
                        "Flashcard generation unavailable, using local templates"
                    );
                    return Ok(fallback::generate(&request));
                }
            }
        }
    }

    /// Whether the server answers 2xx with `"status": "healthy"`.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/api/flashcards/health", self.base_url);
        let resp = match self.http.get(url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "Server reports unhealthy");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                return false;
            }
        };
        match resp.json::<HealthBody>().await {
            Ok(body) => body.status == "healthy",
            Err(e) => {
                debug!(error = %e, "Unreadable health response");
                false
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<GenerationResult, AttemptFailure> {
        let url = format!("{}/api/flashcards/generate", self.base_url);
        let body = json!({
            "topic": request.topic(),
            "count": request.count(),
            "difficulty": request.difficulty(),
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AttemptFailure::retryable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let parsed: SuccessBody = resp
                .json()
                .await
                .map_err(|e| AttemptFailure::terminal(format!("unexpected response body: {e}")))?;
            return Ok(parsed.data);
        }

        let error: ErrorBody = resp.json().await.unwrap_or_default();
        let message = format!(
            "HTTP {}: {}",
            status.as_u16(),
            error.error.as_deref().unwrap_or("no details")
        );
        // Quota rejections carry `retryAfter`; provider throttling does not.
        let quota_retry_after = error.retry_after.filter(|_| status.as_u16() == 429);
        let retryable = quota_retry_after.is_none()
            && (status.as_u16() == 429 || status.is_server_error() || error.retryable == Some(true));
        Err(AttemptFailure {
            retryable,
            message,
            quota_retry_after,
        })
    }
}

/// Fresh ids, the topic tag, and spaced-repetition defaults for server cards.
fn prepare_cards(cards: Vec<Flashcard>, topic: &str) -> Vec<Flashcard> {
    cards
        .into_iter()
        .map(|card| {
            let mut tags = card.tags;
            if !tags.iter().any(|t| t == topic) {
                tags.push(topic.to_string());
            }
            Flashcard::new(card.question, card.answer, card.difficulty)
                .with_explanation(card.explanation)
                .with_tags(tags)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepared_cards_get_topic_tag_once() {
        let tagged = Flashcard::new("Q", "A", Difficulty::Easy).with_tags(vec!["Rust".into()]);
        let untagged = Flashcard::new("Q2", "A2", Difficulty::Easy).with_tags(vec!["memory".into()]);
        let old_id = untagged.id.clone();

        let cards = prepare_cards(vec![tagged, untagged], "Rust");
        assert_eq!(cards[0].tags, ["Rust"]);
        assert_eq!(cards[1].tags, ["memory", "Rust"]);
        assert_ne!(cards[1].id, old_id);
        assert!(cards.iter().all(|c| !c.known && c.interval == Some(0)));
    }

    #[tokio::test]
    async fn blank_topic_is_rejected_locally() {
        let client = FlashcardClient::new("http://127.0.0.1:1");
        let err = client
            .generate_flashcards("   ", DeckSize::Five, Difficulty::Easy)
            .await
            .expect_err("blank topic");
        assert_eq!(err, ClientError::InvalidInput(vec!["Topic is required".into()]));
    }
}
