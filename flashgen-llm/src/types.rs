//! Core types for LLM requests and responses.

use std::time::Duration;

use flashgen_core::Difficulty;
use serde::{Deserialize, Serialize};

/// A single chat completion call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// System prompt (persona, rules).
    pub system: String,
    /// User prompt (topic, count, format instructions).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Ask the provider to constrain output to a JSON object.
    pub json_mode: bool,
    /// Request timeout.
    #[serde(skip)]
    pub timeout: Duration,
}

impl ChatRequest {
    /// Create a request with the deck-generation defaults.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 2048,
            temperature: 0.7,
            json_mode: true,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the sampling parameters.
    #[must_use]
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A response from the chat model.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model answered.
    pub model: String,
}

/// One card as the model is instructed to emit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCard {
    /// Question side.
    pub question: String,
    /// Answer side.
    pub answer: String,
    /// Optional explanation.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Categorization tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Difficulty of this card.
    pub difficulty: Difficulty,
}

/// The whole deck payload the model is instructed to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmDeck {
    /// Topic echoed back by the model.
    pub topic: String,
    /// Overall difficulty echoed back by the model.
    pub difficulty: Difficulty,
    /// Generated cards.
    pub cards: Vec<LlmCard>,
}
