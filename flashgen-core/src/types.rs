//! Core type definitions for flashcard generation.
//!
//! All wire-facing types serialize with camelCase keys so the JSON matches
//! what the browser front-end stores and renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::FlashgenError;

/// Version marker stamped into every [`GenerationMetadata`].
pub const PROMPT_VERSION: &str = "1.0";

/// Largest card count the server accepts in a single request.
pub const MAX_CARDS_PER_REQUEST: u32 = 50;

/// Default ease factor for a freshly generated card.
pub const DEFAULT_EASE: f32 = 2.5;

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// How hard the generated questions should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Basic recall, definitions, simple facts.
    Easy,
    /// Understanding, application, simple analysis.
    Medium,
    /// Synthesis, evaluation, complex analysis.
    Hard,
}

impl Difficulty {
    /// All difficulty levels, easiest first.
    #[must_use]
    pub fn all() -> &'static [Difficulty] {
        &[Self::Easy, Self::Medium, Self::Hard]
    }

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("unknown difficulty: '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation Request
// ---------------------------------------------------------------------------

/// A validated request for a deck of generated cards.
///
/// Fields are private: the only ways in are [`GenerationRequest::new`] and
/// deserialization, and both run the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRequest")]
pub struct GenerationRequest {
    topic: String,
    count: u32,
    difficulty: Difficulty,
}

/// Wire shape before validation.
#[derive(Debug, Deserialize)]
struct UncheckedRequest {
    topic: String,
    count: u32,
    difficulty: Difficulty,
}

impl TryFrom<UncheckedRequest> for GenerationRequest {
    type Error = FlashgenError;

    fn try_from(raw: UncheckedRequest) -> Result<Self, Self::Error> {
        Self::new(raw.topic, raw.count, raw.difficulty)
    }
}

impl GenerationRequest {
    /// Build a request, rejecting an empty topic or a count outside `1..=50`.
    ///
    /// # Errors
    /// Returns [`FlashgenError::InvalidRequest`] listing every violated rule.
    pub fn new(
        topic: impl Into<String>,
        count: u32,
        difficulty: Difficulty,
    ) -> crate::error::Result<Self> {
        let topic = topic.into();
        let mut problems = Vec::new();

        if topic.trim().is_empty() {
            problems.push("Topic is required".to_string());
        }
        if count == 0 || count > MAX_CARDS_PER_REQUEST {
            problems.push(format!(
                "Count must be between 1 and {MAX_CARDS_PER_REQUEST} (got {count})"
            ));
        }

        if problems.is_empty() {
            Ok(Self {
                topic,
                count,
                difficulty,
            })
        } else {
            Err(FlashgenError::InvalidRequest(problems))
        }
    }

    /// The subject the cards should cover.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// How many cards to produce.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Requested difficulty.
    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

/// Deck sizes offered by the browser UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DeckSize {
    /// Five cards.
    Five,
    /// Ten cards.
    Ten,
    /// Twenty cards.
    Twenty,
}

impl DeckSize {
    /// Number of cards.
    #[must_use]
    pub fn count(self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Twenty => 20,
        }
    }
}

impl TryFrom<u32> for DeckSize {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            5 => Ok(Self::Five),
            10 => Ok(Self::Ten),
            20 => Ok(Self::Twenty),
            _ => Err(format!("deck size must be 5, 10 or 20 (got {n})")),
        }
    }
}

impl From<DeckSize> for u32 {
    fn from(size: DeckSize) -> Self {
        size.count()
    }
}

// ---------------------------------------------------------------------------
// Flashcards
// ---------------------------------------------------------------------------

/// Opaque, unique card identifier (`card_<hex>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    /// Create a new random card ID.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("card_{}", Uuid::new_v4().simple()))
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single study card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    /// Unique ID.
    pub id: CardId,
    /// Prompt side.
    pub question: String,
    /// Answer side.
    pub answer: String,
    /// Optional longer explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Ordered tags used for filtering decks.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Difficulty of this specific card.
    pub difficulty: Difficulty,
    /// Study-progress flag owned by the UI.
    #[serde(default)]
    pub known: bool,
    /// Next review time (spaced repetition).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    /// Spaced-repetition ease factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<f32>,
    /// Spaced-repetition interval in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

impl Flashcard {
    /// Create a fresh, unreviewed card due now.
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: CardId::new(),
            question: question.into(),
            answer: answer.into(),
            explanation: None,
            tags: Vec::new(),
            difficulty,
            known: false,
            due_at: Some(Utc::now()),
            ease: Some(DEFAULT_EASE),
            interval: Some(0),
        }
    }

    /// Attach an explanation. Blank explanations are dropped.
    #[must_use]
    pub fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation.filter(|e| !e.trim().is_empty());
        self
    }

    /// Replace the tag list.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Both sides carry text.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Generation Result
// ---------------------------------------------------------------------------

/// Where a set of cards came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    /// Produced by the remote language model.
    Llm,
    /// Produced by the local template generator.
    Fallback,
}

/// Provenance stamped onto every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// When the cards were produced.
    pub generated_at: DateTime<Utc>,
    /// Model identifier (or the fallback marker).
    pub model: String,
    /// Prompt template version.
    pub prompt_version: String,
}

impl GenerationMetadata {
    /// Metadata for a result produced now by `model`.
    #[must_use]
    pub fn now(model: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            model: model.into(),
            prompt_version: PROMPT_VERSION.to_string(),
        }
    }
}

/// A complete, immutable set of generated cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Topic the cards cover.
    pub topic: String,
    /// Overall requested difficulty.
    pub difficulty: Difficulty,
    /// Cards in presentation order.
    pub cards: Vec<Flashcard>,
    /// Provenance.
    pub metadata: GenerationMetadata,
}

impl GenerationResult {
    /// Assemble a result for `request`, stamping metadata for `model`.
    #[must_use]
    pub fn new(request: &GenerationRequest, cards: Vec<Flashcard>, model: impl Into<String>) -> Self {
        Self {
            topic: request.topic().to_string(),
            difficulty: request.difficulty(),
            cards,
            metadata: GenerationMetadata::now(model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_blank_topic() {
        let err = GenerationRequest::new("   ", 5, Difficulty::Easy).expect_err("blank topic");
        assert_eq!(err.validation_messages(), ["Topic is required"]);
    }

    #[test]
    fn request_rejects_out_of_range_counts() {
        assert!(GenerationRequest::new("Rust", 0, Difficulty::Easy).is_err());
        assert!(GenerationRequest::new("Rust", 51, Difficulty::Easy).is_err());
        assert!(GenerationRequest::new("Rust", 1, Difficulty::Easy).is_ok());
        assert!(GenerationRequest::new("Rust", 50, Difficulty::Easy).is_ok());
    }

    #[test]
    fn request_collects_every_problem() {
        let err = GenerationRequest::new("", 99, Difficulty::Hard).expect_err("invalid");
        assert_eq!(err.validation_messages().len(), 2);
    }

    #[test]
    fn request_deserialization_runs_validation() {
        let ok: GenerationRequest =
            serde_json::from_str(r#"{"topic":"Photosynthesis","count":3,"difficulty":"medium"}"#)
                .expect("valid request");
        assert_eq!(ok.topic(), "Photosynthesis");
        assert_eq!(ok.count(), 3);
        assert_eq!(ok.difficulty(), Difficulty::Medium);

        let bad = serde_json::from_str::<GenerationRequest>(
            r#"{"topic":"","count":3,"difficulty":"medium"}"#,
        );
        assert!(bad.is_err());

        let bad_difficulty = serde_json::from_str::<GenerationRequest>(
            r#"{"topic":"x","count":3,"difficulty":"extreme"}"#,
        );
        assert!(bad_difficulty.is_err());
    }

    #[test]
    fn deck_size_only_accepts_ui_sizes() {
        assert_eq!(DeckSize::try_from(10), Ok(DeckSize::Ten));
        assert!(DeckSize::try_from(7).is_err());
        assert_eq!(u32::from(DeckSize::Twenty), 20);
    }

    #[test]
    fn new_card_has_spaced_repetition_defaults() {
        let card = Flashcard::new("Q?", "A.", Difficulty::Easy);
        assert!(card.id.0.starts_with("card_"));
        assert!(!card.known);
        assert!(card.due_at.is_some());
        assert_eq!(card.ease, Some(DEFAULT_EASE));
        assert_eq!(card.interval, Some(0));
        assert!(card.is_well_formed());
    }

    #[test]
    fn blank_explanation_is_dropped() {
        let card = Flashcard::new("Q?", "A.", Difficulty::Easy).with_explanation(Some("  ".into()));
        assert!(card.explanation.is_none());
    }

    #[test]
    fn card_serializes_camel_case() {
        let card = Flashcard::new("Q?", "A.", Difficulty::Hard);
        let json = serde_json::to_value(&card).expect("serialize");
        assert!(json.get("dueAt").is_some());
        assert_eq!(json["difficulty"], "hard");
        assert!(json.get("explanation").is_none());
    }

    #[test]
    fn difficulty_round_trips_through_str() {
        for d in Difficulty::all() {
            let parsed: Difficulty = d.to_string().parse().expect("should parse");
            assert_eq!(*d, parsed);
        }
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn result_metadata_carries_prompt_version() {
        let request = GenerationRequest::new("Rust", 1, Difficulty::Easy).expect("valid");
        let result = GenerationResult::new(&request, vec![], "test-model");
        assert_eq!(result.metadata.prompt_version, PROMPT_VERSION);
        assert_eq!(result.metadata.model, "test-model");
        assert_eq!(result.topic, "Rust");
    }
}
