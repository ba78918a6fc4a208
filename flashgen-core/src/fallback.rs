//! Template fallback — cards without an LLM.
//!
//! When the remote model cannot produce a deck within the retry policy, the
//! pipeline serves cards built from a fixed set of study prompts instead, so
//! a generation request never comes back empty. Output depends only on the
//! request: the same topic, count and difficulty always yield the same
//! questions, answers and tags (card IDs are still fresh).

use crate::types::{Difficulty, Flashcard, GenerationRequest, GenerationResult};

/// Model marker recorded in the metadata of fallback results.
pub const FALLBACK_MODEL: &str = "template-fallback";

/// A question/answer pair with `{topic}` placeholders.
struct CardTemplate {
    question: &'static str,
    answer: &'static str,
}

const TEMPLATES: &[CardTemplate] = &[
    CardTemplate {
        question: "Define the core concept of {topic} in one sentence.",
        answer: "The core concept of {topic} is ...",
    },
    CardTemplate {
        question: "Why is {topic} important? Give a concise reason.",
        answer: "{topic} matters because ...",
    },
    CardTemplate {
        question: "Name a common misconception about {topic}.",
        answer: "A common misconception is ...",
    },
    CardTemplate {
        question: "Provide a simple example illustrating {topic}.",
        answer: "Example: ...",
    },
    CardTemplate {
        question: "List two key terms related to {topic}.",
        answer: "Key terms include ...",
    },
    CardTemplate {
        question: "How does {topic} relate to everyday life?",
        answer: "It relates by ...",
    },
    CardTemplate {
        question: "Contrast {topic} with a closely related idea.",
        answer: "{topic} differs by ...",
    },
    CardTemplate {
        question: "What are the typical challenges when learning {topic}?",
        answer: "Challenges include ...",
    },
    CardTemplate {
        question: "Summarize a practical tip for mastering {topic}.",
        answer: "Tip: ...",
    },
    CardTemplate {
        question: "What would be a trick question about {topic}?",
        answer: "Trick: ...",
    },
];

/// Number of distinct templates before the cycle repeats.
#[must_use]
pub fn template_count() -> usize {
    TEMPLATES.len()
}

/// Produce exactly `count` template cards for `topic`.
///
/// Each card is tagged `[topic, difficulty]`.
#[must_use]
pub fn generate_cards(topic: &str, count: u32, difficulty: Difficulty) -> Vec<Flashcard> {
    let tags = vec![topic.to_string(), difficulty.to_string()];

    TEMPLATES
        .iter()
        .cycle()
        .take(count as usize)
        .map(|t| {
            Flashcard::new(
                t.question.replace("{topic}", topic),
                t.answer.replace("{topic}", topic),
                difficulty,
            )
            .with_tags(tags.clone())
        })
        .collect()
}

/// Cards for a validated request.
#[must_use]
pub fn generate(request: &GenerationRequest) -> Vec<Flashcard> {
    generate_cards(request.topic(), request.count(), request.difficulty())
}

/// A complete fallback result with [`FALLBACK_MODEL`] metadata.
#[must_use]
pub fn generate_result(request: &GenerationRequest) -> GenerationResult {
    GenerationResult::new(request, generate(request), FALLBACK_MODEL)
}
