//! Prompt templates for flashcard generation.
//!
//! Every prompt is a versioned, testable artifact: the version string here is
//! stamped into each result's metadata. Rendering is deterministic, so the
//! same request always produces byte-identical messages.

use flashgen_core::{Difficulty, GenerationRequest, PROMPT_VERSION};

/// System prompt: who the model is and how it must answer.
pub const FLASHCARDS_SYSTEM: &str = r"You are an expert educator creating flashcards for students.
Your task is to generate high-quality, educational flashcards on the given topic.
Your response must be a single valid JSON object and nothing else.";

/// User prompt: the concrete request plus output format.
pub const FLASHCARDS_USER: &str = r"TOPIC: {topic}
DIFFICULTY: {difficulty}
NUMBER OF CARDS: {count}

REQUIREMENTS:
1. Create exactly {count} flashcards
2. Questions should be clear, specific, and at {difficulty} difficulty level
3. Answers should be concise but complete
4. For easy level: focus on basic definitions and fundamental concepts
5. For medium level: include application and understanding questions
6. For hard level: include analysis, synthesis, and complex problem-solving
7. Include diverse question types: definitions, examples, comparisons, applications
8. Ensure questions are pedagogically sound and promote learning

DIFFICULTY GUIDELINES:
{difficulty_guidance}

OUTPUT FORMAT:
{format_instructions}

Generate flashcards that are educationally valuable and appropriate for the specified difficulty level.";

/// Machine-readable description of the exact output shape.
pub const FORMAT_INSTRUCTIONS: &str = r#"Return a JSON object with exactly these keys:
{"topic": string, "difficulty": "easy" | "medium" | "hard", "cards": [{"question": string, "answer": string, "explanation": string (optional), "tags": [string], "difficulty": "easy" | "medium" | "hard"}]}
- "cards" must contain exactly the requested number of items.
- "question" and "answer" must be non-empty.
- Do not wrap the JSON in markdown and do not add commentary."#;

/// One-line guidance for each difficulty level.
#[must_use]
pub fn difficulty_guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "- Easy: Basic recall, definitions, simple facts",
        Difficulty::Medium => "- Medium: Understanding, application, simple analysis",
        Difficulty::Hard => "- Hard: Synthesis, evaluation, complex analysis, critical thinking",
    }
}

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value in a single scan of the
/// template. Inserted values are copied verbatim and never re-expanded;
/// unknown placeholders are left as written.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let key = &tail[1..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close + 1))
        });
        match value {
            Some((value, consumed)) => {
                result.push_str(value);
                rest = &tail[consumed..];
            }
            None => {
                result.push('{');
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Render `(system, user)` messages for a request.
#[must_use]
pub fn build_messages(request: &GenerationRequest) -> (String, String) {
    let count = request.count().to_string();
    let user = render_template(
        FLASHCARDS_USER,
        &[
            ("topic", request.topic()),
            ("difficulty", request.difficulty().as_str()),
            ("count", &count),
            ("difficulty_guidance", difficulty_guidance(request.difficulty())),
            ("format_instructions", FORMAT_INSTRUCTIONS),
        ],
    );
    (FLASHCARDS_SYSTEM.to_string(), user)
}

/// Version of the templates above.
#[must_use]
pub fn version() -> &'static str {
    PROMPT_VERSION
}
