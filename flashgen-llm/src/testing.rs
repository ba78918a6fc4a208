//! Scripted backend for tests: replays canned replies in order and records
//! every request it saw.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::backend::ChatBackend;
use crate::error::RawFailure;
use crate::types::{ChatRequest, ChatResponse};

/// A [`ChatBackend`] that answers from a script.
///
/// Once the script runs out every call fails with a transport error.
pub struct ScriptedBackend {
    model: String,
    script: Mutex<VecDeque<Result<String, RawFailure>>>,
    seen: Mutex<Vec<(Instant, ChatRequest)>>,
}

impl ScriptedBackend {
    /// Empty script for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue one reply: `Ok(text)` is returned as the completion text.
    #[must_use]
    pub fn respond(self, reply: Result<String, RawFailure>) -> Self {
        self.script.lock().push_back(reply);
        self
    }

    /// Queue the same reply `times` times.
    #[must_use]
    pub fn respond_n(self, reply: &Result<String, RawFailure>, times: usize) -> Self {
        {
            let mut script = self.script.lock();
            for _ in 0..times {
                script.push_back(reply.clone());
            }
        }
        self
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// When each call arrived, on the tokio clock.
    #[must_use]
    pub fn call_times(&self) -> Vec<Instant> {
        self.seen.lock().iter().map(|(at, _)| *at).collect()
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, RawFailure> {
        self.seen.lock().push((Instant::now(), request.clone()));
        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RawFailure::Transport("scripted backend exhausted".into())));
        next.map(|text| ChatResponse {
            text,
            tokens_generated: 0,
            latency_ms: 0,
            model: self.model.clone(),
        })
    }
}

/// A well-formed deck payload with `count` medium cards about `topic`.
#[must_use]
pub fn deck_json(topic: &str, count: usize) -> String {
    let cards: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "question": format!("{topic} question {i}?"),
                "answer": format!("{topic} answer {i}."),
                "explanation": format!("Why {i} matters."),
                "tags": [topic],
                "difficulty": "medium",
            })
        })
        .collect();
    serde_json::json!({
        "topic": topic,
        "difficulty": "medium",
        "cards": cards,
    })
    .to_string()
}

/// A provider status failure.
#[must_use]
pub fn status(code: u16) -> RawFailure {
    RawFailure::Status {
        status: code,
        message: format!("provider returned {code}"),
    }
}
