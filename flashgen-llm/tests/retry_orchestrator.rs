//! Retry Orchestrator behavior on the paused tokio clock.
//!
//! Time only advances when every task is idle, so the gaps between recorded
//! backend calls are the backoff delays (to timer-wheel resolution).

use std::sync::Arc;
use std::time::Duration;

use flashgen_core::{Difficulty, GenerationRequest, RetryPolicy};
use flashgen_llm::testing::{deck_json, status, ScriptedBackend};
use flashgen_llm::{ErrorKind, GenerationSettings, RawFailure, RetryOrchestrator, StructuredGenerator};

fn orchestrator(backend: &Arc<ScriptedBackend>) -> RetryOrchestrator {
    let generator = StructuredGenerator::new(backend.clone(), GenerationSettings::default());
    RetryOrchestrator::new(generator, RetryPolicy::default())
}

fn photosynthesis() -> GenerationRequest {
    GenerationRequest::new("Photosynthesis", 3, Difficulty::Medium).expect("valid")
}

fn gaps(backend: &ScriptedBackend) -> Vec<Duration> {
    backend
        .call_times()
        .windows(2)
        .map(|w| w[1].duration_since(w[0]))
        .collect()
}

/// The timer wheel has millisecond resolution; allow for rounding up.
fn assert_gaps(backend: &ScriptedBackend, expected_secs: &[u64]) {
    let observed = gaps(backend);
    assert_eq!(observed.len(), expected_secs.len(), "gaps: {observed:?}");
    for (gap, secs) in observed.iter().zip(expected_secs) {
        let expected = Duration::from_secs(*secs);
        assert!(
            *gap >= expected && *gap < expected + Duration::from_millis(5),
            "expected ~{expected:?}, observed {gap:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn first_call_success_returns_full_deck() {
    let backend = Arc::new(ScriptedBackend::new("llama-3.1-70b-versatile").respond(Ok(deck_json("Photosynthesis", 3))));
    let result = orchestrator(&backend).run(&photosynthesis()).await.expect("success");

    assert_eq!(result.cards.len(), 3);
    assert_eq!(result.metadata.prompt_version, "1.0");
    assert_eq!(result.metadata.model, "llama-3.1-70b-versatile");
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn throttled_twice_then_success_waits_twice() {
    let backend = Arc::new(
        ScriptedBackend::new("m")
            .respond(Err(status(429)))
            .respond(Err(status(429)))
            .respond(Ok(deck_json("Photosynthesis", 3))),
    );
    let result = orchestrator(&backend).run(&photosynthesis()).await.expect("third attempt succeeds");

    assert_eq!(result.cards.len(), 3);
    assert_eq!(backend.call_count(), 3);
    assert_gaps(&backend, &[1, 2]);
}

#[tokio::test(start_paused = true)]
async fn malformed_output_is_not_retried() {
    let backend = Arc::new(
        ScriptedBackend::new("m").respond_n(&Ok("this is not a deck".to_string()), 4),
    );
    let err = orchestrator(&backend).run(&photosynthesis()).await.expect_err("parse failure");

    assert_eq!(err.kind(), ErrorKind::ParsingError);
    assert!(!err.retryable());
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_errors_exhaust_the_budget() {
    let backend = Arc::new(ScriptedBackend::new("m").respond_n(&Err(status(503)), 10));
    let err = orchestrator(&backend).run(&photosynthesis()).await.expect_err("exhausted");

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert!(err.retryable());
    assert_eq!(backend.call_count(), 4);
    assert_gaps(&backend, &[1, 2, 4]);
}

#[tokio::test(start_paused = true)]
async fn delays_are_capped_by_max_delay() {
    let backend = Arc::new(ScriptedBackend::new("m").respond_n(&Err(status(500)), 10));
    let policy = RetryPolicy {
        max_retries: 5,
        ..RetryPolicy::default()
    };
    let generator = StructuredGenerator::new(backend.clone(), GenerationSettings::default());
    let _ = RetryOrchestrator::new(generator, policy).run(&photosynthesis()).await;

    assert_gaps(&backend, &[1, 2, 4, 8, 10]);
}

#[tokio::test(start_paused = true)]
async fn client_errors_fail_fast() {
    let backend = Arc::new(ScriptedBackend::new("m").respond_n(&Err(status(401)), 4));
    let err = orchestrator(&backend).run(&photosynthesis()).await.expect_err("401");

    assert_eq!(err.kind(), ErrorKind::ApiError);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn short_deck_is_a_parsing_error() {
    let backend = Arc::new(ScriptedBackend::new("m").respond(Ok(deck_json("Photosynthesis", 2))));
    let err = orchestrator(&backend).run(&photosynthesis()).await.expect_err("wrong count");

    assert_eq!(err.kind(), ErrorKind::ParsingError);
    assert!(matches!(err.raw(), RawFailure::Parse(_)));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_future_cancels_pending_retries() {
    let backend = Arc::new(ScriptedBackend::new("m").respond_n(&Err(status(503)), 10));
    let orch = orchestrator(&backend);
    let request = photosynthesis();

    // Give up during the first backoff wait.
    let outcome = tokio::time::timeout(Duration::from_millis(500), orch.run(&request)).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.call_count(), 1);
}
