//! Client tier against a mocked flashgen server.

use std::time::Duration;

use flashgen_client::{ClientError, FlashcardClient};
use flashgen_core::{DeckSize, Difficulty, Flashcard, GenerationRequest, GenerationResult, RetryPolicy};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE: &str = "/api/flashcards/generate";

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
    }
}

fn client(server: &MockServer) -> FlashcardClient {
    FlashcardClient::new(server.uri()).with_policy(fast_policy())
}

fn success_body(topic: &str, count: u32) -> serde_json::Value {
    let request = GenerationRequest::new(topic, count, Difficulty::Medium).expect("valid");
    let cards = (0..count)
        .map(|i| Flashcard::new(format!("Q{i}?"), format!("A{i}."), Difficulty::Medium))
        .collect();
    let result = GenerationResult::new(&request, cards, "llama-3.1-70b-versatile");
    serde_json::json!({
        "success": true,
        "data": result,
        "source": "llm",
        "rateLimitInfo": { "remaining": 19, "limit": 20, "resetTime": "2026-01-01T00:00:00Z" }
    })
}

fn is_template_deck(cards: &[Flashcard], topic: &str) -> bool {
    cards
        .iter()
        .all(|c| c.tags == [topic.to_string(), "medium".to_string()] && c.question.contains(topic))
}

#[tokio::test]
async fn returns_server_cards_tagged_with_topic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .and(body_partial_json(serde_json::json!({
            "topic": "Photosynthesis", "count": 5, "difficulty": "medium"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Photosynthesis", 5)))
        .expect(1)
        .mount(&server)
        .await;

    let cards = client(&server)
        .generate_flashcards("Photosynthesis", DeckSize::Five, Difficulty::Medium)
        .await
        .expect("cards");

    assert_eq!(cards.len(), 5);
    assert!(cards.iter().all(|c| c.tags.contains(&"Photosynthesis".to_string())));
    assert_eq!(cards[0].question, "Q0?");
}

#[tokio::test]
async fn retries_through_provider_throttling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": "provider returned 429", "type": "rate_limit", "retryable": true
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Rust", 10)))
        .expect(1)
        .mount(&server)
        .await;

    let cards = client(&server)
        .generate_flashcards("Rust", DeckSize::Ten, Difficulty::Medium)
        .await
        .expect("cards");
    assert_eq!(cards.len(), 10);
    assert_eq!(cards[0].question, "Q0?");
}

#[tokio::test]
async fn quota_rejection_reaches_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "42")
                .set_body_json(serde_json::json!({
                    "error": "Rate limit exceeded", "retryAfter": 42, "limit": 20
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_flashcards("Rust", DeckSize::Five, Difficulty::Medium)
        .await
        .expect_err("quota stop");
    assert_eq!(err, ClientError::RateLimited { retry_after_secs: 42 });
}

#[tokio::test]
async fn server_errors_exhaust_then_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let cards = client(&server)
        .generate_flashcards("Geology", DeckSize::Twenty, Difficulty::Medium)
        .await
        .expect("template cards");
    assert_eq!(cards.len(), 20);
    assert!(is_template_deck(&cards, "Geology"));
}

#[tokio::test]
async fn client_errors_fall_back_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "Invalid input", "details": ["Topic is required"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cards = client(&server)
        .generate_flashcards("Geology", DeckSize::Five, Difficulty::Medium)
        .await
        .expect("template cards");
    assert_eq!(cards.len(), 5);
    assert!(is_template_deck(&cards, "Geology"));
}

#[tokio::test]
async fn retryable_flag_in_body_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "error": "upstream hiccup", "type": "unknown", "retryable": true
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Rust", 5)))
        .expect(1)
        .mount(&server)
        .await;

    let cards = client(&server)
        .generate_flashcards("Rust", DeckSize::Five, Difficulty::Medium)
        .await
        .expect("cards");
    assert_eq!(cards[0].question, "Q0?");
}

#[tokio::test]
async fn unreachable_server_falls_back() {
    let client = FlashcardClient::new("http://127.0.0.1:1").with_policy(fast_policy());
    let cards = client
        .generate_flashcards("Optics", DeckSize::Five, Difficulty::Medium)
        .await
        .expect("template cards");
    assert_eq!(cards.len(), 5);
    assert!(is_template_deck(&cards, "Optics"));
}

#[tokio::test]
async fn health_probe_follows_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flashcards/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/flashcards/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.check_health().await);
    assert!(!client.check_health().await);
}

#[tokio::test]
async fn health_requires_healthy_status_in_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flashcards/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "degraded"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/flashcards/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(!client.check_health().await);
    assert!(!client.check_health().await);
}
