//! HTTP surface.
//!
//! | Route                              | Handler      |
//! |------------------------------------|--------------|
//! | `POST /api/flashcards/generate`    | [`generate`] |
//! | `GET  /api/flashcards/health`      | [`health`]   |
//! | `GET  /api/flashcards/stats`       | [`stats`]    |
//! | `GET  /metrics`                    | [`metrics`]  |

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use flashgen_core::metrics::CounterSnapshot;
use flashgen_core::quota::QuotaStats;
use flashgen_core::{CardSource, Difficulty, FlashgenError, GenerationRequest, GenerationResult};
use flashgen_llm::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::pipeline::{GenerationOutcome, Pipeline, PipelineError};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline facade.
    pub pipeline: Pipeline,
    /// Take the client address from `X-Forwarded-For`.
    pub trust_proxy: bool,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/flashcards/generate", post(generate))
        .route("/api/flashcards/health", get(health))
        .route("/api/flashcards/stats", get(stats))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Client identity
// ---------------------------------------------------------------------------

/// Quota key for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Self {
        let forwarded = trust_proxy
            .then(|| headers.get("x-forwarded-for"))
            .flatten()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match (forwarded, peer) {
            (Some(ip), _) => Self(ip.to_string()),
            (None, Some(addr)) => Self(addr.ip().to_string()),
            (None, None) => Self("unknown".to_string()),
        }
    }
}

impl FromRequestParts<AppState> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(&parts.headers, peer, state.trust_proxy))
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Request body before domain validation.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    topic: String,
    count: u32,
    difficulty: Difficulty,
}

/// Quota state echoed back on success.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    remaining: u32,
    limit: u32,
    reset_time: DateTime<Utc>,
}

/// Successful generate payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    success: bool,
    data: GenerationResult,
    source: CardSource,
    rate_limit_info: RateLimitInfo,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            success: true,
            rate_limit_info: RateLimitInfo {
                remaining: outcome.rate_limit.remaining,
                limit: outcome.rate_limit.limit,
                reset_time: outcome.rate_limit.reset_at(),
            },
            data: outcome.result,
            source: outcome.source,
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::ParsingError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ApiError => StatusCode::BAD_GATEWAY,
        ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        match self {
            Self::Invalid(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid input", "details": details })),
            )
                .into_response(),
            Self::RateLimited(decision) => {
                let retry_after = decision.retry_after_secs.unwrap_or(1);
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "Rate limit exceeded",
                        "retryAfter": retry_after,
                        "limit": decision.limit,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
            Self::Generation(err) => (
                status_for(err.kind()),
                Json(json!({
                    "error": err.message(),
                    "type": err.kind(),
                    "retryable": err.retryable(),
                    "details": err.details(),
                })),
            )
                .into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/flashcards/generate`
pub async fn generate(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, PipelineError> {
    let request = match body {
        Ok(Json(body)) => GenerationRequest::new(body.topic, body.count, body.difficulty),
        Err(rejection) => Err(FlashgenError::InvalidRequest(vec![rejection.body_text()])),
    };
    let outcome = state.pipeline.generate(&client, request).await?;
    Ok(Json(GenerateResponse::from(outcome)))
}

/// `GET /api/flashcards/health`
pub async fn health(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now();
    match state.pipeline.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "timestamp": timestamp })),
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "error": err.to_string(),
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    model: String,
    counters: CounterSnapshot,
    quota: QuotaStats,
}

/// `GET /api/flashcards/stats`
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        model: state.pipeline.model().to_string(),
        counters: state.pipeline.counters().snapshot(),
        quota: state.pipeline.quota().stats(),
    })
}

/// `GET /metrics` (Prometheus text format)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.pipeline.counters().snapshot().to_prometheus(),
    )
}
