//! LLM Client — OpenAI-compatible chat completions backend (Groq by default).

use std::time::Instant;

use async_trait::async_trait;
use flashgen_core::config::{ENV_API_KEY, LlmConfig};
use flashgen_core::FlashgenError;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::ChatBackend;
use crate::error::RawFailure;
use crate::types::{ChatRequest, ChatResponse};

/// Chat completions over HTTP with bearer-token auth.
pub struct OpenAiCompatibleBackend {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleBackend {
    /// Create a backend for `base_url` (the part before `/chat/completions`).
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build from the `[llm]` config section.
    ///
    /// # Errors
    /// Returns `FlashgenError::Config` when no API key is configured. This is
    /// a startup failure, not a per-request one.
    pub fn from_config(config: &LlmConfig) -> flashgen_core::error::Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                FlashgenError::Config(format!("{ENV_API_KEY} environment variable is required"))
            })?;
        Ok(Self::new(&config.base_url, api_key, &config.model))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, RawFailure> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let start = Instant::now();
        let resp = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "LLM API request failed");
                RawFailure::from(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "LLM API returned error");
            return Err(RawFailure::Status {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RawFailure::Parse(format!("response body is not JSON: {e}")))?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                RawFailure::Parse("response missing choices[0].message.content".into())
            })?
            .to_string();

        let tokens_generated = json["usage"]["completion_tokens"]
            .as_u64()
            .and_then(|t| u32::try_from(t).ok())
            .unwrap_or(0);

        debug!(latency_ms, tokens_generated, model = %self.model, "LLM call completed");

        Ok(ChatResponse {
            text,
            tokens_generated,
            latency_ms,
            model: json["model"].as_str().unwrap_or(&self.model).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat() -> ChatRequest {
        ChatRequest::new("system", "user")
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = LlmConfig::default();
        let err = OpenAiCompatibleBackend::from_config(&config)
            .err()
            .expect("missing key must fail");
        assert!(err.to_string().contains(ENV_API_KEY));

        let config = LlmConfig {
            api_key: Some("  ".into()),
            ..LlmConfig::default()
        };
        assert!(OpenAiCompatibleBackend::from_config(&config).is_err());
    }

    #[test]
    fn from_config_uses_configured_model() {
        let config = LlmConfig {
            api_key: Some("key".into()),
            model: "llama-3.3-70b".into(),
            ..LlmConfig::default()
        };
        let backend = OpenAiCompatibleBackend::from_config(&config).expect("configured");
        assert_eq!(backend.model(), "llama-3.3-70b");
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model",
                "choices": [{ "message": { "role": "assistant", "content": "{\"ok\":true}" } }],
                "usage": { "completion_tokens": 12 }
            })))
            .mount(&mock_server)
            .await;

        let backend = OpenAiCompatibleBackend::new(mock_server.uri(), "test-key", "test-model");
        let response = backend.complete(&chat()).await.expect("success");
        assert_eq!(response.text, "{\"ok\":true}");
        assert_eq!(response.tokens_generated, 12);
        assert_eq!(response.model, "test-model");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&mock_server)
            .await;

        let backend = OpenAiCompatibleBackend::new(mock_server.uri(), "k", "m");
        let err = backend.complete(&chat()).await.expect_err("429");
        assert_eq!(
            err,
            RawFailure::Status {
                status: 429,
                message: "slow down".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_content_is_parse_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&mock_server)
            .await;

        let backend = OpenAiCompatibleBackend::new(mock_server.uri(), "k", "m");
        let err = backend.complete(&chat()).await.expect_err("no content");
        assert!(matches!(err, RawFailure::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_failure() {
        let backend = OpenAiCompatibleBackend::new("http://127.0.0.1:1", "k", "m");
        let err = backend.complete(&chat()).await.expect_err("connection refused");
        assert!(matches!(err, RawFailure::Transport(_)));
    }
}
