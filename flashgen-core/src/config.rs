//! Configuration for the flashgen service.
//!
//! Maps directly to `flashgen.toml`. Every section is optional; missing keys
//! take the defaults below. Environment variables are applied on top by
//! [`FlashgenConfig::apply_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Environment variable overriding [`QuotaConfig::max_requests`].
pub const ENV_MAX_REQUESTS: &str = "MAX_REQUESTS_PER_MINUTE";
/// Environment variable overriding [`LlmConfig::model`].
pub const ENV_MODEL: &str = "GROQ_MODEL";
/// Environment variable providing [`LlmConfig::api_key`].
pub const ENV_API_KEY: &str = "GROQ_API_KEY";
/// Environment variable overriding [`LlmConfig::base_url`].
pub const ENV_BASE_URL: &str = "GROQ_BASE_URL";
/// Environment variable overriding [`ServerConfig::bind`].
pub const ENV_BIND: &str = "FLASHGEN_BIND";

/// Top-level flashgen configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashgenConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-client request quota.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Retry/backoff policy for LLM calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Template fallback behavior.
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FlashgenConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `FlashgenError::Config` if the TOML is invalid or a value is
    /// out of range (see [`FlashgenConfig::validate`]).
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::FlashgenError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with.
    ///
    /// # Errors
    /// Returns `FlashgenError::Config` if the quota window or the sweep
    /// interval is zero.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.quota.window_secs == 0 {
            return Err(crate::FlashgenError::Config(
                "quota.window_secs must be greater than 0".into(),
            ));
        }
        if self.quota.sweep_interval_secs == 0 {
            return Err(crate::FlashgenError::Config(
                "quota.sweep_interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    /// Returns `FlashgenError::Config` if an override is present but unparsable.
    pub fn apply_env(&mut self) -> crate::error::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    ///
    /// # Errors
    /// Returns `FlashgenError::Config` if an override is present but
    /// unparsable, or the resulting config fails [`FlashgenConfig::validate`].
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_REQUESTS) {
            self.quota.max_requests = raw.trim().parse().map_err(|_| {
                crate::FlashgenError::Config(format!("{ENV_MAX_REQUESTS} must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.is_empty()) {
            self.llm.model = model;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.is_empty()) {
            self.llm.base_url = url;
        }
        if let Some(bind) = lookup(ENV_BIND).filter(|b| !b.is_empty()) {
            self.server.bind = bind;
        }
        self.validate()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Key clients by the first `X-Forwarded-For` hop (when behind a proxy).
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trust_proxy: false,
        }
    }
}

/// Per-client request quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum admitted requests per client per window.
    #[serde(default = "default_20")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_60")]
    pub window_secs: u64,
    /// How often the background sweeper drops expired windows.
    #[serde(default = "default_300")]
    pub sweep_interval_secs: u64,
}

impl QuotaConfig {
    /// Window length as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

/// LLM provider settings (any OpenAI-compatible chat completions API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key. Normally supplied through `GROQ_API_KEY` rather than the file.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum completion tokens.
    #[serde(default = "default_2048")]
    pub max_tokens: u32,
    /// Hard timeout for a single provider call in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
}

impl LlmConfig {
    /// Per-call timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 2048,
            request_timeout_ms: 30_000,
        }
    }
}

/// Retry/backoff policy for LLM calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first.
    #[serde(default = "default_3")]
    pub max_retries: u32,
    /// Delay before the first retry (ms).
    #[serde(default = "default_1000")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay (ms).
    #[serde(default = "default_10000")]
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays.
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Build the runtime policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Template fallback behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Serve template cards when the LLM path fails. When off, the
    /// classified error is returned to the caller instead.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_base_url() -> String { "https://api.groq.com/openai/v1".to_string() }
fn default_model() -> String { "llama-3.1-70b-versatile".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_multiplier() -> f64 { 2.0 }
fn default_3() -> u32 { 3 }
fn default_20() -> u32 { 20 }
fn default_60() -> u64 { 60 }
fn default_300() -> u64 { 300 }
fn default_1000() -> u64 { 1000 }
fn default_2048() -> u32 { 2048 }
fn default_10000() -> u64 { 10_000 }
fn default_30000() -> u64 { 30_000 }
