//! Runtime counters for the generation pipeline.
//!
//! Lock-free `AtomicU64` counters bumped on the request path and read on
//! export (the `/stats` endpoint or Prometheus text).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for pipeline events.
pub struct PipelineCounters {
    /// Generation requests received.
    pub requests: AtomicU64,
    /// Requests rejected by input validation.
    pub invalid_requests: AtomicU64,
    /// Requests rejected by the quota gate.
    pub rate_limited: AtomicU64,
    /// Calls made to the LLM provider (including retries).
    pub llm_attempts: AtomicU64,
    /// Retries scheduled after a retryable failure.
    pub llm_retries: AtomicU64,
    /// Requests answered with LLM-generated cards.
    pub llm_successes: AtomicU64,
    /// Requests answered with template cards.
    pub fallbacks_served: AtomicU64,
    /// Classified errors surfaced to callers (fallback disabled).
    pub generation_errors: AtomicU64,
}

impl PipelineCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            invalid_requests: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            llm_attempts: AtomicU64::new(0),
            llm_retries: AtomicU64::new(0),
            llm_successes: AtomicU64::new(0),
            fallbacks_served: AtomicU64::new(0),
            generation_errors: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            llm_attempts: self.llm_attempts.load(Ordering::Relaxed),
            llm_retries: self.llm_retries.load(Ordering::Relaxed),
            llm_successes: self.llm_successes.load(Ordering::Relaxed),
            fallbacks_served: self.fallbacks_served.load(Ordering::Relaxed),
            generation_errors: self.generation_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    /// Generation requests received.
    pub requests: u64,
    /// Requests rejected by validation.
    pub invalid_requests: u64,
    /// Requests rejected by the quota gate.
    pub rate_limited: u64,
    /// Provider calls.
    pub llm_attempts: u64,
    /// Scheduled retries.
    pub llm_retries: u64,
    /// LLM-served requests.
    pub llm_successes: u64,
    /// Fallback-served requests.
    pub fallbacks_served: u64,
    /// Errors surfaced to callers.
    pub generation_errors: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("requests", "Generation requests received", self.requests),
            ("invalid_requests", "Requests rejected by validation", self.invalid_requests),
            ("rate_limited", "Requests rejected by the quota gate", self.rate_limited),
            ("llm_attempts", "Calls made to the LLM provider", self.llm_attempts),
            ("llm_retries", "Retries after retryable LLM failures", self.llm_retries),
            ("llm_successes", "Requests served with LLM cards", self.llm_successes),
            ("fallbacks_served", "Requests served with template cards", self.fallbacks_served),
            ("generation_errors", "Generation errors surfaced to callers", self.generation_errors),
        ];

        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP flashgen_{name}_total {help}\n\
                 # TYPE flashgen_{name}_total counter\n\
                 flashgen_{name}_total {value}\n"
            ));
        }
        out
    }
}
