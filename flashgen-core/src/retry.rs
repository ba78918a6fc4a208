//! Retry budget and exponential backoff schedule.
//!
//! Pure math only. The driver loops that consume this policy live in
//! `flashgen-llm` (server-side orchestrator) and `flashgen-client`.

use std::time::Duration;

/// Bounded retry-with-exponential-backoff policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub max_retries: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Cap applied to every delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt may follow the failed attempt `attempt` (0-based).
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay to wait after failed attempt `attempt` (0-based):
    /// `min(initial * multiplier^attempt, max)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled.max(0.0)).min(self.max_delay)
    }

    /// Every delay the policy can produce, in order.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|n| self.delay_for(n)).collect()
    }
}
