//! Quota Gate — per-client fixed-window request admission.
//!
//! Every generation request is checked here before any LLM work happens.
//! A client gets `limit` admissions per window; the window opens on the
//! client's first request and is dropped once it expires.
//!
//! All state sits behind one `parking_lot::Mutex`, so updates to a given
//! client's window are serialized and no increment is lost. Expired windows
//! are removed lazily (the caller's own window on every check, a full sweep
//! at most once per window length) and by [`QuotaGate::purge_expired`],
//! which the server runs on a timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Outcome of a single quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Admissions left in the current window.
    pub remaining: u32,
    /// Configured per-window limit.
    pub limit: u32,
    /// Time until the window resets, measured at the check.
    pub resets_in: Duration,
    /// Whole seconds to wait before retrying (rejections only).
    pub retry_after_secs: Option<u64>,
}

impl QuotaDecision {
    /// Wall-clock reset time, derived from `resets_in`.
    #[must_use]
    pub fn reset_at(&self) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::from_std(self.resets_in).unwrap_or_default()
    }
}

/// A single client's live window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

impl Window {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

struct QuotaInner {
    windows: HashMap<String, Window>,
    limit: u32,
    window: Duration,
    last_sweep: Option<Instant>,
    total_admitted: u64,
    total_rejected: u64,
}

impl QuotaInner {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_expired(now));
        self.last_sweep = Some(now);
        before - self.windows.len()
    }
}

/// Statistics about the quota gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStats {
    /// Clients with a live window.
    pub tracked_clients: usize,
    /// Requests admitted since startup.
    pub total_admitted: u64,
    /// Requests rejected since startup.
    pub total_rejected: u64,
}

/// Thread-safe per-client quota gate. Clones share state.
#[derive(Clone)]
pub struct QuotaGate {
    inner: Arc<Mutex<QuotaInner>>,
}

impl QuotaGate {
    /// Create a gate admitting `limit` requests per client per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QuotaInner {
                windows: HashMap::new(),
                limit,
                window,
                last_sweep: None,
                total_admitted: 0,
                total_rejected: 0,
            })),
        }
    }

    /// Build a gate from the `[quota]` config section.
    #[must_use]
    pub fn from_config(config: &crate::config::QuotaConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Check (and on admission, consume) one request for `client_id`.
    pub fn check(&self, client_id: &str) -> QuotaDecision {
        self.check_at(client_id, Instant::now())
    }

    /// [`QuotaGate::check`] at an explicit instant.
    ///
    /// `now` must not go backwards between calls for the same gate.
    pub fn check_at(&self, client_id: &str, now: Instant) -> QuotaDecision {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let sweep_due = inner
            .last_sweep
            .is_none_or(|last| now.saturating_duration_since(last) >= inner.window);
        if sweep_due {
            let purged = inner.sweep(now);
            if purged > 0 {
                debug!(purged, "Dropped expired quota windows");
            }
        }

        let limit = inner.limit;
        let window_len = inner.window;
        let window = inner
            .windows
            .entry(client_id.to_string())
            .and_modify(|w| {
                if w.is_expired(now) {
                    *w = Window {
                        count: 0,
                        reset_at: now + window_len,
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                reset_at: now + window_len,
            });

        let resets_in = window.reset_at.saturating_duration_since(now);

        if window.count >= limit {
            inner.total_rejected += 1;
            // Expiry is `now >= reset_at`, so a live window always has time
            // left and this rounds up to at least one second.
            let retry_after_secs = resets_in.as_nanos().div_ceil(1_000_000_000);
            return QuotaDecision {
                allowed: false,
                remaining: 0,
                limit,
                resets_in,
                retry_after_secs: Some(u64::try_from(retry_after_secs).unwrap_or(u64::MAX)),
            };
        }

        window.count += 1;
        let remaining = limit - window.count;
        inner.total_admitted += 1;

        QuotaDecision {
            allowed: true,
            remaining,
            limit,
            resets_in,
            retry_after_secs: None,
        }
    }

    /// Drop every expired window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// [`QuotaGate::purge_expired`] at an explicit instant.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        self.inner.lock().sweep(now)
    }

    /// Configured per-window limit.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.inner.lock().limit
    }

    /// Get gate statistics.
    #[must_use]
    pub fn stats(&self) -> QuotaStats {
        let inner = self.inner.lock();
        QuotaStats {
            tracked_clients: inner.windows.len(),
            total_admitted: inner.total_admitted,
            total_rejected: inner.total_rejected,
        }
    }
}
