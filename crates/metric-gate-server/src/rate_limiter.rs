// crates/metric-gate-server/src/rate_limiter.rs
// ============================================================================
// Module: Rate Limiter
// Description: Per-client sliding-window limits for the LLM endpoint.
// Purpose: Bound request counts and token budgets per client per hour.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Each client identity keeps two deques: request timestamps and
//! `(timestamp, token_count)` pairs. Entries older than the window are
//! evicted lazily on every check. A request is allowed if and only if the
//! window holds fewer than `requests_per_hour` entries and the token sum is
//! below `tokens_per_hour`, or the request carries the matching admin key.
//! State mutation happens under one mutex that is never held across awaits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the sliding-window rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per client per window.
    pub requests_per_hour: u32,
    /// Maximum tokens per client per window.
    pub tokens_per_hour: u64,
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Master switch; when false every check is allowed.
    pub enabled: bool,
    /// Admin key bypassing both caps, when set.
    pub admin_key: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: 100,
            tokens_per_hour: 100_000,
            window_seconds: 3600,
            enabled: true,
            admin_key: None,
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Sliding-window state for one client.
#[derive(Debug, Default)]
struct ClientState {
    /// Timestamps of requests inside the window.
    request_timestamps: VecDeque<Instant>,
    /// `(timestamp, token_count)` pairs inside the window.
    token_usage: VecDeque<(Instant, u64)>,
}

impl ClientState {
    /// Evicts entries older than the window start.
    fn evict_older_than(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.request_timestamps.front() {
            if now.duration_since(*oldest) >= window {
                self.request_timestamps.pop_front();
            } else {
                break;
            }
        }
        while let Some((oldest, _)) = self.token_usage.front() {
            if now.duration_since(*oldest) >= window {
                self.token_usage.pop_front();
            } else {
                break;
            }
        }
    }

    /// Token sum inside the window.
    fn token_total(&self) -> u64 {
        self.token_usage.iter().map(|(_, tokens)| tokens).sum()
    }
}

/// Decision returned by a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request may proceed.
    Allowed,
    /// Request is rejected.
    Denied {
        /// Human-readable explanation of which limit was exceeded.
        message: String,
        /// Seconds until the oldest entry leaves the window.
        retry_after_seconds: u64,
    },
}

/// Usage statistics for one client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClientStats {
    /// Requests remaining in the window.
    pub requests_remaining: u32,
    /// Configured request limit.
    pub requests_limit: u32,
    /// Tokens remaining in the window.
    pub tokens_remaining: u64,
    /// Configured token limit.
    pub tokens_limit: u64,
    /// Window length in seconds.
    pub window_seconds: u64,
}

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// In-memory sliding-window rate limiter keyed by client identity.
///
/// # Invariants
/// - The client map mutex is never held across await points.
pub struct RateLimiter {
    /// Limiter configuration.
    config: RateLimitConfig,
    /// Per-client sliding-window state.
    clients: Mutex<BTreeMap<String, ClientState>>,
}

impl RateLimiter {
    /// Creates a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        tracing::info!(
            requests_per_hour = config.requests_per_hour,
            tokens_per_hour = config.tokens_per_hour,
            enabled = config.enabled,
            "rate_limiter.init"
        );
        Self {
            config,
            clients: Mutex::new(BTreeMap::new()),
        }
    }

    /// Checks whether a client may proceed.
    #[must_use]
    pub fn check(&self, client_id: &str, admin_key: Option<&str>) -> RateLimitDecision {
        if let (Some(provided), Some(expected)) = (admin_key, self.config.admin_key.as_deref()) {
            if provided == expected {
                tracing::debug!(client_id, "rate_limiter.admin_bypass");
                return RateLimitDecision::Allowed;
            }
        }
        if !self.config.enabled {
            return RateLimitDecision::Allowed;
        }

        let window = Duration::from_secs(self.config.window_seconds);
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let state = clients.entry(client_id.to_string()).or_default();
        state.evict_older_than(window, now);

        let request_count = state.request_timestamps.len();
        if request_count >= self.config.requests_per_hour as usize {
            let retry_after = state
                .request_timestamps
                .front()
                .map_or(0, |oldest| remaining_seconds(*oldest, window, now));
            tracing::warn!(client_id, requests = request_count, "rate_limiter.requests_exceeded");
            return RateLimitDecision::Denied {
                message: format!(
                    "Request rate limit exceeded ({} requests/hour). Retry after {retry_after} \
                     seconds.",
                    self.config.requests_per_hour
                ),
                retry_after_seconds: retry_after,
            };
        }

        let token_total = state.token_total();
        if token_total >= self.config.tokens_per_hour {
            let retry_after = state
                .token_usage
                .front()
                .map_or(0, |(oldest, _)| remaining_seconds(*oldest, window, now));
            tracing::warn!(client_id, tokens = token_total, "rate_limiter.tokens_exceeded");
            return RateLimitDecision::Denied {
                message: format!(
                    "Token budget exceeded ({} tokens/hour). Retry after {retry_after} seconds.",
                    self.config.tokens_per_hour
                ),
                retry_after_seconds: retry_after,
            };
        }

        RateLimitDecision::Allowed
    }

    /// Records a completed request and its token usage.
    pub fn record(&self, client_id: &str, tokens_used: u64) {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let state = clients.entry(client_id.to_string()).or_default();
        state.request_timestamps.push_back(now);
        if tokens_used > 0 {
            state.token_usage.push_back((now, tokens_used));
        }
    }

    /// Returns current usage statistics for a client.
    #[must_use]
    pub fn client_stats(&self, client_id: &str) -> ClientStats {
        let window = Duration::from_secs(self.config.window_seconds);
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let state = clients.entry(client_id.to_string()).or_default();
        state.evict_older_than(window, now);
        let request_count = u32::try_from(state.request_timestamps.len()).unwrap_or(u32::MAX);
        let token_total = state.token_total();
        ClientStats {
            requests_remaining: self.config.requests_per_hour.saturating_sub(request_count),
            requests_limit: self.config.requests_per_hour,
            tokens_remaining: self.config.tokens_per_hour.saturating_sub(token_total),
            tokens_limit: self.config.tokens_per_hour,
            window_seconds: self.config.window_seconds,
        }
    }
}

/// Seconds until an entry at `oldest` leaves the window.
fn remaining_seconds(oldest: Instant, window: Duration, now: Instant) -> u64 {
    let elapsed = now.duration_since(oldest);
    window.saturating_sub(elapsed).as_secs()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
