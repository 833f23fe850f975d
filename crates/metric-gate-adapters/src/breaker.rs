// crates/metric-gate-adapters/src/breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Per-adapter health gate with rate-limit header extraction.
// Purpose: Stop cascading failures by rejecting calls to an unhealthy source.
// Dependencies: metric-gate-adapters, tokio, time
// ============================================================================

//! ## Overview
//! The breaker shields each adapter instance: CLOSED passes calls through and
//! counts failures; OPEN rejects immediately until `timeout_seconds` elapse;
//! HALF_OPEN admits probes and closes after `success_threshold` consecutive
//! successes. Only server errors (5xx), 429, timeouts, and connect failures
//! count; other 4xx statuses never move the state machine. All counters are
//! read and written under one mutex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use tokio::sync::Mutex;

use crate::AdapterError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for circuit-breaker behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Counted failures before the circuit opens.
    pub failure_threshold: u32,
    /// Consecutive half-open successes before the circuit closes.
    pub success_threshold: u32,
    /// Seconds to wait in OPEN before admitting a probe.
    pub timeout_seconds: f64,
    /// Sliding window for failure counting, in seconds.
    pub window_seconds: f64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_seconds: 60.0,
            window_seconds: 60.0,
        }
    }
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed,
    /// Requests are rejected after too many failures.
    Open,
    /// Probing whether the service recovered.
    HalfOpen,
}

impl CircuitState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Mutable breaker counters guarded by the breaker mutex.
#[derive(Debug)]
struct BreakerInner {
    /// Current state.
    state: CircuitState,
    /// Counted failures since the last success in CLOSED.
    failure_count: u32,
    /// Consecutive successes while HALF_OPEN.
    success_count: u32,
    /// Instant of the last counted failure.
    last_failure_time: Option<Instant>,
    /// Instant the circuit last opened.
    opened_at: Option<Instant>,
}

/// Circuit breaker guarding one adapter instance.
///
/// # Invariants
/// - No transition out of OPEN happens before `timeout_seconds` have elapsed
///   since `opened_at`.
/// - Counters are only accessed under the mutex.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Breaker name used in logs and errors (usually the source id).
    name: String,
    /// Behavior configuration.
    config: CircuitBreakerConfig,
    /// Guarded state and counters.
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a breaker with the given name and configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                opened_at: None,
            }),
        }
    }

    /// Admits or rejects a call, performing the OPEN to HALF_OPEN transition.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::CircuitOpen`] while the circuit is open and
    /// the probe timeout has not yet elapsed.
    pub async fn preflight(&self) -> Result<(), AdapterError> {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Open {
            return Ok(());
        }
        let elapsed = inner.opened_at.map_or(0.0, |opened| opened.elapsed().as_secs_f64());
        if elapsed >= self.config.timeout_seconds {
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
            tracing::info!(name = %self.name, "circuit_breaker.half_open");
            return Ok(());
        }
        let retry_in = (self.config.timeout_seconds - elapsed).ceil().max(0.0);
        tracing::warn!(name = %self.name, retry_in, "circuit_breaker.blocked");
        Err(AdapterError::CircuitOpen {
            name: self.name.clone(),
            retry_in_seconds: seconds_to_u64(retry_in),
        })
    }

    /// Records a successful call.
    pub async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.last_failure_time = None;
                    inner.opened_at = None;
                    tracing::info!(name = %self.name, "circuit_breaker.closed");
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.last_failure_time = None;
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call, counting only health-relevant failures.
    pub async fn on_failure(&self, error: &AdapterError) {
        if !error.is_counted_failure() {
            return;
        }
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        inner.last_failure_time = Some(now);
        inner.failure_count += 1;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                tracing::warn!(name = %self.name, error = %error, "circuit_breaker.reopened");
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    tracing::error!(
                        name = %self.name,
                        failure_count = inner.failure_count,
                        threshold = self.config.failure_threshold,
                        "circuit_breaker.opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Returns the current state.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Returns the instant of the last counted failure, when any.
    pub async fn last_failure_time(&self) -> Option<Instant> {
        self.inner.lock().await.last_failure_time
    }

    /// Manually resets the breaker to CLOSED with cleared counters.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure_time = None;
        inner.opened_at = None;
        tracing::info!(name = %self.name, "circuit_breaker.reset");
    }
}

/// Converts non-negative whole seconds from f64 into u64.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Input is ceiled and clamped non-negative before the cast."
)]
fn seconds_to_u64(seconds: f64) -> u64 {
    seconds as u64
}

// ============================================================================
// SECTION: Rate-Limit Extraction
// ============================================================================

/// Rate-limit information parsed from upstream response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimitInfo {
    /// Seconds to wait before retrying, from `Retry-After`.
    pub retry_after_seconds: Option<f64>,
    /// Window request limit, from `X-RateLimit-Limit`.
    pub limit: Option<u64>,
    /// Remaining requests in the window, from `X-RateLimit-Remaining`.
    pub remaining: Option<u64>,
    /// Unix timestamp when the window resets, from `X-RateLimit-Reset`.
    pub reset_at: Option<f64>,
}

/// Parses rate-limit headers from a header lookup function.
///
/// `Retry-After` accepts either delta seconds or an HTTP-date; the latter is
/// converted to a delta against the current wall clock.
#[must_use]
pub fn extract_rate_limit_info<'a>(
    mut header: impl FnMut(&str) -> Option<&'a str>,
) -> RateLimitInfo {
    let retry_after_seconds = header("retry-after").and_then(parse_retry_after);
    let limit = header("x-ratelimit-limit").and_then(|value| value.parse::<u64>().ok());
    let remaining = header("x-ratelimit-remaining").and_then(|value| value.parse::<u64>().ok());
    let reset_at = header("x-ratelimit-reset").and_then(|value| value.parse::<f64>().ok());
    RateLimitInfo {
        retry_after_seconds,
        limit,
        remaining,
        reset_at,
    }
}

/// Parses a `Retry-After` value as seconds or an HTTP-date.
fn parse_retry_after(value: &str) -> Option<f64> {
    if let Ok(seconds) = value.trim().parse::<f64>() {
        return Some(seconds);
    }
    match OffsetDateTime::parse(value.trim(), &Rfc2822) {
        Ok(when) => {
            let delta = when - OffsetDateTime::now_utc();
            Some(delta.as_seconds_f64())
        }
        Err(_) => {
            tracing::warn!(value, "rate_limit.parse_retry_after_failed");
            None
        }
    }
}

/// Sleep hint derived from rate-limit info, clamped to a sane bound.
#[must_use]
pub fn retry_sleep_hint(info: &RateLimitInfo, max_seconds: f64) -> Option<Duration> {
    let seconds = info.retry_after_seconds?;
    if seconds <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds.min(max_seconds)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
