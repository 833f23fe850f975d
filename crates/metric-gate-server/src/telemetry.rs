// crates/metric-gate-server/src/telemetry.rs
// ============================================================================
// Module: Server Telemetry
// Description: Observability hooks for HTTP request handling.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: metric-gate-server, tracing
// ============================================================================

//! ## Overview
//! A thin metrics interface for request counters and latency histograms,
//! intentionally dependency-light so deployments can plug in Prometheus or
//! OpenTelemetry without redesign. The default sink emits structured tracing
//! events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for request histograms.
pub const REQUEST_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Successful request.
    Ok,
    /// Failed request.
    Error,
}

impl RequestOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Request metric event payload.
#[derive(Debug, Clone)]
pub struct RequestMetricEvent {
    /// Matched route template.
    pub route: String,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status code returned.
    pub status: u16,
    /// Handler latency.
    pub duration: Duration,
    /// Server correlation identifier.
    pub correlation_id: String,
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Destination for request metric events.
pub trait MetricsSink: Send + Sync {
    /// Records one request event.
    fn record_request(&self, event: &RequestMetricEvent);
}

/// Default sink emitting structured tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_request(&self, event: &RequestMetricEvent) {
        let bucket_ms = latency_bucket_ms(event.duration);
        let duration_ms = u64::try_from(event.duration.as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            route = event.route,
            outcome = event.outcome.as_str(),
            status = event.status,
            duration_ms,
            bucket_ms,
            correlation_id = %event.correlation_id,
            "http.request"
        );
    }
}

/// Returns the smallest configured bucket holding the duration.
#[must_use]
pub fn latency_bucket_ms(duration: Duration) -> u64 {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    for bucket in REQUEST_LATENCY_BUCKETS_MS {
        if millis <= *bucket {
            return *bucket;
        }
    }
    u64::MAX
}

// ============================================================================
// SECTION: Tests
// ============================================================================
