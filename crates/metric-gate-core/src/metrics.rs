// crates/metric-gate-core/src/metrics.rs
// ============================================================================
// Module: Canonical Metric Model
// Description: Source-agnostic metric observation records.
// Purpose: Provide the stable shape plugins produce and tool handlers consume.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Domain plugins translate raw dataset JSON or pre-aggregated label values
//! into [`MetricPoint`] observations. Keeping the model small and stable lets
//! plugins target one shape regardless of the backend or dataset schema
//! version. Points are immutable after creation; the orchestrator aggregates
//! them read-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Semantic version of the canonical domain model.
pub const DOMAIN_MODEL_VERSION: &str = "1.0.0";

/// Sentinel dimension value emitted when a matrix key is absent.
///
/// Cross-run grouping by the `(target, mode, os_id)` matrix requires a stable
/// key shape, so absent dimensions are filled with this marker instead of
/// being omitted.
pub const UNDEFINED_DIMENSION: &str = "undefined";

// ============================================================================
// SECTION: Metric Point
// ============================================================================

/// Single metric observation in canonical form.
///
/// # Invariants
/// - `value` is finite; producers must filter NaN and infinities before
///   constructing a point.
/// - `metric_id` is a dotted canonical name (e.g. `boot.time.total_ms`).
/// - Points are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Canonical metric identifier.
    pub metric_id: String,
    /// Observation timestamp (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Numeric value of the observation.
    pub value: f64,
    /// Optional unit of measurement (e.g. `ms`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Optional dimensional breakdown (e.g. `{"os_id": "rhel-9.2"}`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<BTreeMap<String, String>>,
    /// Optional plugin/source marker that produced this observation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MetricPoint {
    /// Returns the de-duplication key used by the merge step.
    ///
    /// Points are keyed by `(metric_id, timestamp)` so pre-aggregated label
    /// observations can replace dataset observations of the same instant.
    #[must_use]
    pub fn merge_key(&self) -> (String, String) {
        (self.metric_id.clone(), crate::timestamps::to_iso8601(self.timestamp))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
