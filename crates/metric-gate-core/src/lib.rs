// crates/metric-gate-core/src/lib.rs
// ============================================================================
// Module: Metric Gate Core
// Description: Canonical domain model and deterministic utility modules.
// Purpose: Provide the shared leaf layer consumed by adapters, plugins, and
//          the server orchestration crates.
// Dependencies: serde, serde_json, thiserror, time, rand, tracing
// ============================================================================

//! ## Overview
//! This crate holds the source-agnostic domain model ([`MetricPoint`]) and the
//! deterministic utilities every other Metric Gate crate builds on: timestamp
//! parsing, unit conversion, statistics, sample aggregation, float validation,
//! partial-result bookkeeping, and a small LRU cache. All math is performed
//! server-side and is never delegated to an LLM.
//! Invariants:
//! - Emitted metric values are finite; non-finite inputs are filtered with a
//!   warning at the boundary that observes them.
//! - Utilities are pure with respect to their inputs except where wall-clock
//!   time is explicitly documented.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod aggregation;
pub mod cache;
pub mod errors;
pub mod metrics;
pub mod partial;
pub mod statistics;
pub mod timestamps;
pub mod units;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregation::AggregationError;
pub use aggregation::AggregationStrategy;
pub use aggregation::MissingDataStrategy;
pub use aggregation::aggregate_samples;
pub use cache::Cache;
pub use errors::DomainErrorKind;
pub use metrics::DOMAIN_MODEL_VERSION;
pub use metrics::MetricPoint;
pub use metrics::UNDEFINED_DIMENSION;
pub use partial::FailureInfo;
pub use partial::FailureKind;
pub use partial::PartialResult;
pub use partial::SuccessRateError;
pub use statistics::AnomalyMethod;
pub use statistics::ConfidenceMethod;
pub use statistics::SampleStatistics;
pub use statistics::TrendDirection;
pub use statistics::TrendMethod;
pub use statistics::compute_confidence_interval;
pub use statistics::compute_statistics;
pub use statistics::detect_anomalies;
pub use statistics::detect_trend;
pub use timestamps::calculate_time_delta_ms;
pub use timestamps::parse_timestamp;
pub use timestamps::to_iso8601;
pub use timestamps::to_unix_timestamp;
pub use timestamps::to_unix_timestamp_ms;
pub use units::DataUnit;
pub use units::TimeUnit;
pub use units::auto_scale_data;
pub use units::auto_scale_time;
pub use units::convert_data;
pub use units::convert_time;
pub use validation::filter_valid_floats;
pub use validation::is_valid_float;
pub use validation::sanitize_float;
