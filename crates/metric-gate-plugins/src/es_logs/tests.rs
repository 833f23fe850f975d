// crates/metric-gate-plugins/src/es_logs/tests.rs
// ============================================================================
// Module: Elasticsearch Logs Plugin Tests
// Description: Unit tests for per-document log metric extraction.
// Purpose: Validate count/duration emission and dimension fallbacks.
// Dependencies: metric-gate-plugins, serde_json, tokio
// ============================================================================

//! ## Overview
//! Validates the per-document `log.count`, duration-field precedence, ECS
//! dotted-name fallbacks, and level uppercasing.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp,
    reason = "Test-only assertions use unwrap/expect and exact float checks."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use metric_gate_core::MetricPoint;
use serde_json::Value;
use serde_json::json;

use super::ElasticsearchLogsPlugin;
use super::METRIC_LOG_COUNT;
use super::METRIC_LOG_DURATION;
use crate::Plugin;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Runs extraction over a single document.
async fn extract(document: &Value) -> Vec<MetricPoint> {
    ElasticsearchLogsPlugin.extract(document, &BTreeMap::new(), None, None, None).await
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn every_document_counts_once() {
    let points = extract(&json!({
        "@timestamp": "2025-10-15T12:00:00Z",
        "level": "info",
        "service": "api-gateway",
        "host": "node-1",
    }))
    .await;
    assert_eq!(points.len(), 1);
    let count = &points[0];
    assert_eq!(count.metric_id, METRIC_LOG_COUNT);
    assert_eq!(count.value, 1.0);
    let dims = count.dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("level").map(String::as_str), Some("INFO"));
    assert_eq!(dims.get("service").map(String::as_str), Some("api-gateway"));
    assert_eq!(dims.get("host").map(String::as_str), Some("node-1"));
}

#[tokio::test]
async fn duration_uses_the_first_present_field() {
    let points = extract(&json!({"latency": 42.0, "took": 99.0})).await;
    let duration = points
        .iter()
        .find(|point| point.metric_id == METRIC_LOG_DURATION)
        .expect("duration point");
    assert_eq!(duration.value, 42.0);
}

#[tokio::test]
async fn ecs_dotted_names_are_fallbacks() {
    let points = extract(&json!({
        "log.level": "error",
        "service.name": "ingest",
        "host.name": "node-2",
    }))
    .await;
    let dims = points[0].dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("level").map(String::as_str), Some("ERROR"));
    assert_eq!(dims.get("service").map(String::as_str), Some("ingest"));
    assert_eq!(dims.get("host").map(String::as_str), Some("node-2"));
}

#[tokio::test]
async fn non_object_bodies_yield_no_points() {
    assert!(extract(&json!("text")).await.is_empty());
    assert!(extract(&json!([1, 2])).await.is_empty());
}

#[tokio::test]
async fn documents_without_duration_emit_only_count() {
    let points = extract(&json!({"level": "warn"})).await;
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].metric_id, METRIC_LOG_COUNT);
}
