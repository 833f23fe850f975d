// crates/metric-gate-plugins/src/es_logs.rs
// ============================================================================
// Module: Elasticsearch Logs Plugin
// Description: Extracts metrics from log documents returned by Elasticsearch.
// Purpose: Reference implementation for processing raw log data.
// Dependencies: metric-gate-contract, metric-gate-core, serde_json, time
// ============================================================================

//! ## Overview
//! Emits `log.count = 1` per document (useful for aggregation) and
//! `log.duration_ms` from the first duration-like field present. Dimensions
//! come from `level` (uppercased), `service`, and `host`, with ECS
//! dotted-name fallbacks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use metric_gate_contract::ExportedLabelValues;
use metric_gate_core::MetricPoint;
use metric_gate_core::is_valid_float;
use metric_gate_core::timestamps::parse_timestamp;
use serde_json::Value;
use time::OffsetDateTime;

use crate::GlossaryEntry;
use crate::Plugin;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// One observation per log document.
pub const METRIC_LOG_COUNT: &str = "log.count";
/// Duration extracted from the document, when present.
pub const METRIC_LOG_DURATION: &str = "log.duration_ms";

/// Duration fields checked in order.
const DURATION_FIELDS: [&str; 5] = ["duration", "duration_ms", "latency", "latency_ms", "took"];

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// Extractor for Elasticsearch log documents.
pub struct ElasticsearchLogsPlugin;

#[async_trait]
impl Plugin for ElasticsearchLogsPlugin {
    fn id(&self) -> &'static str {
        "elasticsearch-logs"
    }

    fn glossary(&self) -> BTreeMap<&'static str, GlossaryEntry> {
        let mut glossary = BTreeMap::new();
        glossary.insert(
            METRIC_LOG_COUNT,
            GlossaryEntry {
                description: "One observation per log document",
                unit: "count",
            },
        );
        glossary.insert(
            METRIC_LOG_DURATION,
            GlossaryEntry {
                description: "Duration reported by the log document",
                unit: "ms",
            },
        );
        glossary
    }

    fn kpis(&self) -> &'static [&'static str] {
        &[METRIC_LOG_COUNT, METRIC_LOG_DURATION]
    }

    async fn extract(
        &self,
        json_body: &Value,
        refs: &BTreeMap<String, String>,
        label_values: Option<&[ExportedLabelValues]>,
        os_filter: Option<&str>,
        run_type_filter: Option<&str>,
    ) -> Vec<MetricPoint> {
        let _ = (refs, label_values, os_filter, run_type_filter);
        let mut points = Vec::new();
        let Value::Object(document) = json_body else {
            return points;
        };

        let timestamp = document
            .get("@timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(OffsetDateTime::now_utc);

        let mut dims = BTreeMap::new();
        let level = document
            .get("level")
            .or_else(|| document.get("log.level"))
            .and_then(Value::as_str);
        if let Some(level) = level {
            dims.insert("level".to_string(), level.to_uppercase());
        }
        let service = document
            .get("service")
            .or_else(|| document.get("service.name"))
            .and_then(Value::as_str);
        if let Some(service) = service {
            dims.insert("service".to_string(), service.to_string());
        }
        let host =
            document.get("host").or_else(|| document.get("host.name")).and_then(Value::as_str);
        if let Some(host) = host {
            dims.insert("host".to_string(), host.to_string());
        }
        let dims = (!dims.is_empty()).then_some(dims);

        points.push(MetricPoint {
            metric_id: METRIC_LOG_COUNT.to_string(),
            timestamp,
            value: 1.0,
            unit: Some("count".to_string()),
            dimensions: dims.clone(),
            source: Some(self.id().to_string()),
        });

        let duration = DURATION_FIELDS
            .iter()
            .find_map(|field| document.get(*field).and_then(Value::as_f64));
        if let Some(duration) = duration {
            if is_valid_float(duration) {
                points.push(MetricPoint {
                    metric_id: METRIC_LOG_DURATION.to_string(),
                    timestamp,
                    value: duration,
                    unit: Some("ms".to_string()),
                    dimensions: dims,
                    source: Some(self.id().to_string()),
                });
            }
        }

        points
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
