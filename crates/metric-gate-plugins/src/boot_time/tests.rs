// crates/metric-gate-plugins/src/boot_time/tests.rs
// ============================================================================
// Module: Boot-Time Plugin Tests
// Description: Unit tests for label-value and dataset extraction paths.
// Purpose: Validate phase totals, dimension sentinels, filters, and shapes.
// Dependencies: metric-gate-plugins, metric-gate-contract, serde_json, tokio
// ============================================================================

//! ## Overview
//! Covers the reference scenarios: RHIVOS local extraction with four points,
//! label-value total calculation with statistic grouping, multi-sample
//! statistics, v4/v6 shapes, run-type and OS filtering, the `undefined`
//! dimension sentinel, and non-finite value rejection.

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

use metric_gate_contract::ExportedLabelValues;
use metric_gate_contract::LabelValue;
use metric_gate_core::MetricPoint;
use serde_json::Value;
use serde_json::json;

use super::BootTimePlugin;
use super::METRIC_INITRD;
use super::METRIC_KERNEL;
use super::METRIC_KERNEL_PRE_TIMER;
use super::METRIC_SWITCHROOT;
use super::METRIC_SYSTEM_INIT;
use super::METRIC_TOTAL;
use super::METRIC_TS_FIRST_SERVICE;
use super::METRIC_TS_NETWORK_ONLINE;
use super::match_label_to_metric;
use super::normalize_label_name;
use super::scale_microseconds;
use crate::Plugin;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Runs extraction with no label values or filters.
async fn extract_body(body: &Value) -> Vec<MetricPoint> {
    BootTimePlugin.extract(body, &BTreeMap::new(), None, None, None).await
}

/// Builds a label value with a JSON value payload.
fn label(name: &str, value: Value) -> LabelValue {
    LabelValue {
        id: None,
        name: name.to_string(),
        schema_uri: None,
        value,
    }
}

/// Finds a point by metric id.
fn find_point<'a>(points: &'a [MetricPoint], metric_id: &str) -> &'a MetricPoint {
    points
        .iter()
        .find(|point| point.metric_id == metric_id)
        .unwrap_or_else(|| panic!("missing point {metric_id}"))
}

// ============================================================================
// SECTION: RHIVOS Local Extraction
// ============================================================================

#[tokio::test]
async fn extracts_rhivos_local_fixture() {
    let body = json!({
        "boot_metrics": {
            "total_boot_time_ms": 12_500,
            "phases": {"kernel": 3_000, "initrd": 1_500, "userspace": 5_500},
        },
        "system_info": {"os_id": "rhel-9.2", "mode": "standard"},
        "timestamp": "2025-09-22T10:30:00Z",
    });
    let points = extract_body(&body).await;
    assert_eq!(points.len(), 4);
    assert_eq!(find_point(&points, METRIC_TOTAL).value, 12_500.0);
    assert_eq!(find_point(&points, METRIC_KERNEL).value, 3_000.0);
    assert_eq!(find_point(&points, METRIC_INITRD).value, 1_500.0);
    assert_eq!(find_point(&points, METRIC_SYSTEM_INIT).value, 5_500.0);
    for point in &points {
        let dims = point.dimensions.as_ref().expect("dimensions");
        assert_eq!(dims.get("os_id").map(String::as_str), Some("rhel-9.2"));
        assert_eq!(dims.get("mode").map(String::as_str), Some("standard"));
        assert_eq!(point.unit.as_deref(), Some("ms"));
        assert_eq!(point.source.as_deref(), Some("boot-time-verbose"));
    }
    let timestamp = metric_gate_core::to_iso8601(find_point(&points, METRIC_TOTAL).timestamp);
    assert_eq!(timestamp, "2025-09-22T10:30:00Z");
}

#[tokio::test]
async fn os_filter_short_circuits_non_matching_dataset() {
    let body = json!({
        "boot_metrics": {"total_boot_time_ms": 12_500},
        "system_info": {"os_id": "autosd"},
    });
    let points =
        BootTimePlugin.extract(&body, &BTreeMap::new(), None, Some("rhel"), None).await;
    assert!(points.is_empty());
}

// ============================================================================
// SECTION: Label-Value Extraction
// ============================================================================

#[tokio::test]
async fn calculates_total_from_phase_labels() {
    let items = vec![ExportedLabelValues {
        values: vec![
            label("BOOT0 - SystemInit Duration Average ms", json!(5_000)),
            label("BOOT2 - Kernel Post-Timer Duration Average ms", json!(3_000)),
            label("BOOT3 - Initrd Duration Average ms", json!(2_000)),
            label("BOOT4 - Switchroot Duration Average ms", json!(1_000)),
        ],
        ..ExportedLabelValues::default()
    }];
    let points = BootTimePlugin.extract_from_label_values(&items, None, None);
    assert_eq!(points.len(), 5);
    let total = find_point(&points, METRIC_TOTAL);
    assert_eq!(total.value, 11_000.0);
    let dims = total.dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("statistic_type").map(String::as_str), Some("average"));
    assert_eq!(find_point(&points, METRIC_SYSTEM_INIT).value, 5_000.0);
    assert_eq!(find_point(&points, METRIC_KERNEL).value, 3_000.0);
    assert_eq!(find_point(&points, METRIC_INITRD).value, 2_000.0);
    assert_eq!(find_point(&points, METRIC_SWITCHROOT).value, 1_000.0);
}

#[tokio::test]
async fn missing_phase_values_count_as_zero_and_are_recorded() {
    let items = vec![ExportedLabelValues {
        values: vec![
            label("BOOT2 - Kernel Post-Timer Duration Average ms", json!(3_000)),
            label("BOOT3 - Initrd Duration Average ms", json!("Need to collect")),
        ],
        ..ExportedLabelValues::default()
    }];
    let points = BootTimePlugin.extract_from_label_values(&items, None, None);
    let total = find_point(&points, METRIC_TOTAL);
    assert_eq!(total.value, 3_000.0);
    let dims = total.dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("missing_phases").map(String::as_str), Some("initrd"));
}

#[tokio::test]
async fn statistic_groups_are_summed_separately() {
    let items = vec![ExportedLabelValues {
        values: vec![
            label("BOOT2 - Kernel Post-Timer Duration Average ms", json!(3_000)),
            label("BOOT3 - Initrd Duration Average ms", json!(2_000)),
            label("BOOT2 - Kernel Post-Timer Duration Confidence ms", json!(150)),
            label("BOOT3 - Initrd Duration Confidence ms", json!(100)),
        ],
        ..ExportedLabelValues::default()
    }];
    let points = BootTimePlugin.extract_from_label_values(&items, None, None);
    let totals: Vec<&MetricPoint> =
        points.iter().filter(|point| point.metric_id == METRIC_TOTAL).collect();
    assert_eq!(totals.len(), 2);
    let by_stat: BTreeMap<&str, f64> = totals
        .iter()
        .map(|point| {
            let stat = point
                .dimensions
                .as_ref()
                .and_then(|dims| dims.get("statistic_type"))
                .map_or("unknown", String::as_str);
            (stat, point.value)
        })
        .collect();
    assert_eq!(by_stat.get("average"), Some(&5_000.0));
    assert_eq!(by_stat.get("confidence"), Some(&250.0));
}

#[tokio::test]
async fn absent_matrix_dimensions_use_the_sentinel() {
    let items = vec![ExportedLabelValues {
        values: vec![label("BOOT3 - Initrd Duration Average ms", json!(2_000))],
        ..ExportedLabelValues::default()
    }];
    let points = BootTimePlugin.extract_from_label_values(&items, None, None);
    let dims = find_point(&points, METRIC_INITRD).dimensions.as_ref().expect("dimensions");
    for key in ["os_id", "mode", "target", "release", "image_name", "samples", "user", "build"] {
        assert_eq!(dims.get(key).map(String::as_str), Some("undefined"), "dimension {key}");
    }
}

#[tokio::test]
async fn dimension_labels_populate_the_matrix() {
    let items = vec![ExportedLabelValues {
        values: vec![
            label("BOOT3 - Initrd Duration Average ms", json!(2_000)),
            label("RHIVOS OS ID", json!("AutoSD")),
            label("RHIVOS Mode", json!("Package")),
            label("RHIVOS Target", json!("QEMU")),
            label("Number of Samples", json!("25")),
            label("User", json!("perf-bot")),
        ],
        start: Some("2025-10-01T00:00:00Z".to_string()),
        stop: Some("2025-10-01T01:00:00Z".to_string()),
        ..ExportedLabelValues::default()
    }];
    let points = BootTimePlugin.extract_from_label_values(&items, None, None);
    let point = find_point(&points, METRIC_INITRD);
    let dims = point.dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("os_id").map(String::as_str), Some("autosd"));
    assert_eq!(dims.get("mode").map(String::as_str), Some("package"));
    assert_eq!(dims.get("target").map(String::as_str), Some("qemu"));
    assert_eq!(dims.get("samples").map(String::as_str), Some("25"));
    assert_eq!(dims.get("user").map(String::as_str), Some("perf-bot"));
    // The stop timestamp wins over start.
    assert_eq!(metric_gate_core::to_iso8601(point.timestamp), "2025-10-01T01:00:00Z");
}

// ============================================================================
// SECTION: Label-Value Filtering
// ============================================================================

/// Item with a `Run type` label and one phase value.
fn run_type_item(run_type: &str) -> ExportedLabelValues {
    ExportedLabelValues {
        values: vec![
            label("Run type", json!(run_type)),
            label("BOOT3 - Initrd Duration Average ms", json!(2_000)),
        ],
        ..ExportedLabelValues::default()
    }
}

#[tokio::test]
async fn run_type_label_filters_exactly() {
    let items = vec![run_type_item("Nightly"), run_type_item("ci")];
    let points = BootTimePlugin.extract_from_label_values(&items, Some("nightly"), None);
    // One matching item: one phase plus one synthetic total.
    assert_eq!(points.len(), 2);
}

#[tokio::test]
async fn legacy_test_description_filters_by_substring() {
    let items = vec![
        ExportedLabelValues {
            values: vec![
                label("Test Description", json!("RHIVOS nightly boot measurement")),
                label("BOOT3 - Initrd Duration Average ms", json!(2_000)),
            ],
            ..ExportedLabelValues::default()
        },
        ExportedLabelValues {
            values: vec![
                label("Test Description", json!("ad-hoc experiment")),
                label("BOOT3 - Initrd Duration Average ms", json!(9_000)),
            ],
            ..ExportedLabelValues::default()
        },
    ];
    let points = BootTimePlugin.extract_from_label_values(&items, Some("nightly"), None);
    assert_eq!(points.len(), 2);
    assert_eq!(find_point(&points, METRIC_INITRD).value, 2_000.0);
}

#[tokio::test]
async fn items_without_run_type_labels_are_not_filtered() {
    let items = vec![ExportedLabelValues {
        values: vec![label("BOOT3 - Initrd Duration Average ms", json!(2_000))],
        ..ExportedLabelValues::default()
    }];
    let points = BootTimePlugin.extract_from_label_values(&items, Some("nightly"), None);
    assert_eq!(points.len(), 2);
}

#[tokio::test]
async fn os_label_filters_case_insensitively() {
    let items = vec![
        ExportedLabelValues {
            values: vec![
                label("RHIVOS OS ID", json!("RHEL")),
                label("BOOT3 - Initrd Duration Average ms", json!(2_000)),
            ],
            ..ExportedLabelValues::default()
        },
        ExportedLabelValues {
            values: vec![
                label("RHIVOS OS ID", json!("autosd")),
                label("BOOT3 - Initrd Duration Average ms", json!(5_000)),
            ],
            ..ExportedLabelValues::default()
        },
    ];
    let points = BootTimePlugin.extract_from_label_values(&items, None, Some("rhel"));
    assert_eq!(points.len(), 2);
    assert_eq!(find_point(&points, METRIC_INITRD).value, 2_000.0);
}

// ============================================================================
// SECTION: Multi-Sample Extraction
// ============================================================================

#[tokio::test]
async fn multi_sample_emits_statistics_suite() {
    let body = json!({
        "boot_time": [1_200.0, 1_250.0, 1_300.0, 1_350.0, 1_400.0],
        "rhivos_config": {"os_id": "rhel", "image_target": "qemu"},
    });
    let points = extract_body(&body).await;
    let ids: Vec<&str> = points.iter().map(|point| point.metric_id.as_str()).collect();
    for expected in [
        "boot.time.total_ms.mean",
        "boot.time.total_ms.median",
        "boot.time.total_ms.min",
        "boot.time.total_ms.max",
        "boot.time.total_ms.p95",
        "boot.time.total_ms.p99",
        "boot.time.total_ms.std_dev",
        "boot.time.total_ms.cv",
        METRIC_TOTAL,
    ] {
        assert!(ids.contains(&expected), "missing {expected}");
    }
    assert_eq!(find_point(&points, METRIC_TOTAL).value, 1_300.0);
    let dims = find_point(&points, METRIC_TOTAL).dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("os_id").map(String::as_str), Some("rhel"));
    assert_eq!(dims.get("mode").map(String::as_str), Some("qemu"));
}

#[tokio::test]
async fn single_sample_array_omits_std_dev_and_cv() {
    let body = json!({"boot_time": [1_200.0]});
    let points = extract_body(&body).await;
    let ids: Vec<&str> = points.iter().map(|point| point.metric_id.as_str()).collect();
    assert!(!ids.contains(&"boot.time.total_ms.std_dev"));
    assert!(!ids.contains(&"boot.time.total_ms.cv"));
    assert!(ids.contains(&METRIC_TOTAL));
}

// ============================================================================
// SECTION: Horreum Shape Extraction
// ============================================================================

#[tokio::test]
async fn extracts_horreum_v4_shape() {
    let body = json!({
        "$schema": "urn:boot-time-verbose:04",
        "system_config": {"os_id": "rhel", "mode": "package", "image_target": "intel-nuc"},
        "test_results": [{
            "start_time": "2025-10-01T00:00:00Z",
            "end_time": "2025-10-01T00:01:00Z",
            "satime": {"total": 9_000, "kernel": 2_000, "initrd": 1_000, "userspace": 6_000},
            "clktick": {"time_init_ts": 150},
            "timing_details": [
                {"name": "sysinit.target", "activated": 800},
                {"name": "NetworkManager.service", "activated": 2_500},
            ],
        }],
    });
    let points = extract_body(&body).await;
    assert_eq!(find_point(&points, METRIC_TOTAL).value, 9_000.0);
    assert_eq!(find_point(&points, METRIC_KERNEL_PRE_TIMER).value, 150.0);
    assert_eq!(find_point(&points, METRIC_TS_FIRST_SERVICE).value, 800.0);
    assert_eq!(find_point(&points, METRIC_TS_NETWORK_ONLINE).value, 2_500.0);
    let dims = find_point(&points, METRIC_TOTAL).dimensions.as_ref().expect("dimensions");
    assert_eq!(dims.get("target").map(String::as_str), Some("intel-nuc"));
}

#[tokio::test]
async fn extracts_horreum_v6_shape_with_microsecond_scaling() {
    let body = json!({
        "$schema": "urn:boot-time-verbose:06",
        "rhivos_config": {"os_id": "autosd", "mode": "ostree", "image_target": "orin"},
        "boot_time": [{
            "boot_logs": [
                {"activated": 8_400_000.0},
                {"time": 7_100_000.0},
            ],
        }],
    });
    let points = extract_body(&body).await;
    // Values above 1e6 are scaled down by 1e6.
    assert_eq!(find_point(&points, METRIC_TOTAL).value, 8.4);
}

#[tokio::test]
async fn v6_prefers_timestamp_derived_total() {
    let body = json!({
        "start_time": "2025-10-01T00:00:00Z",
        "end_time": "2025-10-01T00:00:10Z",
        "boot_time": [{"boot_logs": [{"activated": 99.0}]}],
    });
    let points = extract_body(&body).await;
    assert_eq!(find_point(&points, METRIC_TOTAL).value, 10_000.0);
}

#[tokio::test]
async fn unrecognized_bodies_yield_no_points() {
    let points = extract_body(&json!({"unrelated": true})).await;
    assert!(points.is_empty());
    let points = extract_body(&json!([1, 2, 3])).await;
    assert!(points.is_empty());
}

// ============================================================================
// SECTION: Matching Helpers
// ============================================================================

#[test]
fn normalizes_label_names() {
    assert_eq!(
        normalize_label_name("BOOT2 - Kernel  Post-Timer   Duration"),
        "boot2 kernel post timer duration"
    );
}

#[test]
fn matches_canonical_phase_labels() {
    assert_eq!(
        match_label_to_metric("BOOT1 - Kernel Pre-Timer Duration Average ms"),
        Some(METRIC_KERNEL_PRE_TIMER)
    );
    assert_eq!(
        match_label_to_metric("BOOT2 - Kernel Post-Timer Duration Average ms"),
        Some(METRIC_KERNEL)
    );
    assert_eq!(
        match_label_to_metric("BOOT3 - Initrd Duration Average ms"),
        Some(METRIC_INITRD)
    );
    assert_eq!(
        match_label_to_metric("BOOT4 - Switchroot Duration Average ms"),
        Some(METRIC_SWITCHROOT)
    );
    assert_eq!(
        match_label_to_metric("BOOT0 - SystemInit Duration Average ms"),
        Some(METRIC_SYSTEM_INIT)
    );
    assert_eq!(match_label_to_metric("boot_time"), Some(METRIC_TOTAL));
    assert_eq!(match_label_to_metric("Completely Unrelated"), None);
}

#[test]
fn scale_microseconds_only_rescales_large_values() {
    assert_eq!(scale_microseconds(8_400_000.0), 8.4);
    assert_eq!(scale_microseconds(950.0), 950.0);
}

// ============================================================================
// SECTION: Value Hygiene
// ============================================================================

#[tokio::test]
async fn non_finite_values_are_dropped() {
    let items = vec![ExportedLabelValues {
        values: vec![label("BOOT3 - Initrd Duration Average ms", json!("inf"))],
        ..ExportedLabelValues::default()
    }];
    // "inf" parses to infinity, which must be rejected: the phase counts as
    // present-but-non-finite, so only a total of 0 could be emitted and the
    // infinite phase itself never appears.
    let points = BootTimePlugin.extract_from_label_values(&items, None, None);
    assert!(points.iter().all(|point| point.value.is_finite()));
}
