// crates/metric-gate-plugins/src/boot_time.rs
// ============================================================================
// Module: Boot-Time Plugin
// Description: Extracts boot-time KPIs from verbose boot-time datasets.
// Purpose: Turn label values or raw dataset JSON into canonical phase,
//          total, and timestamp metrics with 3D matrix dimensions.
// Dependencies: metric-gate-contract, metric-gate-core, serde_json, time
// ============================================================================

//! ## Overview
//! The `boot-time-verbose` plugin understands several dataset generations:
//! pre-aggregated label values (preferred), multi-sample `boot_time` arrays,
//! the RHIVOS local collector shape, the Horreum v4 `test_results` shape, and
//! the v6 `boot_logs` shape. Total boot time on the label path is calculated
//! by summing recognized phases per statistic group; missing or non-numeric
//! phases count as zero and are recorded in a `missing_phases` dimension.
//! Dimensions for the `(target, mode, os_id)` matrix are always emitted,
//! filled with `undefined` when a key is absent, so cross-run grouping keeps
//! a stable key shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use metric_gate_contract::ExportedLabelValues;
use metric_gate_contract::LabelValue;
use metric_gate_core::MetricPoint;
use metric_gate_core::UNDEFINED_DIMENSION;
use metric_gate_core::compute_statistics;
use metric_gate_core::detect_anomalies;
use metric_gate_core::is_valid_float;
use metric_gate_core::statistics::AnomalyMethod;
use metric_gate_core::timestamps::parse_iso8601;
use metric_gate_core::timestamps::parse_timestamp;
use serde_json::Value;
use time::OffsetDateTime;

use crate::GlossaryEntry;
use crate::Plugin;

// ============================================================================
// SECTION: Metric Identifiers
// ============================================================================

/// Primary KPI: total boot time.
pub const METRIC_TOTAL: &str = "boot.time.total_ms";
/// Kernel initialization before the timer subsystem.
pub const METRIC_KERNEL_PRE_TIMER: &str = "boot.phase.kernel_pre_timer_ms";
/// Kernel initialization after the timer subsystem.
pub const METRIC_KERNEL: &str = "boot.phase.kernel_ms";
/// Initial RAM disk execution.
pub const METRIC_INITRD: &str = "boot.phase.initrd_ms";
/// Transition from initrd to the actual root filesystem.
pub const METRIC_SWITCHROOT: &str = "boot.phase.switchroot_ms";
/// System/userspace initialization.
pub const METRIC_SYSTEM_INIT: &str = "boot.phase.system_init_ms";
/// First critical service active.
pub const METRIC_TS_EARLY_SERVICE: &str = "boot.timestamp.early_service_ms";
/// Kernel module loading begins.
pub const METRIC_TS_START_KMOD_LOAD: &str = "boot.timestamp.start_kmod_load_ms";
/// First systemd service activated.
pub const METRIC_TS_FIRST_SERVICE: &str = "boot.timestamp.first_service_ms";
/// Network connectivity established.
pub const METRIC_TS_NETWORK_ONLINE: &str = "boot.timestamp.network_online_ms";

/// IQR threshold used for the multi-sample anomaly log.
const ANOMALY_IQR_THRESHOLD: f64 = 1.5;

/// Boundary above which v6 boot-log values are treated as microseconds.
const MICROSECOND_SCALE_BOUNDARY: f64 = 1_000_000.0;

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// Extractor for `boot-time-verbose` datasets and label values.
///
/// # Invariants
/// - Emitted values are finite; non-finite values are dropped with a warning.
/// - The extractor is conservative and only emits metrics it confidently
///   recognizes.
pub struct BootTimePlugin;

#[async_trait]
impl Plugin for BootTimePlugin {
    fn id(&self) -> &'static str {
        "boot-time-verbose"
    }

    fn glossary(&self) -> BTreeMap<&'static str, GlossaryEntry> {
        let mut glossary = BTreeMap::new();
        glossary.insert(
            METRIC_TOTAL,
            GlossaryEntry {
                description: "Total boot time (mean for multi-sample)",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_KERNEL_PRE_TIMER,
            GlossaryEntry {
                description: "Kernel initialization before timer subsystem",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_KERNEL,
            GlossaryEntry {
                description: "Kernel initialization after timer subsystem",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_INITRD,
            GlossaryEntry {
                description: "Initial RAM disk execution duration",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_SWITCHROOT,
            GlossaryEntry {
                description: "Transition from initrd to actual root filesystem",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_SYSTEM_INIT,
            GlossaryEntry {
                description: "System/userspace initialization (systemd)",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_TS_EARLY_SERVICE,
            GlossaryEntry {
                description: "First critical service becomes active",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_TS_START_KMOD_LOAD,
            GlossaryEntry {
                description: "Kernel module loading begins",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_TS_FIRST_SERVICE,
            GlossaryEntry {
                description: "First systemd service activated",
                unit: "ms",
            },
        );
        glossary.insert(
            METRIC_TS_NETWORK_ONLINE,
            GlossaryEntry {
                description: "Network connectivity established",
                unit: "ms",
            },
        );
        glossary
    }

    fn kpis(&self) -> &'static [&'static str] {
        &[
            METRIC_TOTAL,
            METRIC_KERNEL_PRE_TIMER,
            METRIC_KERNEL,
            METRIC_INITRD,
            METRIC_SWITCHROOT,
            METRIC_SYSTEM_INIT,
            METRIC_TS_EARLY_SERVICE,
            METRIC_TS_START_KMOD_LOAD,
            METRIC_TS_FIRST_SERVICE,
            METRIC_TS_NETWORK_ONLINE,
        ]
    }

    async fn extract(
        &self,
        json_body: &Value,
        refs: &BTreeMap<String, String>,
        label_values: Option<&[ExportedLabelValues]>,
        os_filter: Option<&str>,
        run_type_filter: Option<&str>,
    ) -> Vec<MetricPoint> {
        let _ = refs;
        tracing::debug!(
            has_label_values = label_values.is_some_and(|items| !items.is_empty()),
            os_filter,
            run_type_filter,
            "boot_time.extract.start"
        );

        if let Some(items) = label_values {
            if !items.is_empty() {
                let points = self.extract_from_label_values(items, run_type_filter, os_filter);
                if points.is_empty() {
                    tracing::warn!("boot_time.extract.label_values_empty");
                } else {
                    tracing::debug!(
                        metric_count = points.len(),
                        "boot_time.extract.label_values_success"
                    );
                    return points;
                }
            }
        }

        let Value::Object(_) = json_body else {
            tracing::warn!("boot_time.extract.dataset_not_object");
            return Vec::new();
        };

        if let Some(points) = extract_multi_sample(json_body, os_filter) {
            return points;
        }
        let points = extract_rhivos_local(json_body, os_filter);
        if !points.is_empty() {
            return points;
        }
        let points = extract_horreum_verbose(json_body, os_filter);
        if points.is_empty() {
            tracing::warn!("boot_time.extract.no_metrics_extracted");
        }
        points
    }
}

// ============================================================================
// SECTION: Label-Value Path
// ============================================================================

/// Dimension values shared by every metric of one label-value item.
#[derive(Debug, Default)]
struct ItemDimensions {
    /// Operating system identifier, lowercased.
    os_id: Option<String>,
    /// Image mode, lowercased.
    mode: Option<String>,
    /// Hardware target, lowercased.
    target: Option<String>,
    /// Release string.
    release: Option<String>,
    /// Image name.
    image_name: Option<String>,
    /// Sample count.
    samples: Option<i64>,
    /// Submitting user.
    user: Option<String>,
    /// Build identifier.
    build: Option<String>,
}

impl BootTimePlugin {
    /// Extracts KPIs from label-value bundles (the preferred path).
    ///
    /// Total boot time is calculated by summing recognized phases within each
    /// statistic group; it is never taken from a label directly. Missing or
    /// non-numeric phases count as zero and land in `missing_phases`.
    #[must_use]
    pub fn extract_from_label_values(
        &self,
        items: &[ExportedLabelValues],
        run_type_filter: Option<&str>,
        os_filter: Option<&str>,
    ) -> Vec<MetricPoint> {
        let mut points = Vec::new();
        let mut filtered_by_run_type = 0_usize;
        let mut filtered_by_os = 0_usize;

        for item in items {
            if let Some(filter) = run_type_filter {
                if !item_matches_run_type(item, filter) {
                    filtered_by_run_type += 1;
                    continue;
                }
            }
            if let Some(filter) = os_filter {
                if !item_matches_os(item, filter) {
                    filtered_by_os += 1;
                    continue;
                }
            }

            let dims = collect_item_dimensions(&item.values);
            let timestamp = item
                .stop
                .as_deref()
                .or(item.start.as_deref())
                .and_then(parse_iso8601)
                .unwrap_or_else(OffsetDateTime::now_utc);

            // Group recognized phases by statistic type; collect KPI
            // timestamps separately.
            let mut phases_by_stat: BTreeMap<String, BTreeMap<&'static str, f64>> =
                BTreeMap::new();
            let mut missing_by_stat: BTreeMap<String, Vec<&'static str>> = BTreeMap::new();
            let mut kpi_data: Vec<(&'static str, f64, String)> = Vec::new();

            for label in &item.values {
                let Some(metric_id) = match_label_to_metric(&label.name) else {
                    tracing::debug!(label_name = %label.name, "boot_time.unrecognized_label");
                    continue;
                };
                let statistic_type =
                    extract_statistic_type(&label.name).unwrap_or("unknown").to_string();
                let numeric = numeric_label_value(&label.value);
                if numeric.is_none() {
                    tracing::debug!(
                        label_name = %label.name,
                        metric_id,
                        "boot_time.skipped_label_value"
                    );
                }

                if metric_id.contains("phase") {
                    let group = phases_by_stat.entry(statistic_type.clone()).or_default();
                    match numeric {
                        Some(value) => {
                            group.insert(metric_id, value);
                        }
                        None => {
                            // Missing phases count as zero in the total.
                            group.insert(metric_id, 0.0);
                            missing_by_stat.entry(statistic_type).or_default().push(metric_id);
                        }
                    }
                } else if metric_id.contains("timestamp") {
                    if let Some(value) = numeric {
                        kpi_data.push((metric_id, value, statistic_type));
                    }
                }
            }

            for (stat_type, phases) in &phases_by_stat {
                let missing = missing_by_stat.get(stat_type).map_or(&[] as &[_], Vec::as_slice);
                let dimensions = build_dimensions(&dims, stat_type, missing);
                for (phase_metric_id, phase_value) in phases {
                    push_point(
                        &mut points,
                        phase_metric_id,
                        timestamp,
                        *phase_value,
                        Some(dimensions.clone()),
                    );
                }
                let total: f64 = phases.values().sum();
                push_point(&mut points, METRIC_TOTAL, timestamp, total, Some(dimensions));
            }

            for (kpi_metric_id, kpi_value, stat_type) in kpi_data {
                let dimensions = build_dimensions(&dims, &stat_type, &[]);
                push_point(&mut points, kpi_metric_id, timestamp, kpi_value, Some(dimensions));
            }
        }

        tracing::debug!(
            items = items.len(),
            filtered_by_run_type,
            filtered_by_os,
            metrics_extracted = points.len(),
            "boot_time.extract_from_label_values.complete"
        );
        points
    }
}

/// Checks an item against the run-type filter.
///
/// A `Run type` label matches exactly (case-insensitive). Legacy data lacks
/// that label and falls back to a substring match on `Test Description`;
/// this fallback is removable once upstream data carries `Run type`
/// everywhere. Items carrying neither label are not filtered.
fn item_matches_run_type(item: &ExportedLabelValues, filter: &str) -> bool {
    let run_type = find_label_str(&item.values, "Run type");
    if let Some(value) = run_type {
        return value.eq_ignore_ascii_case(filter);
    }
    let description = find_label_str(&item.values, "Test Description");
    if let Some(value) = description {
        return value.to_lowercase().contains(&filter.to_lowercase());
    }
    true
}

/// Checks an item against the OS filter via the `RHIVOS OS ID` label.
///
/// Items without the label are not filtered.
fn item_matches_os(item: &ExportedLabelValues, filter: &str) -> bool {
    find_label_str(&item.values, "RHIVOS OS ID")
        .is_none_or(|value| value.eq_ignore_ascii_case(filter))
}

/// Finds the string value of a label by exact name.
fn find_label_str<'a>(values: &'a [LabelValue], name: &str) -> Option<&'a str> {
    values.iter().find(|label| label.name == name).and_then(|label| label.value.as_str())
}

/// Collects dimension and metadata values from an item's labels.
fn collect_item_dimensions(values: &[LabelValue]) -> ItemDimensions {
    let mut dims = ItemDimensions::default();
    for label in values {
        match label.name.as_str() {
            "RHIVOS OS ID" => {
                dims.os_id = label.value.as_str().map(str::to_lowercase);
            }
            "RHIVOS Mode" => {
                dims.mode = label.value.as_str().map(str::to_lowercase);
            }
            "RHIVOS Target" => {
                dims.target = label.value.as_str().map(str::to_lowercase);
            }
            "RHIVOS Release" => {
                dims.release = label.value.as_str().map(ToString::to_string);
            }
            "RHIVOS image name" => {
                dims.image_name = label.value.as_str().map(ToString::to_string);
            }
            "Number of Samples" => {
                dims.samples = label
                    .value
                    .as_i64()
                    .or_else(|| label.value.as_str().and_then(|text| text.parse().ok()));
            }
            "User" => {
                dims.user = label.value.as_str().map(ToString::to_string);
            }
            "RHIVOS Build" => {
                dims.build = label.value.as_str().map(ToString::to_string);
            }
            _ => {}
        }
    }
    dims
}

/// Builds the dimension map for one statistic group.
///
/// The 3D matrix keys and metadata fields are always present, filled with
/// the `undefined` sentinel when absent, so grouping keys stay stable.
fn build_dimensions(
    dims: &ItemDimensions,
    stat_type: &str,
    missing_phases: &[&'static str],
) -> BTreeMap<String, String> {
    let mut dimensions = BTreeMap::new();
    if stat_type != "unknown" {
        dimensions.insert("statistic_type".to_string(), stat_type.to_string());
    }
    let undefined = || UNDEFINED_DIMENSION.to_string();
    dimensions.insert("os_id".to_string(), dims.os_id.clone().unwrap_or_else(undefined));
    dimensions.insert("mode".to_string(), dims.mode.clone().unwrap_or_else(undefined));
    dimensions.insert("target".to_string(), dims.target.clone().unwrap_or_else(undefined));
    dimensions.insert("release".to_string(), dims.release.clone().unwrap_or_else(undefined));
    dimensions
        .insert("image_name".to_string(), dims.image_name.clone().unwrap_or_else(undefined));
    dimensions.insert(
        "samples".to_string(),
        dims.samples.map_or_else(undefined, |samples| samples.to_string()),
    );
    dimensions.insert("user".to_string(), dims.user.clone().unwrap_or_else(undefined));
    dimensions.insert("build".to_string(), dims.build.clone().unwrap_or_else(undefined));
    if !missing_phases.is_empty() {
        let names: Vec<&str> = missing_phases
            .iter()
            .map(|metric_id| {
                metric_id.rsplit('.').next().unwrap_or(metric_id).trim_end_matches("_ms")
            })
            .collect();
        dimensions.insert("missing_phases".to_string(), names.join(","));
    }
    dimensions
}

/// Coerces a label value to a finite-or-not number.
fn numeric_label_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ============================================================================
// SECTION: Flexible Label Matching
// ============================================================================

/// Normalizes a label name: lowercase, hyphens to spaces, collapsed spaces.
fn normalize_label_name(name: &str) -> String {
    name.to_lowercase().replace('-', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true when a label name indicates a duration measurement.
fn is_duration(name: &str) -> bool {
    let norm = normalize_label_name(name);
    let indicators = ["duration", "time", "ms", "latency", "delay"];
    indicators.iter().any(|word| norm.contains(word)) && !norm.contains("timestamp")
}

/// Returns true when a label name indicates a timestamp measurement.
fn is_timestamp(name: &str) -> bool {
    let norm = normalize_label_name(name);
    norm.contains("timestamp") || norm.contains("ts")
}

/// Extracts the statistic discriminator from a label name.
fn extract_statistic_type(name: &str) -> Option<&'static str> {
    let norm = normalize_label_name(name);
    if norm.contains("average") {
        return Some("average");
    }
    if norm.contains("confidence") {
        return Some("confidence");
    }
    None
}

/// Matches a label name to a canonical metric id by flexible keywords.
///
/// This table is the canonical matching rule; any expansion is a
/// specification change, not a tweak.
fn match_label_to_metric(name: &str) -> Option<&'static str> {
    let norm = normalize_label_name(name);

    if (norm.contains("boot") || name.starts_with("BOOT")) && is_duration(name) {
        if norm.contains("kernel") && (norm.contains("pre") || name.contains('1')) {
            return Some(METRIC_KERNEL_PRE_TIMER);
        }
        if norm.contains("kernel") && (norm.contains("post") || name.contains('2')) {
            return Some(METRIC_KERNEL);
        }
        if norm.contains("initrd") || norm.contains("initramfs") || name.contains('3') {
            return Some(METRIC_INITRD);
        }
        if norm.contains("switchroot")
            || (norm.contains("switch") && norm.contains("root"))
            || name.contains('4')
        {
            return Some(METRIC_SWITCHROOT);
        }
        if norm.replace(' ', "").contains("systeminit")
            || (norm.contains("system") && norm.contains("init"))
            || norm.contains("userspace")
            || name.contains('0')
        {
            return Some(METRIC_SYSTEM_INIT);
        }
        if norm.contains("total") || matches!(norm.as_str(), "boot time" | "boot" | "boot_time") {
            return Some(METRIC_TOTAL);
        }
    } else if norm.contains("kpi") && is_timestamp(name) {
        if norm.contains("early") && norm.contains("service") {
            return Some(METRIC_TS_EARLY_SERVICE);
        }
        if norm.contains("kmod") || (norm.contains("module") && norm.contains("load")) {
            return Some(METRIC_TS_START_KMOD_LOAD);
        }
        if norm.contains("first") && (norm.contains("service") || norm.contains("link")) {
            return Some(METRIC_TS_FIRST_SERVICE);
        }
        if norm.contains("network") || (norm.contains("link") && norm.contains("up")) {
            return Some(METRIC_TS_NETWORK_ONLINE);
        }
    } else if matches!(
        name,
        "boot.time.total_ms" | "boot.total_ms" | "boot_time_total_ms" | "Boot Time" | "boot_time"
    ) {
        return Some(METRIC_TOTAL);
    }

    None
}

// ============================================================================
// SECTION: Dataset Path: Multi-Sample
// ============================================================================

/// Extracts from the multi-sample form where `boot_time` is a number array.
///
/// Returns `None` when the body is not in multi-sample form at all, so the
/// caller can try the other shapes.
fn extract_multi_sample(body: &Value, os_filter: Option<&str>) -> Option<Vec<MetricPoint>> {
    let samples_field = body.get("boot_time")?.as_array()?;
    if samples_field.is_empty() || !samples_field.iter().all(Value::is_number) {
        return None;
    }
    let samples: Vec<f64> = samples_field.iter().filter_map(Value::as_f64).collect();
    tracing::debug!(sample_count = samples.len(), "boot_time.extract.detected_multi_sample");

    let mut points = Vec::new();
    let Some(stats) = compute_statistics(&samples, None) else {
        return Some(points);
    };

    let mut dims = BTreeMap::new();
    if let Some(Value::Object(config)) = body.get("rhivos_config") {
        if let Some(os_id) = config.get("os_id").and_then(Value::as_str) {
            if let Some(filter) = os_filter {
                if !os_id.eq_ignore_ascii_case(filter) {
                    return Some(points);
                }
            }
            dims.insert("os_id".to_string(), os_id.to_string());
        }
        let mode = config
            .get("image_target")
            .and_then(Value::as_str)
            .or_else(|| config.get("mode").and_then(Value::as_str));
        if let Some(mode) = mode {
            dims.insert("mode".to_string(), mode.to_string());
        }
    }
    let dims = (!dims.is_empty()).then_some(dims);

    let anomalies = detect_anomalies(&samples, AnomalyMethod::Iqr, ANOMALY_IQR_THRESHOLD);
    if !anomalies.is_empty() {
        tracing::info!(indices = ?anomalies, "boot_time.multi_sample.anomalies_detected");
    }

    let timestamp = OffsetDateTime::now_utc();
    let mut named: Vec<(&str, f64)> = vec![
        ("mean", stats.mean),
        ("median", stats.median),
        ("min", stats.min),
        ("max", stats.max),
        ("p95", stats.p95),
        ("p99", stats.p99),
    ];
    if let Some(std_dev) = stats.std_dev {
        named.push(("std_dev", std_dev));
    }
    if let Some(cv) = stats.cv {
        named.push(("cv", cv));
    }
    for (stat_name, stat_value) in named {
        let metric_id = format!("{METRIC_TOTAL}.{stat_name}");
        push_point_owned(&mut points, metric_id, timestamp, stat_value, dims.clone());
    }
    // The mean doubles as the primary total metric.
    push_point(&mut points, METRIC_TOTAL, timestamp, stats.mean, dims);
    Some(points)
}

// ============================================================================
// SECTION: Dataset Path: RHIVOS Local
// ============================================================================

/// Extracts from the RHIVOS local collector shape.
fn extract_rhivos_local(body: &Value, os_filter: Option<&str>) -> Vec<MetricPoint> {
    let mut points = Vec::new();
    let Some(Value::Object(boot)) = body.get("boot_metrics") else {
        return points;
    };

    let timestamp = body
        .get("timestamp")
        .and_then(parse_timestamp)
        .or_else(|| {
            body.get("metadata")
                .and_then(|meta| meta.get("collection_timestamp"))
                .and_then(parse_timestamp)
        })
        .unwrap_or_else(OffsetDateTime::now_utc);

    let mut dims = BTreeMap::new();
    if let Some(Value::Object(info)) = body.get("system_info") {
        if let Some(os_id) = info.get("os_id").and_then(Value::as_str) {
            if let Some(filter) = os_filter {
                if !os_id.eq_ignore_ascii_case(filter) {
                    return points;
                }
            }
            dims.insert("os_id".to_string(), os_id.to_string());
        }
        if let Some(mode) = info.get("mode").and_then(Value::as_str) {
            dims.insert("mode".to_string(), mode.to_string());
        }
        let target = info
            .get("target")
            .and_then(Value::as_str)
            .or_else(|| info.get("hardware").and_then(Value::as_str));
        if let Some(target) = target {
            dims.insert("target".to_string(), target.to_string());
        }
    }
    let dims = (!dims.is_empty()).then_some(dims);

    if let Some(total) = boot.get("total_boot_time_ms").and_then(Value::as_f64) {
        push_point(&mut points, METRIC_TOTAL, timestamp, total, dims.clone());
    }
    if let Some(Value::Object(phases)) = boot.get("phases") {
        let mapping = [
            ("kernel", METRIC_KERNEL),
            ("initrd", METRIC_INITRD),
            ("switchroot", METRIC_SWITCHROOT),
            ("userspace", METRIC_SYSTEM_INIT),
        ];
        for (field, metric_id) in mapping {
            if let Some(value) = phases.get(field).and_then(Value::as_f64) {
                push_point(&mut points, metric_id, timestamp, value, dims.clone());
            }
        }
    }
    points
}

// ============================================================================
// SECTION: Dataset Path: Horreum Verbose
// ============================================================================

/// Extracts from the Horreum v4 `test_results` and v6 `boot_logs` shapes.
fn extract_horreum_verbose(body: &Value, os_filter: Option<&str>) -> Vec<MetricPoint> {
    let points = extract_horreum_v4(body, os_filter);
    if !points.is_empty() {
        return points;
    }
    extract_horreum_v6(body, os_filter)
}

/// Extracts from the v4 `test_results` shape.
fn extract_horreum_v4(body: &Value, os_filter: Option<&str>) -> Vec<MetricPoint> {
    let mut points = Vec::new();
    let Some(first) = body
        .get("test_results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(Value::as_object)
    else {
        return points;
    };

    let timestamp = first
        .get("end_time")
        .and_then(parse_timestamp)
        .or_else(|| first.get("start_time").and_then(parse_timestamp))
        .unwrap_or_else(OffsetDateTime::now_utc);

    let mut dims = BTreeMap::new();
    if let Some(Value::Object(config)) = body.get("system_config") {
        if let Some(os_id) = config.get("os_id").and_then(Value::as_str) {
            if let Some(filter) = os_filter {
                if !os_id.eq_ignore_ascii_case(filter) {
                    return points;
                }
            }
            dims.insert("os_id".to_string(), os_id.to_string());
        }
        if let Some(mode) = config.get("mode").and_then(Value::as_str) {
            dims.insert("mode".to_string(), mode.to_string());
        }
        // image_target may be a hardware platform or a systemd target; either
        // way it lands in the target dimension.
        if let Some(target) = config.get("image_target").and_then(Value::as_str) {
            dims.insert("target".to_string(), target.to_string());
        }
    }
    let dims = (!dims.is_empty()).then_some(dims);

    if let Some(Value::Object(satime)) = first.get("satime") {
        let mapping = [
            ("total", METRIC_TOTAL),
            ("kernel", METRIC_KERNEL),
            ("initrd", METRIC_INITRD),
            ("userspace", METRIC_SYSTEM_INIT),
            ("switchroot", METRIC_SWITCHROOT),
        ];
        for (field, metric_id) in mapping {
            if let Some(value) = satime.get(field).and_then(Value::as_f64) {
                push_point(&mut points, metric_id, timestamp, value, dims.clone());
            }
        }
    }
    if let Some(value) =
        first.get("clktick").and_then(|clktick| clktick.get("time_init_ts")).and_then(Value::as_f64)
    {
        push_point(&mut points, METRIC_KERNEL_PRE_TIMER, timestamp, value, dims.clone());
    }
    if let Some(value) = first
        .get("earlyservice")
        .and_then(|early| early.get("earlyservice_ts"))
        .and_then(Value::as_f64)
    {
        push_point(&mut points, METRIC_TS_EARLY_SERVICE, timestamp, value, dims.clone());
    }
    if let Some(value) =
        first.get("dlkm").and_then(|dlkm| dlkm.get("start_kmod_load_ts")).and_then(Value::as_f64)
    {
        push_point(&mut points, METRIC_TS_START_KMOD_LOAD, timestamp, value, dims.clone());
    }

    if let Some(Value::Array(services)) = first.get("timing_details") {
        let mut first_service: Option<f64> = None;
        let mut network_online: Option<f64> = None;
        for service in services {
            let Some(activated) = service.get("activated").and_then(Value::as_f64) else {
                continue;
            };
            if first_service.is_none_or(|current| activated < current) {
                first_service = Some(activated);
            }
            let service_name = service.get("name").and_then(Value::as_str).unwrap_or_default();
            let lowered = service_name.to_lowercase();
            let is_network = ["network", "networkmanager", "systemd-networkd"]
                .iter()
                .any(|net| lowered.contains(net));
            if is_network && network_online.is_none_or(|current| activated < current) {
                network_online = Some(activated);
            }
        }
        if let Some(value) = first_service {
            push_point(&mut points, METRIC_TS_FIRST_SERVICE, timestamp, value, dims.clone());
        }
        if let Some(value) = network_online {
            push_point(&mut points, METRIC_TS_NETWORK_ONLINE, timestamp, value, dims.clone());
        }
    }

    // Last resort for sparse v4 payloads.
    if points.is_empty() {
        if let Some(value) =
            first.get("reboot").and_then(|reboot| reboot.get("total_et")).and_then(Value::as_f64)
        {
            push_point(&mut points, METRIC_TOTAL, timestamp, value, dims);
        }
    }
    points
}

/// Extracts from the v6 `boot_time[0].boot_logs` shape.
fn extract_horreum_v6(body: &Value, os_filter: Option<&str>) -> Vec<MetricPoint> {
    let mut points = Vec::new();
    let Some(first) = body
        .get("boot_time")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(Value::as_object)
    else {
        return points;
    };

    let ts_end = body.get("end_time").and_then(parse_timestamp);
    let ts_start = body.get("start_time").and_then(parse_timestamp);
    let timestamp = ts_end.or(ts_start).unwrap_or_else(OffsetDateTime::now_utc);

    let total_from_ts = match (ts_start, ts_end) {
        (Some(start), Some(end)) => {
            let delta = metric_gate_core::calculate_time_delta_ms(start, end);
            (delta > 0.0).then_some(delta)
        }
        _ => None,
    };

    let mut max_value: Option<f64> = None;
    if let Some(Value::Array(logs)) = first.get("boot_logs") {
        for entry in logs {
            for key in ["activated", "time", "duration", "elapsed"] {
                if let Some(value) = entry.get(key).and_then(Value::as_f64) {
                    if max_value.is_none_or(|current| value > current) {
                        max_value = Some(value);
                    }
                }
            }
        }
    }

    let total_ms = total_from_ts.or_else(|| max_value.map(scale_microseconds));

    let mut dims = BTreeMap::new();
    if let Some(Value::Object(config)) = body.get("rhivos_config") {
        if let Some(os_id) = config.get("os_id").and_then(Value::as_str) {
            if let Some(filter) = os_filter {
                if !os_id.eq_ignore_ascii_case(filter) {
                    return points;
                }
            }
            dims.insert("os_id".to_string(), os_id.to_string());
        }
        if let Some(mode) = config.get("mode").and_then(Value::as_str) {
            dims.insert("mode".to_string(), mode.to_string());
        }
        if let Some(target) = config.get("image_target").and_then(Value::as_str) {
            dims.insert("target".to_string(), target.to_string());
        }
    }
    let dims = (!dims.is_empty()).then_some(dims);

    if let Some(total) = total_ms {
        push_point(&mut points, METRIC_TOTAL, timestamp, total, dims);
    }
    points
}

/// Scales a suspiciously large boot-log value from microseconds down.
///
/// Values above the boundary are assumed to be microseconds and divided by
/// 1e6. The heuristic can misfire for genuinely huge millisecond values, so
/// it stays isolated here.
#[must_use]
pub fn scale_microseconds(value: f64) -> f64 {
    if value > MICROSECOND_SCALE_BOUNDARY { value / MICROSECOND_SCALE_BOUNDARY } else { value }
}

// ============================================================================
// SECTION: Point Emission
// ============================================================================

/// Pushes a metric point with a static id, dropping non-finite values.
fn push_point(
    points: &mut Vec<MetricPoint>,
    metric_id: &str,
    timestamp: OffsetDateTime,
    value: f64,
    dimensions: Option<BTreeMap<String, String>>,
) {
    push_point_owned(points, metric_id.to_string(), timestamp, value, dimensions);
}

/// Pushes a metric point, dropping non-finite values with a warning.
fn push_point_owned(
    points: &mut Vec<MetricPoint>,
    metric_id: String,
    timestamp: OffsetDateTime,
    value: f64,
    dimensions: Option<BTreeMap<String, String>>,
) {
    if !is_valid_float(value) {
        tracing::warn!(metric_id = %metric_id, value, "boot_time.invalid_float_skipped");
        return;
    }
    points.push(MetricPoint {
        metric_id,
        timestamp,
        value,
        unit: Some("ms".to_string()),
        dimensions,
        source: Some("boot-time-verbose".to_string()),
    });
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
