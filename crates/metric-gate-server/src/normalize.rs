// crates/metric-gate-server/src/normalize.rs
// ============================================================================
// Module: Parameter Normalizer
// Description: Canonicalization of user/LLM-provided tool parameters.
// Purpose: Apply identical input semantics on every tool entry path.
// Dependencies: metric-gate-core, serde_json, time
// ============================================================================

//! ## Overview
//! LLMs and external clients pass parameters in inconsistent shapes: nested
//! envelopes, synonym keys, numeric ids, relative dates, and OS or run-type
//! keywords where a test id belongs. Normalization unwraps, renames, coerces,
//! and detects those domain mixups, recording detections under internal
//! underscore-prefixed keys. The transformation is idempotent: applying it
//! twice yields the same map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use time::Duration;
use time::OffsetDateTime;

use metric_gate_core::timestamps::to_iso8601;

// ============================================================================
// SECTION: Domain Vocabulary
// ============================================================================

/// Internal key carrying a detected OS filter.
pub const DETECTED_OS_FILTER: &str = "_detected_os_filter";
/// Internal key carrying a detected run-type filter.
pub const DETECTED_RUN_TYPE: &str = "_detected_run_type";

/// Default dataset type assumed for boot-time queries.
const DEFAULT_DATASET_TYPE: &str = "boot-time-verbose";

/// Default page size when the client omits `limit`.
const DEFAULT_LIMIT: u64 = 100;

/// Known OS identifiers an LLM may confuse with test ids.
const KNOWN_OS_IDENTIFIERS: [&str; 12] = [
    "rhel",
    "rhel-9",
    "rhel-8",
    "rhel9",
    "rhel8",
    "autosd",
    "autosd-9",
    "fedora",
    "centos",
    "centos-stream",
    "fedora-coreos",
    "fcos",
];

/// Known run-type keywords an LLM may confuse with test ids.
const KNOWN_RUN_TYPES: [&str; 6] = ["nightly", "ci", "release", "manual", "ad-hoc", "adhoc"];

/// Dataset-type aliases mapped to canonical plugin ids.
const DATASET_TYPE_ALIASES: [(&str, &str); 3] = [
    ("boot-time", DEFAULT_DATASET_TYPE),
    ("boot_time", DEFAULT_DATASET_TYPE),
    ("boot", DEFAULT_DATASET_TYPE),
];

/// Maps an OS alias to its canonical identifier.
fn canonical_os(os_id: &str) -> String {
    // The alias table is currently the identity map for rhel/autosd; domain
    // deployments extend it here.
    match os_id {
        "rhel" => "rhel".to_string(),
        "autosd" => "autosd".to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes user/client parameters for `get_key_metrics`.
///
/// Applies envelope unwrapping, synonym mapping, type coercion, relative
/// date resolution, dataset-type aliases, and the OS/run-type domain
/// heuristics. Idempotent under repeated application.
#[must_use]
pub fn normalize_get_key_metrics_params(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut params = unwrap_envelopes(raw);

    apply_synonyms(&mut params);
    coerce_types(&mut params);
    resolve_relative_dates(&mut params);
    normalize_dataset_types(&mut params);
    detect_os_filter(&mut params);
    detect_run_type(&mut params);

    if !params.contains_key("limit") {
        params.insert("limit".to_string(), Value::from(DEFAULT_LIMIT));
    }
    for cosmetic in ["output_format", "table_format"] {
        params.remove(cosmetic);
    }
    params
}

/// Unwraps `{"params": {...}}` and `{"args": {...}}` envelopes.
fn unwrap_envelopes(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut params = match raw.get("params") {
        Some(Value::Object(inner)) => inner.clone(),
        _ => raw.clone(),
    };
    let has_top_level_fields =
        ["dataset_types", "data", "source_id"].iter().any(|key| params.contains_key(*key));
    if !has_top_level_fields {
        if let Some(Value::Object(inner)) = params.get("args") {
            params = inner.clone();
        }
    }
    params
}

/// Maps synonym keys onto canonical names.
fn apply_synonyms(params: &mut Map<String, Value>) {
    if let Some(value) = params.remove("dataset_type") {
        if !params.contains_key("dataset_types") {
            params.insert("dataset_types".to_string(), Value::Array(vec![value]));
        }
    }
    rename_if_absent(params, "source", "source_id");
    rename_if_absent(params, "testId", "test_id");
    rename_if_absent(params, "test", "test_id");
    rename_if_absent(params, "runId", "run_id");
    rename_if_absent(params, "run", "run_id");
    rename_if_absent(params, "schema", "schema_uri");
    for synonym in ["from_time", "from_timestamp", "fromTimestamp"] {
        if rename_if_absent(params, synonym, "from") {
            break;
        }
    }
    for synonym in ["to_time", "to_timestamp", "toTimestamp"] {
        if rename_if_absent(params, synonym, "to") {
            break;
        }
    }
}

/// Moves `old` to `new` unless `new` already exists; reports the move.
fn rename_if_absent(params: &mut Map<String, Value>, old: &str, new: &str) -> bool {
    if params.contains_key(new) {
        params.remove(old);
        return false;
    }
    if let Some(value) = params.remove(old) {
        params.insert(new.to_string(), value);
        return true;
    }
    false
}

/// Coerces integer ids to strings and `limit` to an integer.
fn coerce_types(params: &mut Map<String, Value>) {
    for key in ["test_id", "run_id"] {
        if let Some(Value::Number(number)) = params.get(key) {
            params.insert(key.to_string(), Value::String(number.to_string()));
        }
    }
    if let Some(Value::String(text)) = params.get("limit") {
        if let Ok(parsed) = text.trim().parse::<u64>() {
            params.insert("limit".to_string(), Value::from(parsed));
        }
    }
}

/// Resolves relative date expressions in `from` and `to`.
fn resolve_relative_dates(params: &mut Map<String, Value>) {
    for key in ["from", "to"] {
        if let Some(Value::String(text)) = params.get(key) {
            if let Some(resolved) = parse_relative_date(text) {
                params.insert(key.to_string(), Value::String(resolved));
            }
        }
    }
}

/// Parses `now`, `N days ago`, and `Nd` into absolute ISO 8601 instants.
///
/// Returns `None` for values that are not relative expressions so they pass
/// through untouched.
fn parse_relative_date(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Some(to_iso8601(OffsetDateTime::now_utc()));
    }
    // "N days ago" / "N day ago"
    let lower = trimmed.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    if tokens.len() == 3 && (tokens[1] == "day" || tokens[1] == "days") && tokens[2] == "ago" {
        if let Ok(days) = tokens[0].parse::<i64>() {
            let past = OffsetDateTime::now_utc() - Duration::days(days);
            return Some(to_iso8601(past));
        }
    }
    // "Nd"
    if let Some(head) = trimmed.strip_suffix('d') {
        if !head.is_empty() && head.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(days) = head.parse::<i64>() {
                let past = OffsetDateTime::now_utc() - Duration::days(days);
                return Some(to_iso8601(past));
            }
        }
    }
    None
}

/// Normalizes dataset-type aliases and listifies a bare string.
fn normalize_dataset_types(params: &mut Map<String, Value>) {
    let Some(value) = params.get("dataset_types").cloned() else {
        return;
    };
    let resolve = |name: &str| -> String {
        DATASET_TYPE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or_else(|| name.to_string(), |(_, canonical)| (*canonical).to_string())
    };
    let normalized = match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Value::String(resolve(&name)),
                    other => other,
                })
                .collect(),
        ),
        Value::String(name) => Value::Array(vec![Value::String(resolve(&name))]),
        other => other,
    };
    params.insert("dataset_types".to_string(), normalized);
}

/// Returns true when `dataset_types` is absent or an empty list.
fn dataset_types_empty(params: &Map<String, Value>) -> bool {
    match params.get("dataset_types") {
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
        None => true,
    }
}

/// Defaults `dataset_types` to the boot-time plugin when empty.
fn default_dataset_types(params: &mut Map<String, Value>) {
    if dataset_types_empty(params) {
        params.insert(
            "dataset_types".to_string(),
            Value::Array(vec![Value::String(DEFAULT_DATASET_TYPE.to_string())]),
        );
    }
}

/// Detects OS identifiers supplied explicitly or misplaced in `test_id`.
fn detect_os_filter(params: &mut Map<String, Value>) {
    // Explicit os_id parameter wins.
    let explicit = params
        .get("os_id")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .filter(|os_id| !os_id.is_empty());
    if let Some(os_id) = explicit {
        params.insert(DETECTED_OS_FILTER.to_string(), Value::String(canonical_os(&os_id)));
        default_dataset_types(params);
    }

    // Legacy detection: an OS identifier where a test id belongs.
    let test_id =
        params.get("test_id").and_then(Value::as_str).map(str::to_lowercase).unwrap_or_default();
    if KNOWN_OS_IDENTIFIERS.contains(&test_id.as_str()) {
        default_dataset_types(params);
        params.remove("test_id");
        params.insert(DETECTED_OS_FILTER.to_string(), Value::String(canonical_os(&test_id)));
    }
}

/// Detects run-type keywords from explicit parameters or misplaced fields.
fn detect_run_type(params: &mut Map<String, Value>) {
    // Explicit run_type/runType parameter takes priority.
    let explicit = params
        .remove("run_type")
        .or_else(|| params.remove("runType"))
        .and_then(|value| value.as_str().map(str::to_lowercase))
        .filter(|run_type| !run_type.is_empty());
    if let Some(run_type) = explicit {
        let normalized = if run_type == "ad-hoc" || run_type == "adhoc" {
            "manual".to_string()
        } else {
            run_type
        };
        params.insert(DETECTED_RUN_TYPE.to_string(), Value::String(normalized));
        return;
    }
    if params.contains_key(DETECTED_RUN_TYPE) {
        return;
    }

    // A run-type keyword where a test id belongs.
    let test_id =
        params.get("test_id").and_then(Value::as_str).map(str::to_lowercase).unwrap_or_default();
    if KNOWN_RUN_TYPES.contains(&test_id.as_str()) {
        params.insert(DETECTED_RUN_TYPE.to_string(), Value::String(test_id));
        params.remove("test_id");
        default_dataset_types(params);
        return;
    }

    // Run-type keywords buried inside other string parameters.
    for key in ["test_id", "schema_uri"] {
        let value =
            params.get(key).and_then(Value::as_str).map(str::to_lowercase).unwrap_or_default();
        for run_type in KNOWN_RUN_TYPES {
            if value.contains(run_type) {
                params.insert(DETECTED_RUN_TYPE.to_string(), Value::String(run_type.to_string()));
                if key == "test_id" {
                    params.remove("test_id");
                    default_dataset_types(params);
                }
                return;
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
