// crates/metric-gate-contract/src/types/tests.rs
// ============================================================================
// Module: Contract Type Tests
// Description: Unit tests for contract serialization behavior.
// Purpose: Validate aliases, defaults, and tolerant deserialization.
// Dependencies: metric-gate-contract, serde_json
// ============================================================================

//! ## Overview
//! Pins the wire behaviors the adapters rely on: `multiFilter` camelCase
//! canonical output with snake_case input tolerance, `from`/`to` renames,
//! label-value `schema` alias, defaulted pagination, and merge-strategy
//! labels.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use super::ContractVersion;
use super::DatasetsGetResponse;
use super::DatasetsSearchRequest;
use super::ExportedLabelValues;
use super::MergeStrategy;
use super::RunLabelValuesRequest;
use super::SourceCapabilities;
use super::SourceDescribeResponse;
use super::SourceLimits;
use super::SourceType;
use super::TestLabelValuesRequest;
use super::TestsListResponse;
use super::validate_contract_compatibility;

// ============================================================================
// SECTION: Serialization Tests
// ============================================================================

#[test]
fn datasets_search_uses_from_to_wire_names() {
    let request = DatasetsSearchRequest {
        test_id: Some("294".to_string()),
        from_time: Some("2025-01-01T00:00:00Z".to_string()),
        to_time: Some("now".to_string()),
        page_size: 100,
        ..DatasetsSearchRequest::default()
    };
    let value = serde_json::to_value(&request).expect("serialize");
    assert_eq!(value.get("from"), Some(&json!("2025-01-01T00:00:00Z")));
    assert_eq!(value.get("to"), Some(&json!("now")));
    assert!(value.get("from_time").is_none());
    assert!(value.get("run_ids").is_none());
}

#[test]
fn multi_filter_serializes_camel_case() {
    let request = TestLabelValuesRequest {
        test_id: "294".to_string(),
        multi_filter: true,
        metrics: true,
        filtering: true,
        page_size: 100,
        ..TestLabelValuesRequest::default()
    };
    let value = serde_json::to_value(&request).expect("serialize");
    assert_eq!(value.get("multiFilter"), Some(&json!(true)));
    assert!(value.get("multi_filter").is_none());
}

#[test]
fn multi_filter_accepts_snake_case_input() {
    let parsed: RunLabelValuesRequest =
        serde_json::from_value(json!({"run_id": "127723", "multi_filter": true}))
            .expect("deserialize");
    assert!(parsed.multi_filter);
    assert_eq!(parsed.page_size, 100);
}

#[test]
fn label_value_accepts_schema_alias() {
    let parsed: ExportedLabelValues = serde_json::from_value(json!({
        "values": [{"name": "Boot Time", "schema": "urn:boot-time:1", "value": 1200}],
        "run_id": "42"
    }))
    .expect("deserialize");
    assert_eq!(parsed.values[0].schema_uri.as_deref(), Some("urn:boot-time:1"));
    assert_eq!(parsed.values[0].value, json!(1200));
}

// ============================================================================
// SECTION: Tolerant Deserialization Tests
// ============================================================================

#[test]
fn empty_object_yields_default_listing_response() {
    let parsed: TestsListResponse = serde_json::from_value(json!({})).expect("deserialize");
    assert!(parsed.tests.is_empty());
    assert!(!parsed.pagination.has_more);
    assert!(parsed.pagination.next_page_token.is_none());
}

#[test]
fn dataset_content_accepts_objects_and_arrays() {
    let object: DatasetsGetResponse =
        serde_json::from_value(json!({"dataset_id": "1", "content": {"a": 1}}))
            .expect("deserialize");
    assert!(object.content.is_object());
    assert_eq!(object.content_type, "application/json");

    let array: DatasetsGetResponse =
        serde_json::from_value(json!({"dataset_id": "2", "content": [{"a": 1}, {"b": 2}]}))
            .expect("deserialize");
    assert!(array.content.is_array());
}

// ============================================================================
// SECTION: Enum Label Tests
// ============================================================================

#[test]
fn merge_strategy_labels_are_stable() {
    assert_eq!(MergeStrategy::PreferFast.as_str(), "prefer_fast");
    assert_eq!(MergeStrategy::Comprehensive.as_str(), "comprehensive");
    assert_eq!(MergeStrategy::LabelsOnly.as_str(), "labels_only");
    assert_eq!(MergeStrategy::DatasetsOnly.as_str(), "datasets_only");
    let parsed: MergeStrategy = serde_json::from_value(json!("comprehensive")).expect("parse");
    assert_eq!(parsed, MergeStrategy::Comprehensive);
    assert_eq!(MergeStrategy::default(), MergeStrategy::PreferFast);
}

#[test]
fn contract_version_serializes_as_semver() {
    let value = serde_json::to_value(ContractVersion::V1_0_0).expect("serialize");
    assert_eq!(value, json!("1.0.0"));
}

// ============================================================================
// SECTION: Compatibility Tests
// ============================================================================

/// Builds a describe response with the given capabilities.
fn describe_with(capabilities: SourceCapabilities) -> SourceDescribeResponse {
    SourceDescribeResponse {
        source_type: SourceType::Horreum,
        version: "0.1.0".to_string(),
        contract_version: ContractVersion::V1_0_0,
        capabilities,
        limits: Some(SourceLimits {
            max_page_size: Some(1000),
            max_dataset_size: None,
            rate_limit_per_minute: None,
        }),
    }
}

#[test]
fn compatible_sources_pass_validation() {
    assert!(validate_contract_compatibility(&describe_with(SourceCapabilities::default())));
}

#[test]
fn sources_without_pagination_fail_validation() {
    let capabilities = SourceCapabilities {
        pagination: false,
        ..SourceCapabilities::default()
    };
    assert!(!validate_contract_compatibility(&describe_with(capabilities)));
}
