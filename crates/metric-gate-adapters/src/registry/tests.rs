// crates/metric-gate-adapters/src/registry/tests.rs
// ============================================================================
// Module: Adapter Registry Tests
// Description: Unit tests for registration and lookup behavior.
// Purpose: Validate duplicate rejection and sorted source-id listing.
// Dependencies: metric-gate-adapters, metric-gate-contract
// ============================================================================

//! ## Overview
//! Registers stub adapters and checks duplicate rejection, lookup by id, and
//! sorted id listing.

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

use std::sync::Arc;

use async_trait::async_trait;
use metric_gate_contract::ArtifactsGetRequest;
use metric_gate_contract::ArtifactsGetResponse;
use metric_gate_contract::ContractVersion;
use metric_gate_contract::DatasetLabelValuesRequest;
use metric_gate_contract::DatasetLabelValuesResponse;
use metric_gate_contract::DatasetsGetRequest;
use metric_gate_contract::DatasetsGetResponse;
use metric_gate_contract::DatasetsSearchRequest;
use metric_gate_contract::DatasetsSearchResponse;
use metric_gate_contract::RunLabelValuesRequest;
use metric_gate_contract::RunLabelValuesResponse;
use metric_gate_contract::RunsListRequest;
use metric_gate_contract::RunsListResponse;
use metric_gate_contract::SourceCapabilities;
use metric_gate_contract::SourceDescribeRequest;
use metric_gate_contract::SourceDescribeResponse;
use metric_gate_contract::SourceType;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestLabelValuesResponse;
use metric_gate_contract::TestsListRequest;
use metric_gate_contract::TestsListResponse;

use super::AdapterRegistry;
use crate::AdapterError;
use crate::SourceAdapter;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Stub adapter answering only `source_describe`.
struct StubAdapter;

#[async_trait]
impl SourceAdapter for StubAdapter {
    async fn source_describe(
        &self,
        _req: SourceDescribeRequest,
    ) -> Result<SourceDescribeResponse, AdapterError> {
        Ok(SourceDescribeResponse {
            source_type: SourceType::CustomBackend,
            version: "0.0.0".to_string(),
            contract_version: ContractVersion::V1_0_0,
            capabilities: SourceCapabilities::default(),
            limits: None,
        })
    }

    async fn tests_list(&self, _req: TestsListRequest) -> Result<TestsListResponse, AdapterError> {
        Ok(TestsListResponse::default())
    }

    async fn runs_list(&self, _req: RunsListRequest) -> Result<RunsListResponse, AdapterError> {
        Ok(RunsListResponse::default())
    }

    async fn datasets_search(
        &self,
        _req: DatasetsSearchRequest,
    ) -> Result<DatasetsSearchResponse, AdapterError> {
        Ok(DatasetsSearchResponse::default())
    }

    async fn datasets_get(
        &self,
        _req: DatasetsGetRequest,
    ) -> Result<DatasetsGetResponse, AdapterError> {
        Err(AdapterError::Unsupported {
            operation: "datasets.get",
        })
    }

    async fn artifacts_get(
        &self,
        _req: ArtifactsGetRequest,
    ) -> Result<ArtifactsGetResponse, AdapterError> {
        Err(AdapterError::Unsupported {
            operation: "artifacts.get",
        })
    }

    async fn get_run_label_values(
        &self,
        _req: RunLabelValuesRequest,
    ) -> Result<RunLabelValuesResponse, AdapterError> {
        Ok(RunLabelValuesResponse::default())
    }

    async fn get_test_label_values(
        &self,
        _req: TestLabelValuesRequest,
    ) -> Result<TestLabelValuesResponse, AdapterError> {
        Ok(TestLabelValuesResponse::default())
    }

    async fn get_dataset_label_values(
        &self,
        _req: DatasetLabelValuesRequest,
    ) -> Result<DatasetLabelValuesResponse, AdapterError> {
        Ok(DatasetLabelValuesResponse::default())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn registers_and_looks_up_adapters() {
    let mut registry = AdapterRegistry::new();
    assert!(registry.is_empty());
    registry.register("horreum-prod", Arc::new(StubAdapter)).expect("register");
    assert!(registry.get("horreum-prod").is_some());
    assert!(registry.get("missing").is_none());
    assert!(!registry.is_empty());
}

#[test]
fn rejects_duplicate_source_ids() {
    let mut registry = AdapterRegistry::new();
    registry.register("horreum-prod", Arc::new(StubAdapter)).expect("register");
    let err = registry
        .register("horreum-prod", Arc::new(StubAdapter))
        .expect_err("expected duplicate rejection");
    assert!(matches!(err, AdapterError::Protocol { .. }));
}

#[test]
fn source_ids_are_sorted() {
    let mut registry = AdapterRegistry::new();
    registry.register("zeta", Arc::new(StubAdapter)).expect("register");
    registry.register("alpha", Arc::new(StubAdapter)).expect("register");
    assert_eq!(registry.source_ids(), vec!["alpha".to_string(), "zeta".to_string()]);
}

#[tokio::test]
async fn registered_adapters_are_callable() {
    let mut registry = AdapterRegistry::new();
    registry.register("stub", Arc::new(StubAdapter)).expect("register");
    let adapter = registry.get("stub").expect("adapter");
    let described = adapter.source_describe(SourceDescribeRequest::default()).await.expect("ok");
    assert_eq!(described.source_type, SourceType::CustomBackend);
}
