// crates/metric-gate-server/src/orchestrator/tests.rs
// ============================================================================
// Module: Orchestrator Tests
// Description: Unit tests for strategy dispatch, pagination, fan-out, and
//              merge behavior.
// Purpose: Validate the merge table, label precedence, the pagination loop,
//          partial-failure gating, and auto-discovery.
// Dependencies: metric-gate-server, metric-gate-adapters, metric-gate-plugins
// ============================================================================

//! ## Overview
//! Drives the orchestrator against a scripted fake adapter: PREFER_FAST
//! skips datasets when labels are present, COMPREHENSIVE merges with label
//! precedence, pagination walks every page and stops on a missing token,
//! the fan-out floor raises below 50% success, LABELS_ONLY raises on empty
//! labels, and test auto-discovery falls back to the known id.

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
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use metric_gate_adapters::AdapterError;
use metric_gate_adapters::AdapterRegistry;
use metric_gate_adapters::SourceAdapter;
use metric_gate_contract::ArtifactsGetRequest;
use metric_gate_contract::ArtifactsGetResponse;
use metric_gate_contract::ContractVersion;
use metric_gate_contract::DatasetInfo;
use metric_gate_contract::DatasetLabelValuesRequest;
use metric_gate_contract::DatasetLabelValuesResponse;
use metric_gate_contract::DatasetsGetRequest;
use metric_gate_contract::DatasetsGetResponse;
use metric_gate_contract::DatasetsSearchRequest;
use metric_gate_contract::DatasetsSearchResponse;
use metric_gate_contract::ExportedLabelValues;
use metric_gate_contract::LabelValue;
use metric_gate_contract::MergeStrategy;
use metric_gate_contract::Pagination;
use metric_gate_contract::RunLabelValuesRequest;
use metric_gate_contract::RunLabelValuesResponse;
use metric_gate_contract::RunsListRequest;
use metric_gate_contract::RunsListResponse;
use metric_gate_contract::SourceCapabilities;
use metric_gate_contract::SourceDescribeRequest;
use metric_gate_contract::SourceDescribeResponse;
use metric_gate_contract::SourceType;
use metric_gate_contract::TestInfo;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestLabelValuesResponse;
use metric_gate_contract::TestsListRequest;
use metric_gate_contract::TestsListResponse;
use metric_gate_core::DomainErrorKind;
use metric_gate_core::MetricPoint;
use metric_gate_plugins::PluginRegistry;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;

use super::Orchestrator;
use super::ToolOutcome;
use super::gather_partial;
use super::merge_metric_points;

// ============================================================================
// SECTION: Fake Adapter
// ============================================================================

/// Scripted adapter driving the orchestrator in tests.
#[derive(Default)]
struct FakeAdapter {
    /// Pages returned by successive `datasets_search` calls.
    search_pages: Mutex<Vec<DatasetsSearchResponse>>,
    /// Dataset bodies keyed by dataset id.
    datasets: BTreeMap<String, Value>,
    /// Dataset ids that fail with a server error.
    failing_datasets: Vec<String>,
    /// Label-value bundles returned by the test label path.
    label_items: Vec<ExportedLabelValues>,
    /// Tests returned by `tests_list`.
    tests: Vec<TestInfo>,
    /// Whether `tests_list` fails.
    tests_list_fails: bool,
    /// Number of `datasets_search` calls observed.
    search_calls: AtomicUsize,
    /// Recorded search requests.
    search_requests: Mutex<Vec<DatasetsSearchRequest>>,
    /// Recorded test-label-value requests.
    label_requests: Mutex<Vec<TestLabelValuesRequest>>,
}

impl FakeAdapter {
    /// Wraps the fake in the registry under `source_id`.
    fn into_registry(self, source_id: &str) -> (Arc<AdapterRegistry>, Arc<Self>) {
        let fake = Arc::new(self);
        let mut registry = AdapterRegistry::new();
        registry
            .register(source_id, Arc::clone(&fake) as Arc<dyn SourceAdapter>)
            .expect("register");
        (Arc::new(registry), fake)
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    async fn source_describe(
        &self,
        _req: SourceDescribeRequest,
    ) -> Result<SourceDescribeResponse, AdapterError> {
        Ok(SourceDescribeResponse {
            source_type: SourceType::Horreum,
            version: "0.0.0".to_string(),
            contract_version: ContractVersion::V1_0_0,
            capabilities: SourceCapabilities::default(),
            limits: None,
        })
    }

    async fn tests_list(&self, _req: TestsListRequest) -> Result<TestsListResponse, AdapterError> {
        if self.tests_list_fails {
            return Err(AdapterError::Status {
                status: 500,
                body_preview: "boom".to_string(),
            });
        }
        Ok(TestsListResponse {
            tests: self.tests.clone(),
            pagination: Pagination::default(),
            cache_info: None,
        })
    }

    async fn runs_list(&self, _req: RunsListRequest) -> Result<RunsListResponse, AdapterError> {
        Ok(RunsListResponse::default())
    }

    async fn datasets_search(
        &self,
        req: DatasetsSearchRequest,
    ) -> Result<DatasetsSearchResponse, AdapterError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.search_requests.lock() {
            requests.push(req);
        }
        let mut pages = self.search_pages.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if pages.is_empty() {
            return Ok(DatasetsSearchResponse::default());
        }
        Ok(pages.remove(0))
    }

    async fn datasets_get(
        &self,
        req: DatasetsGetRequest,
    ) -> Result<DatasetsGetResponse, AdapterError> {
        if self.failing_datasets.contains(&req.dataset_id) {
            return Err(AdapterError::Status {
                status: 503,
                body_preview: "unavailable".to_string(),
            });
        }
        let content = self.datasets.get(&req.dataset_id).cloned().ok_or_else(|| {
            AdapterError::Status {
                status: 404,
                body_preview: format!("missing {}", req.dataset_id),
            }
        })?;
        Ok(DatasetsGetResponse {
            dataset_id: req.dataset_id,
            content,
            content_type: "application/json".to_string(),
            size_bytes: None,
            cache_info: None,
            metadata: None,
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
        Ok(RunLabelValuesResponse {
            items: self.label_items.clone(),
            pagination: Pagination::default(),
            cache_info: None,
        })
    }

    async fn get_test_label_values(
        &self,
        req: TestLabelValuesRequest,
    ) -> Result<TestLabelValuesResponse, AdapterError> {
        if let Ok(mut requests) = self.label_requests.lock() {
            requests.push(req);
        }
        Ok(TestLabelValuesResponse {
            items: self.label_items.clone(),
            pagination: Pagination::default(),
            cache_info: None,
        })
    }

    async fn get_dataset_label_values(
        &self,
        _req: DatasetLabelValuesRequest,
    ) -> Result<DatasetLabelValuesResponse, AdapterError> {
        Ok(DatasetLabelValuesResponse::default())
    }
}

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Builds an orchestrator over the given registry with builtin plugins.
fn orchestrator_with(adapters: Arc<AdapterRegistry>) -> Orchestrator {
    Orchestrator::new(adapters, Arc::new(PluginRegistry::with_builtin_plugins()))
}

/// One search page listing the given dataset ids.
fn search_page(ids: &[&str], next_token: Option<&str>, has_more: bool) -> DatasetsSearchResponse {
    DatasetsSearchResponse {
        datasets: ids
            .iter()
            .map(|dataset_id| DatasetInfo {
                dataset_id: (*dataset_id).to_string(),
                run_id: "1".to_string(),
                test_id: "294".to_string(),
                content_type: "application/json".to_string(),
                ..DatasetInfo::default()
            })
            .collect(),
        pagination: Pagination {
            has_more,
            next_page_token: next_token.map(ToString::to_string),
            total_count: None,
        },
        cache_info: None,
    }
}

/// A minimal boot-time dataset body producing one total point.
fn boot_body(total_ms: f64) -> Value {
    json!({
        "boot_metrics": {"total_boot_time_ms": total_ms},
        "timestamp": "2025-09-22T10:30:00Z",
    })
}

/// A label bundle with one recognized phase.
fn label_bundle(phase_value: f64) -> ExportedLabelValues {
    ExportedLabelValues {
        values: vec![LabelValue {
            id: None,
            name: "BOOT3 - Initrd Duration Average ms".to_string(),
            schema_uri: None,
            value: json!(phase_value),
        }],
        stop: Some("2025-09-22T10:30:00Z".to_string()),
        ..ExportedLabelValues::default()
    }
}

/// Source-driven parameter map with a pinned test id.
fn source_params() -> Map<String, Value> {
    match json!({
        "source_id": "fake",
        "dataset_types": ["boot-time-verbose"],
        "test_id": "294",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Extracts the points variant of an outcome.
fn points_of(outcome: ToolOutcome) -> Vec<MetricPoint> {
    match outcome {
        ToolOutcome::Points(points) => points,
        ToolOutcome::Plan(_) => panic!("expected points, got plan"),
    }
}

/// A metric point with a fixed metric id and timestamp.
fn point(metric_id: &str, timestamp_secs: i64, value: f64) -> MetricPoint {
    MetricPoint {
        metric_id: metric_id.to_string(),
        timestamp: OffsetDateTime::from_unix_timestamp(timestamp_secs).expect("instant"),
        value,
        unit: Some("ms".to_string()),
        dimensions: None,
        source: None,
    }
}

// ============================================================================
// SECTION: Merge Tests
// ============================================================================

#[test]
fn merge_of_empty_inputs_is_empty_for_every_strategy() {
    for strategy in [
        MergeStrategy::PreferFast,
        MergeStrategy::Comprehensive,
        MergeStrategy::LabelsOnly,
        MergeStrategy::DatasetsOnly,
    ] {
        assert!(merge_metric_points(Vec::new(), Vec::new(), strategy).is_empty());
    }
}

#[test]
fn prefer_fast_returns_labels_when_present() {
    let labels = vec![point("boot.time.total_ms", 1_000, 5_000.0)];
    let datasets = vec![point("boot.time.total_ms", 1_000, 4_950.0)];
    let merged = merge_metric_points(labels, datasets, MergeStrategy::PreferFast);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].value, 5_000.0);
}

#[test]
fn comprehensive_gives_labels_precedence_on_conflict() {
    let labels = vec![point("boot.time.total_ms", 1_000, 5_000.0)];
    let datasets = vec![
        point("boot.time.total_ms", 1_000, 4_950.0),
        point("boot.phase.kernel_ms", 1_000, 900.0),
    ];
    let merged = merge_metric_points(labels, datasets, MergeStrategy::Comprehensive);
    assert_eq!(merged.len(), 2);
    let total = merged
        .iter()
        .find(|merged_point| merged_point.metric_id == "boot.time.total_ms")
        .expect("total");
    assert_eq!(total.value, 5_000.0);
}

#[test]
fn comprehensive_output_is_ordered_by_timestamp_then_metric() {
    let labels = vec![point("b.metric", 2_000, 1.0)];
    let datasets = vec![point("a.metric", 2_000, 2.0), point("z.metric", 1_000, 3.0)];
    let merged = merge_metric_points(labels, datasets, MergeStrategy::Comprehensive);
    let ids: Vec<&str> = merged.iter().map(|merged_point| merged_point.metric_id.as_str()).collect();
    assert_eq!(ids, vec!["z.metric", "a.metric", "b.metric"]);
}

#[test]
fn exclusive_strategies_return_their_side() {
    let labels = vec![point("x", 1, 1.0)];
    let datasets = vec![point("y", 1, 2.0)];
    let only_labels =
        merge_metric_points(labels.clone(), datasets.clone(), MergeStrategy::LabelsOnly);
    assert_eq!(only_labels.len(), 1);
    assert_eq!(only_labels[0].metric_id, "x");
    let only_datasets = merge_metric_points(labels, datasets, MergeStrategy::DatasetsOnly);
    assert_eq!(only_datasets.len(), 1);
    assert_eq!(only_datasets[0].metric_id, "y");
}

// ============================================================================
// SECTION: Fan-Out Tests
// ============================================================================

#[tokio::test]
async fn gather_partial_raises_below_the_floor() {
    // 49 successes, 51 failures: below a 0.5 floor.
    let operations: Vec<(String, _)> = (0..100)
        .map(|idx| {
            (format!("op-{idx}"), async move {
                if idx < 49 {
                    Ok(idx)
                } else {
                    Err(AdapterError::Status {
                        status: 500,
                        body_preview: String::new(),
                    })
                }
            })
        })
        .collect();
    let err = gather_partial(operations, "dataset fetch", 0.5)
        .await
        .expect_err("expected floor violation");
    assert_eq!(err.successes, 49);
    assert_eq!(err.failures, 51);
}

#[tokio::test]
async fn gather_partial_passes_at_exactly_the_floor() {
    let operations: Vec<(String, _)> = (0..100)
        .map(|idx| {
            (format!("op-{idx}"), async move {
                if idx < 50 {
                    Ok(idx)
                } else {
                    Err(AdapterError::Status {
                        status: 500,
                        body_preview: String::new(),
                    })
                }
            })
        })
        .collect();
    let result = gather_partial(operations, "dataset fetch", 0.5).await.expect("result");
    assert_eq!(result.successes.len(), 50);
    assert_eq!(result.failures.len(), 50);
    assert!(result.failures.iter().all(|failure| failure.retryable));
}

#[tokio::test]
async fn gather_partial_keeps_task_creation_order() {
    let operations: Vec<(String, _)> = (0..8_u64)
        .map(|idx| {
            (format!("op-{idx}"), async move {
                // Later tasks finish earlier; output order must not care.
                tokio::time::sleep(std::time::Duration::from_millis(40 - idx * 5)).await;
                Ok(idx)
            })
        })
        .collect();
    let result = gather_partial(operations, "ordering", 0.0).await.expect("result");
    assert_eq!(result.successes, (0..8).collect::<Vec<u64>>());
}

// ============================================================================
// SECTION: Strategy Dispatch Tests
// ============================================================================

#[tokio::test]
async fn prefer_fast_skips_datasets_when_labels_are_present() {
    let (registry, fake) = FakeAdapter {
        label_items: vec![label_bundle(2_000.0)],
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let outcome = orchestrator.get_key_metrics(&source_params()).await.expect("outcome");
    let points = points_of(outcome);
    assert!(!points.is_empty());
    // Labels satisfied the query: the dataset path never ran.
    assert_eq!(fake.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn prefer_fast_falls_back_to_datasets_when_labels_are_empty() {
    let (registry, fake) = FakeAdapter {
        search_pages: Mutex::new(vec![search_page(&["ds-1"], None, false)]),
        datasets: BTreeMap::from([("ds-1".to_string(), boot_body(12_500.0))]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let outcome = orchestrator.get_key_metrics(&source_params()).await.expect("outcome");
    let points = points_of(outcome);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].value, 12_500.0);
    assert_eq!(fake.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn labels_only_raises_when_labels_are_empty() {
    let (registry, _fake) = FakeAdapter::default().into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.insert("merge_strategy".to_string(), json!("labels_only"));
    let err = orchestrator.get_key_metrics(&params).await.expect_err("expected raise");
    assert_eq!(err.kind, DomainErrorKind::ValidationError);
}

#[tokio::test]
async fn comprehensive_fetches_both_paths_and_merges() {
    let (registry, fake) = FakeAdapter {
        label_items: vec![label_bundle(2_000.0)],
        search_pages: Mutex::new(vec![search_page(&["ds-1"], None, false)]),
        datasets: BTreeMap::from([("ds-1".to_string(), boot_body(12_500.0))]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.insert("merge_strategy".to_string(), json!("comprehensive"));
    let outcome = orchestrator.get_key_metrics(&params).await.expect("outcome");
    let points = points_of(outcome);
    assert!(fake.search_calls.load(Ordering::SeqCst) >= 1);
    // The total collides on (metric_id, timestamp): the label value wins.
    let total = points
        .iter()
        .find(|merged_point| merged_point.metric_id == "boot.time.total_ms")
        .expect("total");
    assert_eq!(total.value, 2_000.0);
    assert!(points.iter().any(|merged_point| merged_point.metric_id == "boot.phase.initrd_ms"));
}

// ============================================================================
// SECTION: Pagination Tests
// ============================================================================

#[tokio::test]
async fn pagination_walks_every_page() {
    let (registry, fake) = FakeAdapter {
        search_pages: Mutex::new(vec![
            search_page(&["ds-1", "ds-2"], Some("page-2"), true),
            search_page(&["ds-3", "ds-4"], Some("page-3"), true),
            search_page(&["ds-5", "ds-6"], None, false),
        ]),
        datasets: BTreeMap::from([
            ("ds-1".to_string(), boot_body(1_000.0)),
            ("ds-2".to_string(), boot_body(2_000.0)),
            ("ds-3".to_string(), boot_body(3_000.0)),
            ("ds-4".to_string(), boot_body(4_000.0)),
            ("ds-5".to_string(), boot_body(5_000.0)),
            ("ds-6".to_string(), boot_body(6_000.0)),
        ]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let outcome = orchestrator.get_key_metrics(&source_params()).await.expect("outcome");
    let points = points_of(outcome);
    // Six dataset bodies reached the plugin across exactly three searches.
    assert_eq!(points.len(), 6);
    assert_eq!(fake.search_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn missing_page_token_terminates_the_loop() {
    let (registry, fake) = FakeAdapter {
        // has_more claims more data but no token is provided.
        search_pages: Mutex::new(vec![search_page(&["ds-1"], None, true)]),
        datasets: BTreeMap::from([("ds-1".to_string(), boot_body(1_000.0))]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let outcome = orchestrator.get_key_metrics(&source_params()).await.expect("outcome");
    let points = points_of(outcome);
    assert_eq!(points.len(), 1);
    assert_eq!(fake.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fan_out_floor_gates_the_dataset_path() {
    let (registry, _fake) = FakeAdapter {
        search_pages: Mutex::new(vec![search_page(&["ds-1", "ds-2", "ds-3"], None, false)]),
        datasets: BTreeMap::from([("ds-1".to_string(), boot_body(1_000.0))]),
        failing_datasets: vec!["ds-2".to_string(), "ds-3".to_string()],
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    // One of three succeeded: 33% is below the 0.5 floor.
    let err = orchestrator.get_key_metrics(&source_params()).await.expect_err("expected raise");
    assert_eq!(err.kind, DomainErrorKind::UpstreamError);
}

// ============================================================================
// SECTION: Auto-Configuration Tests
// ============================================================================

#[tokio::test]
async fn unknown_source_id_lists_available_options() {
    let (registry, _fake) = FakeAdapter::default().into_registry("horreum-prod");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.insert("source_id".to_string(), json!("missing"));
    let err = orchestrator.get_key_metrics(&params).await.expect_err("expected unknown source");
    assert_eq!(err.kind, DomainErrorKind::UnknownSourceId);
    assert_eq!(err.available_options, Some(vec!["horreum-prod".to_string()]));
}

#[tokio::test]
async fn no_sources_configured_is_a_configuration_error() {
    let orchestrator = orchestrator_with(Arc::new(AdapterRegistry::new()));
    let mut params = source_params();
    params.remove("source_id");
    let err = orchestrator.get_key_metrics(&params).await.expect_err("expected config error");
    assert_eq!(err.kind, DomainErrorKind::MissingConfiguration);
}

#[tokio::test]
async fn auto_discovery_selects_a_matching_test() {
    let (registry, fake) = FakeAdapter {
        tests: vec![
            TestInfo {
                test_id: "7".to_string(),
                name: "quarkus-boot-time".to_string(),
                ..TestInfo::default()
            },
            TestInfo {
                test_id: "294".to_string(),
                name: "rhivos-boot-time-verbose".to_string(),
                ..TestInfo::default()
            },
        ],
        search_pages: Mutex::new(vec![search_page(&[], None, false)]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.remove("test_id");
    let outcome = orchestrator.get_key_metrics(&params).await.expect("outcome");
    assert!(points_of(outcome).is_empty());
    let requests = fake.search_requests.lock().expect("requests");
    assert_eq!(requests[0].test_id.as_deref(), Some("294"));
}

#[tokio::test]
async fn auto_discovery_falls_back_to_the_known_test_id() {
    let (registry, fake) = FakeAdapter {
        tests_list_fails: true,
        search_pages: Mutex::new(vec![search_page(&[], None, false)]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.remove("test_id");
    let outcome = orchestrator.get_key_metrics(&params).await.expect("outcome");
    assert!(points_of(outcome).is_empty());
    let requests = fake.search_requests.lock().expect("requests");
    assert_eq!(requests[0].test_id.as_deref(), Some("109"));
}

#[tokio::test]
async fn run_id_skips_discovery_and_filters_by_run() {
    let (registry, fake) = FakeAdapter {
        search_pages: Mutex::new(vec![search_page(&[], None, false)]),
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.remove("test_id");
    params.insert("run_id".to_string(), json!("127723"));
    params.insert("merge_strategy".to_string(), json!("datasets_only"));
    let outcome = orchestrator.get_key_metrics(&params).await.expect("outcome");
    assert!(points_of(outcome).is_empty());
    let requests = fake.search_requests.lock().expect("requests");
    assert_eq!(requests[0].run_ids.as_deref(), Some(&["127723".to_string()][..]));
    assert_eq!(requests[0].test_id, None);
}

// ============================================================================
// SECTION: Label Path Request Tests
// ============================================================================

#[tokio::test]
async fn label_path_requests_metrics_and_filtering_with_server_filters() {
    let (registry, fake) = FakeAdapter {
        label_items: vec![label_bundle(2_000.0)],
        ..FakeAdapter::default()
    }
    .into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.insert("os_id".to_string(), json!("rhel"));
    params.insert("run_type".to_string(), json!("nightly"));
    orchestrator.get_key_metrics(&params).await.expect("outcome");

    let requests = fake.label_requests.lock().expect("requests");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.metrics);
    assert!(request.filtering);
    assert!(request.multi_filter);
    let filter = request.filter.as_ref().expect("filter");
    assert_eq!(filter.get("OS ID"), Some(&vec!["rhel".to_string()]));
    assert_eq!(filter.get("Run type"), Some(&vec!["nightly".to_string()]));
}

// ============================================================================
// SECTION: Raw and Plan Mode Tests
// ============================================================================

#[tokio::test]
async fn raw_mode_never_touches_the_adapter() {
    let (registry, fake) = FakeAdapter::default().into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let params = match json!({
        "dataset_types": ["boot-time-verbose"],
        "data": [{
            "boot_metrics": {
                "total_boot_time_ms": 12_500,
                "phases": {"kernel": 3_000, "initrd": 1_500, "userspace": 5_500},
            },
            "system_info": {"os_id": "rhel-9.2", "mode": "standard"},
            "timestamp": "2025-09-22T10:30:00Z",
        }],
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    let outcome = orchestrator.get_key_metrics(&params).await.expect("outcome");
    let points = points_of(outcome);
    assert_eq!(points.len(), 4);
    assert_eq!(fake.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_dataset_type_is_rejected_in_raw_mode() {
    let orchestrator = orchestrator_with(Arc::new(AdapterRegistry::new()));
    let err = orchestrator
        .get_key_metrics_raw(&["no-such-plugin".to_string()], &[json!({})], None, None)
        .await
        .expect_err("expected unknown dataset type");
    assert_eq!(err.kind, DomainErrorKind::UnknownDatasetType);
}

#[tokio::test]
async fn plan_only_returns_the_two_step_plan() {
    let (registry, fake) = FakeAdapter::default().into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.insert("plan_only".to_string(), json!(true));
    let outcome = orchestrator.get_key_metrics(&params).await.expect("outcome");
    let ToolOutcome::Plan(plan) = outcome else {
        panic!("expected plan outcome");
    };
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].tool, "datasets.search");
    assert_eq!(plan[1].tool, "datasets.get");
    // Plan mode performs no I/O.
    assert_eq!(fake.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn data_and_source_id_together_are_rejected() {
    let (registry, _fake) = FakeAdapter::default().into_registry("fake");
    let orchestrator = orchestrator_with(registry);
    let mut params = source_params();
    params.insert("data".to_string(), json!([{"boot_metrics": {}}]));
    let err = orchestrator.get_key_metrics(&params).await.expect_err("expected validation");
    assert_eq!(err.kind, DomainErrorKind::ValidationError);
}
