// crates/metric-gate-server/src/orchestrator.rs
// ============================================================================
// Module: Fetch/Merge Orchestrator
// Description: Source-driven metric retrieval with merge strategies.
// Purpose: Choose between the label-value fast path and the dataset fallback
//          path, paginate fully, fan out fetches, and merge results.
// Dependencies: metric-gate-adapters, metric-gate-contract, metric-gate-core,
//               metric-gate-plugins, tokio, serde_json
// ============================================================================

//! ## Overview
//! `get_key_metrics` first normalizes its parameters, then dispatches: plan
//! only (no I/O), raw mode (caller-supplied bodies), or source-driven mode.
//! Source-driven execution auto-configures missing identifiers, attempts the
//! label-value fast path and/or the paginated dataset path according to the
//! merge strategy, fans out per-dataset fetches with partial-failure
//! aggregation (minimum success rate 0.5), and merges with label precedence
//! under a deterministic `(timestamp, metric_id)` order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use metric_gate_adapters::AdapterError;
use metric_gate_adapters::AdapterRegistry;
use metric_gate_adapters::SourceAdapter;
use metric_gate_contract::DatasetsGetRequest;
use metric_gate_contract::DatasetsSearchRequest;
use metric_gate_contract::ExportedLabelValues;
use metric_gate_contract::MergeStrategy;
use metric_gate_contract::RunLabelValuesRequest;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestsListRequest;
use metric_gate_core::FailureInfo;
use metric_gate_core::FailureKind;
use metric_gate_core::MetricPoint;
use metric_gate_core::PartialResult;
use metric_gate_core::SuccessRateError;
use metric_gate_plugins::PluginRegistry;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::errors::ServerError;
use crate::normalize::DETECTED_OS_FILTER;
use crate::normalize::DETECTED_RUN_TYPE;
use crate::normalize::normalize_get_key_metrics_params;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum fan-out success rate before the dataset path errors out.
const DATASET_MIN_SUCCESS_RATE: f64 = 0.5;

/// Known fallback test id for boot-time queries when discovery fails.
const FALLBACK_BOOT_TIME_TEST_ID: &str = "109";

/// Dataset type handled by the boot-time fast path.
const BOOT_TIME_DATASET_TYPE: &str = "boot-time-verbose";

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Single client-executed step of a fetch plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchPlanStep {
    /// Contract tool to invoke.
    pub tool: String,
    /// Arguments matching the Source MCP contract.
    pub args: Value,
}

/// Result of a `get_key_metrics` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Extracted metric points.
    Points(Vec<MetricPoint>),
    /// Client-executable fetch plan (plan-only mode).
    Plan(Vec<FetchPlanStep>),
}

// ============================================================================
// SECTION: Partial Fan-Out
// ============================================================================

/// Awaits all operations, aggregating successes and classified failures.
///
/// Operations run as independent tasks; completion order does not matter
/// because successes are re-collected in task-creation order. Nothing aborts
/// early: every operation runs to completion before the success rate is
/// checked.
///
/// # Errors
///
/// Returns [`SuccessRateError`] when the final success rate falls below
/// `min_success_rate`.
pub async fn gather_partial<T, F>(
    operations: Vec<(String, F)>,
    operation_type: &str,
    min_success_rate: f64,
) -> Result<PartialResult<T>, SuccessRateError>
where
    F: Future<Output = Result<T, AdapterError>> + Send + 'static,
    T: Send + 'static,
{
    let mut handles = Vec::with_capacity(operations.len());
    for (identifier, operation) in operations {
        handles.push((identifier, tokio::spawn(operation)));
    }
    let mut result = PartialResult::new();
    for (identifier, handle) in handles {
        match handle.await {
            Ok(Ok(value)) => result.successes.push(value),
            Ok(Err(error)) => {
                let kind = error.failure_kind();
                tracing::warn!(
                    identifier = %identifier,
                    error_type = kind.as_str(),
                    retryable = kind.is_retryable(),
                    error = %error,
                    "partial_results.operation_failed"
                );
                result.failures.push(FailureInfo::new(identifier, error.to_string(), kind));
            }
            Err(join_error) => {
                result.failures.push(FailureInfo::new(
                    identifier,
                    join_error.to_string(),
                    FailureKind::UnknownError,
                ));
            }
        }
    }
    tracing::info!(
        operation = operation_type,
        successes = result.successes.len(),
        failures = result.failures.len(),
        success_rate = result.success_rate(),
        "partial_results.complete"
    );
    result.check_success_rate(min_success_rate, operation_type)?;
    Ok(result)
}

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Merges and de-duplicates metric points per the merge strategy.
///
/// COMPREHENSIVE keys points by `(metric_id, timestamp)`, inserting dataset
/// points first so label points win on conflict, and sorts the output by
/// `(timestamp, metric_id)` for determinism.
#[must_use]
pub fn merge_metric_points(
    label_points: Vec<MetricPoint>,
    dataset_points: Vec<MetricPoint>,
    strategy: MergeStrategy,
) -> Vec<MetricPoint> {
    match strategy {
        MergeStrategy::DatasetsOnly => dataset_points,
        MergeStrategy::LabelsOnly => label_points,
        MergeStrategy::PreferFast => {
            if label_points.is_empty() {
                dataset_points
            } else {
                label_points
            }
        }
        MergeStrategy::Comprehensive => {
            let label_count = label_points.len();
            let dataset_count = dataset_points.len();
            let mut merged: BTreeMap<(String, String), MetricPoint> = BTreeMap::new();
            for point in dataset_points {
                merged.insert(point.merge_key(), point);
            }
            for point in label_points {
                merged.insert(point.merge_key(), point);
            }
            let mut result: Vec<MetricPoint> = merged.into_values().collect();
            result.sort_by(|a, b| {
                a.timestamp.cmp(&b.timestamp).then_with(|| a.metric_id.cmp(&b.metric_id))
            });
            if label_count > 0 && dataset_count > 0 {
                tracing::info!(
                    label_points = label_count,
                    dataset_points = dataset_count,
                    merged_points = result.len(),
                    duplicates_removed = label_count + dataset_count - result.len(),
                    "merge.deduplication"
                );
            }
            result
        }
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Normalized source-driven query parameters.
#[derive(Debug, Clone)]
struct SourceQuery {
    /// Resolved source id.
    source_id: String,
    /// Dataset-type plugin ids to apply.
    dataset_types: Vec<String>,
    /// Test filter (possibly auto-discovered).
    test_id: String,
    /// Run filter; when set, time filters are ignored.
    run_id: String,
    /// Dataset schema filter.
    schema_uri: String,
    /// Start time filter (backend-interpreted).
    from_time: String,
    /// End time filter (backend-interpreted).
    to_time: String,
    /// Page size for search pagination.
    limit: u64,
    /// Merge strategy.
    strategy: MergeStrategy,
}

/// Fetch/merge orchestrator behind `get_key_metrics`.
///
/// # Invariants
/// - Registries are shared read-only; the orchestrator holds no mutable
///   state of its own.
pub struct Orchestrator {
    /// Source adapter registry.
    adapters: Arc<AdapterRegistry>,
    /// Dataset-type plugin registry.
    plugins: Arc<PluginRegistry>,
}

impl Orchestrator {
    /// Creates an orchestrator over the shared registries.
    #[must_use]
    pub fn new(adapters: Arc<AdapterRegistry>, plugins: Arc<PluginRegistry>) -> Self {
        Self {
            adapters,
            plugins,
        }
    }

    /// Returns the shared adapter registry.
    #[must_use]
    pub fn adapters(&self) -> &Arc<AdapterRegistry> {
        &self.adapters
    }

    /// Returns the shared plugin registry.
    #[must_use]
    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    /// Executes `get_key_metrics` over a raw parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] for validation failures, unknown identifiers,
    /// and upstream errors that survive the partial-failure gate.
    pub async fn get_key_metrics(
        &self,
        raw_params: &Map<String, Value>,
    ) -> Result<ToolOutcome, ServerError> {
        let mut params = normalize_get_key_metrics_params(raw_params);
        let os_filter = take_string(&mut params, DETECTED_OS_FILTER);
        let run_type = take_string(&mut params, DETECTED_RUN_TYPE);

        let plan_only = params.get("plan_only").and_then(Value::as_bool).unwrap_or(false);
        let data = match params.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let source_id = string_param(&params, "source_id");
        let dataset_types = string_list_param(&params, "dataset_types");
        let test_id = string_param(&params, "test_id");
        let run_id = string_param(&params, "run_id");
        let schema_uri = string_param(&params, "schema_uri");
        let from_time = string_param(&params, "from");
        let to_time = string_param(&params, "to");
        let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(100);
        let strategy = parse_merge_strategy(&params)?;

        if !data.is_empty() && !source_id.is_empty() {
            return Err(ServerError::validation(
                "provide either 'data' (raw mode) or 'source_id' (source mode), not both",
            ));
        }

        if plan_only {
            return Ok(ToolOutcome::Plan(build_fetch_plan(&test_id, &schema_uri, limit)));
        }

        if !data.is_empty() {
            let points = self
                .get_key_metrics_raw(&dataset_types, &data, os_filter.as_deref(), run_type.as_deref())
                .await?;
            return Ok(ToolOutcome::Points(points));
        }

        // Source-driven mode: auto-configure what the caller left blank.
        let source_id = if source_id.is_empty() {
            let available = self.adapters.source_ids();
            match available.first() {
                Some(first) => {
                    tracing::info!(source_id = %first, "auto.source_id");
                    first.clone()
                }
                None => {
                    return Err(ServerError::missing_configuration(
                        "no sources configured; set DOMAIN_MCP_CONFIG or provide 'data' for \
                         raw mode",
                    ));
                }
            }
        } else {
            source_id
        };
        let dataset_types = if dataset_types.is_empty() {
            tracing::info!(dataset_types = ?[BOOT_TIME_DATASET_TYPE], "auto.dataset_types");
            vec![BOOT_TIME_DATASET_TYPE.to_string()]
        } else {
            dataset_types
        };

        let Some(adapter) = self.adapters.get(&source_id) else {
            return Err(ServerError::unknown_source_id(&source_id, self.adapters.source_ids()));
        };

        let test_id = if run_id.is_empty() {
            self.auto_discover_test_id(&adapter, &dataset_types, test_id).await
        } else {
            // The run is the query: discovery and time filters are skipped.
            tracing::info!(run_id = %run_id, "run_id.provided");
            test_id
        };

        let query = SourceQuery {
            source_id,
            dataset_types,
            test_id,
            run_id,
            schema_uri,
            from_time,
            to_time,
            limit,
            strategy,
        };
        tracing::info!(
            source_id = %query.source_id,
            test_id = %query.test_id,
            run_id = %query.run_id,
            os_filter = ?os_filter,
            run_type = ?run_type,
            strategy = query.strategy.as_str(),
            "query.start"
        );

        let (label_points, dataset_points) = self
            .fetch_from_sources(&adapter, &query, os_filter.as_deref(), run_type.as_deref())
            .await?;
        let points = merge_metric_points(label_points, dataset_points, query.strategy);
        tracing::info!(points = points.len(), "query.complete");
        Ok(ToolOutcome::Points(points))
    }

    /// Raw-mode extraction: feeds bodies straight to the selected plugins.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when a named dataset type has no registered
    /// plugin.
    pub async fn get_key_metrics_raw(
        &self,
        dataset_types: &[String],
        data: &[Value],
        os_filter: Option<&str>,
        run_type_filter: Option<&str>,
    ) -> Result<Vec<MetricPoint>, ServerError> {
        let refs = BTreeMap::new();
        let mut points = Vec::new();
        for plugin_id in dataset_types {
            let Some(plugin) = self.plugins.get(plugin_id) else {
                return Err(ServerError::unknown_dataset_type(plugin_id));
            };
            for body in data {
                let extracted =
                    plugin.extract(body, &refs, None, os_filter, run_type_filter).await;
                points.extend(extracted);
            }
        }
        tracing::debug!(points = points.len(), "metrics.extract_raw.done");
        Ok(points)
    }

    /// Fetches label and/or dataset points according to the merge strategy.
    async fn fetch_from_sources(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        query: &SourceQuery,
        os_filter: Option<&str>,
        run_type_filter: Option<&str>,
    ) -> Result<(Vec<MetricPoint>, Vec<MetricPoint>), ServerError> {
        let fetch_labels = matches!(
            query.strategy,
            MergeStrategy::PreferFast | MergeStrategy::Comprehensive | MergeStrategy::LabelsOnly
        );
        let mut fetch_datasets = matches!(
            query.strategy,
            MergeStrategy::DatasetsOnly | MergeStrategy::Comprehensive
        );

        let mut label_points = Vec::new();
        if fetch_labels {
            let items = self.fetch_label_values(adapter, query, os_filter, run_type_filter).await;
            if !items.is_empty() {
                if let Some(plugin) = query
                    .dataset_types
                    .first()
                    .and_then(|plugin_id| self.plugins.get(plugin_id))
                {
                    label_points = plugin
                        .extract(
                            &Value::Object(Map::new()),
                            &BTreeMap::new(),
                            Some(&items),
                            os_filter,
                            run_type_filter,
                        )
                        .await;
                }
                tracing::info!(
                    points = label_points.len(),
                    strategy = query.strategy.as_str(),
                    "fetch.label_values.complete"
                );
            }
        }

        if query.strategy == MergeStrategy::PreferFast {
            if !label_points.is_empty() {
                return Ok((label_points, Vec::new()));
            }
            fetch_datasets = true;
        }

        let mut dataset_points = Vec::new();
        if fetch_datasets {
            let bodies = self.fetch_source_datasets(adapter, query).await?;
            dataset_points = self
                .get_key_metrics_raw(&query.dataset_types, &bodies, os_filter, run_type_filter)
                .await?;
            tracing::info!(
                points = dataset_points.len(),
                strategy = query.strategy.as_str(),
                "fetch.datasets.complete"
            );
        }

        if query.strategy == MergeStrategy::LabelsOnly && label_points.is_empty() {
            return Err(ServerError::validation(
                "merge_strategy=labels_only but no label values are available; label values \
                 may not be supported for this query or data source",
            ));
        }

        Ok((label_points, dataset_points))
    }

    /// Fetches pre-aggregated label values when the query allows it.
    ///
    /// Only the boot-time dataset type has a label fast path. Failures are
    /// swallowed so the caller can fall back to the dataset path.
    async fn fetch_label_values(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        query: &SourceQuery,
        os_filter: Option<&str>,
        run_type_filter: Option<&str>,
    ) -> Vec<ExportedLabelValues> {
        if !query.dataset_types.iter().any(|dataset| dataset == BOOT_TIME_DATASET_TYPE) {
            return Vec::new();
        }
        if !query.run_id.is_empty() {
            let request = RunLabelValuesRequest {
                run_id: query.run_id.clone(),
                page_size: query.limit,
                ..RunLabelValuesRequest::default()
            };
            return match adapter.get_run_label_values(request).await {
                Ok(response) => response.items,
                Err(error) => {
                    tracing::debug!(error = %error, "fetch.label_values.run_path_failed");
                    Vec::new()
                }
            };
        }
        if query.test_id.is_empty() {
            return Vec::new();
        }

        // Request both metrics and filtering (dimension) labels; the default
        // metrics-only view drops OS ID, Mode, and Target.
        let mut filter: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(os_id) = os_filter {
            filter.insert("OS ID".to_string(), vec![os_id.to_string()]);
        }
        if let Some(run_type) = run_type_filter {
            // Exact server-side match only; legacy Test Description data is
            // re-filtered client-side by the plugin.
            filter.insert("Run type".to_string(), vec![run_type.to_string()]);
        }
        let has_filter = !filter.is_empty();
        let request = TestLabelValuesRequest {
            test_id: query.test_id.clone(),
            metrics: true,
            filtering: true,
            before: (!query.to_time.is_empty()).then(|| query.to_time.clone()),
            after: (!query.from_time.is_empty()).then(|| query.from_time.clone()),
            filter: has_filter.then_some(filter),
            multi_filter: has_filter,
            page_size: query.limit,
            ..TestLabelValuesRequest::default()
        };
        match adapter.get_test_label_values(request).await {
            Ok(response) => response.items,
            Err(error) => {
                tracing::debug!(error = %error, "fetch.label_values.test_path_failed");
                Vec::new()
            }
        }
    }

    /// Collects dataset bodies through full pagination plus fan-out fetches.
    async fn fetch_source_datasets(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        query: &SourceQuery,
    ) -> Result<Vec<Value>, ServerError> {
        let mut dataset_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0_u32;
        loop {
            page_count += 1;
            let request = DatasetsSearchRequest {
                test_id: (!query.test_id.is_empty()).then(|| query.test_id.clone()),
                schema_uri: (!query.schema_uri.is_empty()).then(|| query.schema_uri.clone()),
                run_ids: (!query.run_id.is_empty()).then(|| vec![query.run_id.clone()]),
                from_time: (!query.from_time.is_empty()).then(|| query.from_time.clone()),
                to_time: (!query.to_time.is_empty()).then(|| query.to_time.clone()),
                page_token: page_token.clone(),
                page_size: query.limit,
                ..DatasetsSearchRequest::default()
            };
            let response = adapter
                .datasets_search(request)
                .await
                .map_err(|error| ServerError::from_adapter(&error))?;
            dataset_ids.extend(response.datasets.into_iter().map(|dataset| dataset.dataset_id));
            if !response.pagination.has_more {
                break;
            }
            match response.pagination.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    // A malformed backend must not trap us in a loop.
                    tracing::warn!("pagination reported has_more without a next_page_token");
                    break;
                }
            }
        }
        tracing::debug!(total = dataset_ids.len(), pages = page_count, "fetch.datasets.search_done");
        if dataset_ids.is_empty() {
            return Ok(Vec::new());
        }

        let operations: Vec<_> = dataset_ids
            .into_iter()
            .map(|dataset_id| {
                let adapter = Arc::clone(adapter);
                let request_id = dataset_id.clone();
                (dataset_id, async move {
                    adapter
                        .datasets_get(DatasetsGetRequest {
                            dataset_id: request_id,
                            ..DatasetsGetRequest::default()
                        })
                        .await
                })
            })
            .collect();
        let result = gather_partial(operations, "dataset fetch", DATASET_MIN_SUCCESS_RATE)
            .await
            .map_err(|error| {
                ServerError::new(metric_gate_core::DomainErrorKind::UpstreamError, error.to_string())
            })?;
        if result.has_failures() {
            tracing::warn!(
                summary = %result.failure_summary("dataset fetch"),
                "fetch.datasets.partial_failure"
            );
        }

        // Flatten list contents into individual bodies; keep objects as-is.
        let mut bodies = Vec::new();
        for response in result.successes {
            match response.content {
                Value::Array(items) => bodies.extend(items),
                other => bodies.push(other),
            }
        }
        Ok(bodies)
    }

    /// Auto-discovers a boot-time test id when none was provided.
    ///
    /// Queries for `boot-time-verbose` first, then broadens to `boot` minus
    /// framework boot tests, and finally falls back to the known default id.
    async fn auto_discover_test_id(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        dataset_types: &[String],
        test_id: String,
    ) -> String {
        if !test_id.is_empty() || dataset_types.is_empty() {
            return test_id;
        }
        if !dataset_types.iter().any(|dataset| dataset == BOOT_TIME_DATASET_TYPE) {
            return test_id;
        }

        let exact = adapter
            .tests_list(TestsListRequest {
                query: Some(BOOT_TIME_DATASET_TYPE.to_string()),
                page_size: 10,
                ..TestsListRequest::default()
            })
            .await;
        match exact {
            Ok(response) => {
                let matched = response
                    .tests
                    .iter()
                    .find(|test| test.name.to_lowercase().contains(BOOT_TIME_DATASET_TYPE));
                if let Some(test) = matched {
                    tracing::info!(
                        name = %test.name,
                        test_id = %test.test_id,
                        "boot_time.test_selected"
                    );
                    return test.test_id.clone();
                }
                let broad = adapter
                    .tests_list(TestsListRequest {
                        query: Some("boot".to_string()),
                        page_size: 50,
                        ..TestsListRequest::default()
                    })
                    .await;
                if let Ok(response) = broad {
                    let matched = response.tests.iter().find(|test| {
                        let name = test.name.to_lowercase();
                        name.contains("boot-time")
                            && !name.contains("quarkus")
                            && !name.contains("spring")
                    });
                    if let Some(test) = matched {
                        tracing::info!(
                            name = %test.name,
                            test_id = %test.test_id,
                            "boot_time.test_selected"
                        );
                        return test.test_id.clone();
                    }
                }
                tracing::warn!("boot_time.no_tests_found");
            }
            Err(error) => {
                tracing::warn!(error = %error, "boot_time.test_discovery_failed");
            }
        }
        tracing::info!(test_id = FALLBACK_BOOT_TIME_TEST_ID, "boot_time.using_fallback_test_id");
        FALLBACK_BOOT_TIME_TEST_ID.to_string()
    }
}

// ============================================================================
// SECTION: Plan Building
// ============================================================================

/// Builds a client-executable fetch plan (`datasets.search` then
/// `datasets.get`).
#[must_use]
pub fn build_fetch_plan(test_id: &str, schema_uri: &str, limit: u64) -> Vec<FetchPlanStep> {
    vec![
        FetchPlanStep {
            tool: "datasets.search".to_string(),
            args: json!({
                "test_id": (!test_id.is_empty()).then_some(test_id),
                "schema_uri": (!schema_uri.is_empty()).then_some(schema_uri),
                "page_size": limit,
            }),
        },
        FetchPlanStep {
            tool: "datasets.get".to_string(),
            args: json!({"dataset_id": "<id from datasets.search>"}),
        },
    ]
}

// ============================================================================
// SECTION: Parameter Helpers
// ============================================================================

/// Removes a string parameter, returning it when present and non-empty.
fn take_string(params: &mut Map<String, Value>, key: &str) -> Option<String> {
    params
        .remove(key)
        .and_then(|value| value.as_str().map(ToString::to_string))
        .filter(|text| !text.is_empty())
}

/// Reads a string parameter, defaulting to empty.
fn string_param(params: &Map<String, Value>, key: &str) -> String {
    params.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Reads a string-list parameter, dropping non-string entries.
fn string_list_param(params: &Map<String, Value>, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(ToString::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses the merge strategy parameter, defaulting to `prefer_fast`.
fn parse_merge_strategy(params: &Map<String, Value>) -> Result<MergeStrategy, ServerError> {
    match params.get("merge_strategy") {
        None => Ok(MergeStrategy::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
            ServerError::validation(format!(
                "invalid merge_strategy: {value}; expected one of prefer_fast, comprehensive, \
                 labels_only, datasets_only"
            ))
        }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
