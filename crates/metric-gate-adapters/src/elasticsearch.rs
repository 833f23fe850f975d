// crates/metric-gate-adapters/src/elasticsearch.rs
// ============================================================================
// Module: Elasticsearch Adapter
// Description: Contract reinterpretation mapping indices and documents.
// Purpose: Let the generic orchestration run against Elasticsearch data.
// Dependencies: metric-gate-contract, serde_json
// ============================================================================

//! ## Overview
//! Elasticsearch has no tests or runs, so the contract is reinterpreted:
//! tests are indices (tool `list_indices`), datasets are documents (tool
//! `search` with a Query DSL range on `@timestamp`), and dataset identifiers
//! are composites of the form `<index>::<doc_id>`. Label-value operations
//! return empty results, which forces the orchestrator onto the dataset
//! path; runs are empty and artifacts are unsupported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
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
use metric_gate_contract::Pagination;
use metric_gate_contract::RunLabelValuesRequest;
use metric_gate_contract::RunLabelValuesResponse;
use metric_gate_contract::RunsListRequest;
use metric_gate_contract::RunsListResponse;
use metric_gate_contract::SourceCapabilities;
use metric_gate_contract::SourceDescribeRequest;
use metric_gate_contract::SourceDescribeResponse;
use metric_gate_contract::SourceLimits;
use metric_gate_contract::SourceType;
use metric_gate_contract::TestInfo;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestLabelValuesResponse;
use metric_gate_contract::TestsListRequest;
use metric_gate_contract::TestsListResponse;
use serde_json::Value;
use serde_json::json;

use crate::AdapterError;
use crate::SourceAdapter;
use crate::stdio::BridgeTransport;
use crate::stdio::call_with_deadline;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Implementation version advertised by `source.describe`.
const ADAPTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Separator joining an index name and a document id into a dataset id.
const COMPOSITE_ID_SEPARATOR: &str = "::";

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Source MCP adapter mapping the contract onto an Elasticsearch MCP.
///
/// # Invariants
/// - Dataset identifiers always carry the `<index>::<doc_id>` shape.
pub struct ElasticsearchAdapter {
    /// Underlying stdio transport to the Elasticsearch MCP.
    transport: Arc<dyn BridgeTransport>,
    /// Deadline applied to every tool invocation, in seconds.
    timeout_seconds: u64,
}

impl ElasticsearchAdapter {
    /// Creates an adapter over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn BridgeTransport>, timeout_seconds: u64) -> Self {
        Self {
            transport,
            timeout_seconds,
        }
    }

    /// Invokes a remote Elasticsearch tool under the deadline.
    async fn call(&self, tool: &'static str, args: Value) -> Result<Value, AdapterError> {
        call_with_deadline(self.timeout_seconds, tool, self.transport.call_tool(tool, args)).await
    }
}

/// Splits a composite dataset id into its index and document parts.
fn split_composite_id(dataset_id: &str) -> Result<(&str, &str), AdapterError> {
    dataset_id.split_once(COMPOSITE_ID_SEPARATOR).ok_or_else(|| AdapterError::Protocol {
        message: format!("invalid dataset_id format, expected 'index::doc_id': {dataset_id}"),
    })
}

/// Parses a numeric page token, defaulting to zero.
fn parse_offset_token(token: Option<&String>) -> u64 {
    token.and_then(|value| value.parse::<u64>().ok()).unwrap_or(0)
}

// ============================================================================
// SECTION: Contract Implementation
// ============================================================================

#[async_trait]
impl SourceAdapter for ElasticsearchAdapter {
    async fn source_describe(
        &self,
        _req: SourceDescribeRequest,
    ) -> Result<SourceDescribeResponse, AdapterError> {
        Ok(SourceDescribeResponse {
            source_type: SourceType::Elasticsearch,
            version: ADAPTER_VERSION.to_string(),
            contract_version: ContractVersion::V1_0_0,
            capabilities: SourceCapabilities {
                pagination: true,
                caching: false,
                streaming: false,
                schemas: true,
            },
            limits: Some(SourceLimits {
                max_page_size: Some(1000),
                max_dataset_size: None,
                rate_limit_per_minute: None,
            }),
        })
    }

    async fn tests_list(&self, req: TestsListRequest) -> Result<TestsListResponse, AdapterError> {
        let pattern = req.query.clone().unwrap_or_else(|| "*".to_string());
        let result = match self.call("list_indices", json!({"index_pattern": pattern})).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "elasticsearch.list_indices_failed");
                return Ok(TestsListResponse::default());
            }
        };

        // The tool may answer with a bare list or an object wrapper.
        let indices: Vec<Value> = match result {
            Value::Array(items) => items,
            Value::Object(object) => object
                .get("indices")
                .or_else(|| object.get("items"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let tests: Vec<TestInfo> = indices
            .iter()
            .map(|index| {
                let name = index.as_str().map_or_else(
                    || {
                        index
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    },
                    ToString::to_string,
                );
                TestInfo {
                    test_id: name.clone(),
                    name,
                    description: Some("Elasticsearch Index".to_string()),
                    tags: Some(vec!["elasticsearch".to_string(), "index".to_string()]),
                    created_at: None,
                    updated_at: None,
                }
            })
            .collect();

        // list_indices returns everything; page the flat list locally.
        let start = usize::try_from(parse_offset_token(req.page_token.as_ref())).unwrap_or(0);
        let page_size = usize::try_from(req.page_size).unwrap_or(100);
        let end = start.saturating_add(page_size).min(tests.len());
        let page = tests.get(start..end).map(<[TestInfo]>::to_vec).unwrap_or_default();
        let has_more = end < tests.len();
        Ok(TestsListResponse {
            pagination: Pagination {
                has_more,
                next_page_token: has_more.then(|| end.to_string()),
                total_count: Some(tests.len() as u64),
            },
            tests: page,
            cache_info: None,
        })
    }

    async fn runs_list(&self, _req: RunsListRequest) -> Result<RunsListResponse, AdapterError> {
        // Elasticsearch has no run concept.
        Ok(RunsListResponse {
            runs: Vec::new(),
            pagination: Pagination {
                has_more: false,
                next_page_token: None,
                total_count: Some(0),
            },
            cache_info: None,
        })
    }

    async fn datasets_search(
        &self,
        req: DatasetsSearchRequest,
    ) -> Result<DatasetsSearchResponse, AdapterError> {
        let Some(index) = req.test_id.as_ref().filter(|index| !index.is_empty()) else {
            return Ok(DatasetsSearchResponse::default());
        };

        let mut filters: Vec<Value> = Vec::new();
        if req.from_time.is_some() || req.to_time.is_some() {
            let mut range = serde_json::Map::new();
            if let Some(from_time) = &req.from_time {
                range.insert("gte".to_string(), json!(from_time));
            }
            if let Some(to_time) = &req.to_time {
                range.insert("lte".to_string(), json!(to_time));
            }
            filters.push(json!({"range": {"@timestamp": Value::Object(range)}}));
        }
        let offset = parse_offset_token(req.page_token.as_ref());
        let mut query_body = json!({
            "size": req.page_size,
            "sort": [{"@timestamp": "desc"}],
            "query": {"bool": {"filter": filters}},
        });
        if offset > 0 {
            if let Value::Object(object) = &mut query_body {
                object.insert("from".to_string(), json!(offset));
            }
        }

        let result = match self
            .call("search", json!({"index": index, "query_body": query_body}))
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "elasticsearch.search_failed");
                return Ok(DatasetsSearchResponse::default());
            }
        };

        let hits = result
            .get("hits")
            .and_then(|hits| hits.get("hits"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total = result
            .get("hits")
            .and_then(|hits| hits.get("total"))
            .and_then(|total| total.get("value"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let datasets: Vec<DatasetInfo> = hits
            .iter()
            .filter_map(|hit| {
                let doc_id = hit.get("_id").and_then(Value::as_str)?;
                let source = hit.get("_source");
                Some(DatasetInfo {
                    dataset_id: format!("{index}{COMPOSITE_ID_SEPARATOR}{doc_id}"),
                    run_id: "unknown".to_string(),
                    test_id: index.clone(),
                    schema_uri: None,
                    name: Some(format!("Log {doc_id}")),
                    description: None,
                    tags: None,
                    created_at: source
                        .and_then(|body| body.get("@timestamp"))
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                    size_bytes: None,
                    content_type: "application/json".to_string(),
                })
            })
            .collect();

        let next_offset = offset.saturating_add(hits.len() as u64);
        let has_more = next_offset < total;
        Ok(DatasetsSearchResponse {
            datasets,
            pagination: Pagination {
                has_more,
                next_page_token: has_more.then(|| next_offset.to_string()),
                total_count: Some(total),
            },
            cache_info: None,
        })
    }

    async fn datasets_get(
        &self,
        req: DatasetsGetRequest,
    ) -> Result<DatasetsGetResponse, AdapterError> {
        let (index, doc_id) = split_composite_id(&req.dataset_id)?;
        let query_body = json!({"query": {"ids": {"values": [doc_id]}}});
        let result =
            self.call("search", json!({"index": index, "query_body": query_body})).await?;
        let hits = result
            .get("hits")
            .and_then(|hits| hits.get("hits"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(document) = hits.first() else {
            return Err(AdapterError::Status {
                status: 404,
                body_preview: format!("document not found: {}", req.dataset_id),
            });
        };
        let mut content = document.get("_source").cloned().unwrap_or_else(|| json!({}));
        if let Value::Object(object) = &mut content {
            if let Some(es_id) = document.get("_id") {
                object.insert("_es_id".to_string(), es_id.clone());
            }
            if let Some(es_index) = document.get("_index") {
                object.insert("_es_index".to_string(), es_index.clone());
            }
        }
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
        // Not natively supported; empty forces the dataset path.
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
