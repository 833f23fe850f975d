// crates/metric-gate-server/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Shared dispatch for the Domain MCP tool surface.
// Purpose: Give REST, JSON-RPC MCP, and the LLM loop one implementation of
//          each tool, plus the diagnostic extraction endpoint.
// Dependencies: metric-gate-contract, metric-gate-core, metric-gate-plugins,
//               serde_json
// ============================================================================

//! ## Overview
//! Every entry path (HTTP tool endpoints, the MCP transports, and the LLM
//! orchestrator) routes through this dispatcher so parameter normalization
//! and response shaping behave identically everywhere. Tool responses carry
//! the `domain_model_version` alongside the payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use metric_gate_contract::ExportedLabelValues;
use metric_gate_core::DOMAIN_MODEL_VERSION;
use metric_gate_core::MetricPoint;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::errors::ServerError;
use crate::llm::ToolHandler;
use crate::normalize::DETECTED_OS_FILTER;
use crate::normalize::DETECTED_RUN_TYPE;
use crate::normalize::normalize_get_key_metrics_params;
use crate::orchestrator::Orchestrator;
use crate::orchestrator::ToolOutcome;
use crate::resources::ResourceRegistry;

// ============================================================================
// SECTION: Debug Extraction Shapes
// ============================================================================

/// Request body for the diagnostic extraction endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugExtractRequest {
    /// Plugin identifier to run.
    pub dataset_type: String,
    /// Raw dataset body to extract from.
    #[serde(default)]
    pub dataset_json: Value,
    /// Optional label-value bundles to extract from.
    #[serde(default)]
    pub label_values: Option<Vec<ExportedLabelValues>>,
    /// Optional OS filter.
    #[serde(default)]
    pub os_filter: Option<String>,
    /// Optional run-type filter.
    #[serde(default)]
    pub run_type_filter: Option<String>,
}

/// Response of the diagnostic extraction endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DebugExtractResponse {
    /// Number of extracted points.
    pub metrics_extracted: usize,
    /// The extracted points.
    pub metric_points: Vec<MetricPoint>,
    /// Which path produced the points: `label_values` or `dataset`.
    pub extraction_path: &'static str,
    /// Filters that were applied.
    pub filters_applied: Value,
    /// Human-readable notes captured during extraction.
    pub logs: Vec<String>,
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Shared dispatcher for the Domain MCP tools.
pub struct ToolRouter {
    /// Fetch/merge orchestrator.
    orchestrator: Arc<Orchestrator>,
    /// Resources registry for `resources/read`.
    resources: Arc<ResourceRegistry>,
}

impl ToolRouter {
    /// Creates a router over the shared orchestrator and resources.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, resources: Arc<ResourceRegistry>) -> Self {
        Self {
            orchestrator,
            resources,
        }
    }

    /// Returns the shared orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Executes `get_key_metrics` and shapes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] from validation or upstream failures.
    pub async fn get_key_metrics(&self, params: Map<String, Value>) -> Result<Value, ServerError> {
        match self.orchestrator.get_key_metrics(&params).await? {
            ToolOutcome::Points(points) => Ok(json!({
                "metric_points": points,
                "domain_model_version": DOMAIN_MODEL_VERSION,
            })),
            ToolOutcome::Plan(plan) => Ok(json!({
                "fetch_plan": plan,
                "domain_model_version": DOMAIN_MODEL_VERSION,
            })),
        }
    }

    /// Executes `get_key_metrics_raw` (never touches any adapter).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] for unknown dataset types.
    pub async fn get_key_metrics_raw(
        &self,
        params: Map<String, Value>,
    ) -> Result<Value, ServerError> {
        let mut normalized = normalize_get_key_metrics_params(&params);
        let os_filter = normalized
            .remove(DETECTED_OS_FILTER)
            .and_then(|value| value.as_str().map(ToString::to_string));
        let run_type = normalized
            .remove(DETECTED_RUN_TYPE)
            .and_then(|value| value.as_str().map(ToString::to_string));
        let dataset_types: Vec<String> = match normalized.get("dataset_types") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(ToString::to_string))
                .collect(),
            _ => Vec::new(),
        };
        let data = match normalized.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let points = self
            .orchestrator
            .get_key_metrics_raw(&dataset_types, &data, os_filter.as_deref(), run_type.as_deref())
            .await?;
        Ok(json!({
            "metric_points": points,
            "domain_model_version": DOMAIN_MODEL_VERSION,
        }))
    }

    /// Dispatches a tool call by wire name (MCP `tools/call`).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::validation`] for unknown tool names and the
    /// tool's own errors otherwise.
    pub async fn call_tool(
        &self,
        name: &str,
        params: Map<String, Value>,
    ) -> Result<Value, ServerError> {
        match name {
            "get_key_metrics" => self.get_key_metrics(params).await,
            "get_key_metrics_raw" => self.get_key_metrics_raw(params).await,
            other => Err(ServerError::validation(format!("unknown tool: {other}"))),
        }
    }

    /// Runs a named plugin against supplied data for debugging.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the plugin is unknown.
    pub async fn debug_extract(
        &self,
        request: DebugExtractRequest,
    ) -> Result<DebugExtractResponse, ServerError> {
        let Some(plugin) = self.orchestrator.plugins().get(&request.dataset_type) else {
            return Err(ServerError::unknown_dataset_type(&request.dataset_type));
        };
        let mut logs = Vec::new();
        let label_values = request.label_values.unwrap_or_default();
        let has_labels = !label_values.is_empty();
        logs.push(format!(
            "plugin '{}' invoked with label_values={} dataset_json={}",
            request.dataset_type,
            label_values.len(),
            if request.dataset_json.is_null() { "absent" } else { "present" }
        ));
        let points = plugin
            .extract(
                &request.dataset_json,
                &BTreeMap::new(),
                has_labels.then_some(label_values.as_slice()),
                request.os_filter.as_deref(),
                request.run_type_filter.as_deref(),
            )
            .await;
        let extraction_path = if has_labels { "label_values" } else { "dataset" };
        logs.push(format!("extraction produced {} point(s) via {extraction_path}", points.len()));
        Ok(DebugExtractResponse {
            metrics_extracted: points.len(),
            metric_points: points,
            extraction_path,
            filters_applied: json!({
                "run_type": request.run_type_filter,
                "os": request.os_filter,
            }),
            logs,
        })
    }

    /// Builds the tool handler registry for the LLM orchestrator.
    ///
    /// The fixed map exposes `get_key_metrics` and `resources/read`.
    #[must_use]
    pub fn llm_tool_handlers(self: &Arc<Self>) -> BTreeMap<String, ToolHandler> {
        let mut handlers: BTreeMap<String, ToolHandler> = BTreeMap::new();

        let router = Arc::clone(self);
        handlers.insert(
            "get_key_metrics".to_string(),
            Arc::new(move |arguments: Map<String, Value>| {
                let router = Arc::clone(&router);
                let future: crate::llm::ToolHandlerFuture =
                    Box::pin(async move { router.get_key_metrics(arguments).await });
                future
            }),
        );

        let resources = Arc::clone(&self.resources);
        handlers.insert(
            "resources/read".to_string(),
            Arc::new(move |arguments: Map<String, Value>| {
                let resources = Arc::clone(&resources);
                let future: crate::llm::ToolHandlerFuture = Box::pin(async move {
                    let uri = arguments
                        .get("uri")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ServerError::validation("resources/read requires 'uri'"))?;
                    let contents = resources
                        .read_resource(uri)
                        .ok_or_else(|| {
                            ServerError::validation(format!("resource not found: {uri}"))
                        })?;
                    serde_json::to_value(contents).map_err(|err| {
                        ServerError::internal(format!("resource serialization failed: {err}"))
                    })
                });
                future
            }),
        );

        handlers
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
