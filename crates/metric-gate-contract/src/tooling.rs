// crates/metric-gate-contract/src/tooling.rs
// ============================================================================
// Module: Domain Tool Surface
// Description: Tool names and hand-written JSON schemas for MCP clients.
// Purpose: Provide the stable tools/list payload without schema reflection.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The Domain MCP exposes two tools. Their input schemas are written by hand
//! and kept here as the single source of truth for MCP `tools/list`, the HTTP
//! OpenAPI-ish documentation, and tests. Descriptions double as LLM guidance,
//! so they spell out the auto-configuration rules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical MCP tool names for the Domain MCP.
///
/// # Invariants
/// - Wire strings are stable; clients match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolName {
    /// Source-driven or raw metric retrieval with merge strategies.
    #[serde(rename = "get_key_metrics")]
    GetKeyMetrics,
    /// Raw-mode extraction only; never touches a source adapter.
    #[serde(rename = "get_key_metrics_raw")]
    GetKeyMetricsRaw,
}

impl ToolName {
    /// Returns the stable wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetKeyMetrics => "get_key_metrics",
            Self::GetKeyMetricsRaw => "get_key_metrics_raw",
        }
    }

    /// Parses a wire name into a tool, when known.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get_key_metrics" => Some(Self::GetKeyMetrics),
            "get_key_metrics_raw" => Some(Self::GetKeyMetricsRaw),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool definition used by MCP tool listing.
///
/// # Invariants
/// - `input_schema` is a JSON Schema payload for the tool input shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: ToolName,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    pub input_schema: Value,
}

/// Returns the tool definitions exposed by the Domain MCP, ordered by name.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ToolName::GetKeyMetrics,
            description: "Get key performance metrics from configured sources. \
                          All parameters are optional: source_id defaults to the first \
                          configured source, dataset_types to ['boot-time-verbose'], and \
                          test_id is auto-discovered for boot-time queries. Provide run_id \
                          to fetch a single run (time filters are then ignored), or provide \
                          'data' to extract from supplied dataset bodies without touching \
                          any source."
                .to_string(),
            input_schema: get_key_metrics_schema(),
        },
        ToolDefinition {
            name: ToolName::GetKeyMetricsRaw,
            description: "Extract key metrics from caller-provided dataset JSON bodies \
                          using the named dataset-type plugins. Never contacts a source."
                .to_string(),
            input_schema: get_key_metrics_raw_schema(),
        },
    ]
}

/// JSON schema for `get_key_metrics` input.
fn get_key_metrics_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "source_id": {
                "type": "string",
                "description": "Logical source identifier; defaults to the first configured source."
            },
            "test_id": {
                "type": "string",
                "description": "Test filter for dataset search; auto-discovered for boot-time queries."
            },
            "run_id": {
                "type": "string",
                "description": "Fetch metrics for one specific run; overrides time filters."
            },
            "dataset_types": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Plugin identifiers to apply; defaults to ['boot-time-verbose']."
            },
            "schema_uri": {
                "type": "string",
                "description": "Dataset schema filter."
            },
            "from_timestamp": {
                "type": "string",
                "description": "Start time filter: ISO 8601, epoch millis, or natural language."
            },
            "to_timestamp": {
                "type": "string",
                "description": "End time filter: ISO 8601, epoch millis, or natural language."
            },
            "os_id": {
                "type": "string",
                "description": "OS identifier filter (e.g. 'rhel', 'autosd')."
            },
            "run_type": {
                "type": "string",
                "description": "Run type filter: nightly, ci, release, or manual."
            },
            "limit": {
                "type": "integer",
                "default": 100,
                "description": "Page size for dataset fetching; the server paginates all results."
            },
            "merge_strategy": {
                "type": "string",
                "enum": ["prefer_fast", "comprehensive", "labels_only", "datasets_only"],
                "default": "prefer_fast",
                "description": "How label values and datasets are combined."
            },
            "data": {
                "type": "array",
                "items": {"type": "object"},
                "description": "Raw dataset bodies; when present no source is contacted."
            },
            "plan_only": {
                "type": "boolean",
                "default": false,
                "description": "Return a client-executable fetch plan instead of data."
            }
        },
        "additionalProperties": true
    })
}

/// JSON schema for `get_key_metrics_raw` input.
fn get_key_metrics_raw_schema() -> Value {
    json!({
        "type": "object",
        "required": ["dataset_types", "data"],
        "properties": {
            "dataset_types": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Plugin identifiers to apply."
            },
            "data": {
                "type": "array",
                "items": {"type": "object"},
                "description": "Raw dataset JSON bodies."
            },
            "os_id": {
                "type": "string",
                "description": "OS identifier filter."
            },
            "run_type": {
                "type": "string",
                "description": "Run type filter."
            }
        },
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
