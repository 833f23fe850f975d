// crates/metric-gate-contract/src/types.rs
// ============================================================================
// Module: Source MCP Contract Types
// Description: Request/response shapes for the Source MCP Contract v1.0.0.
// Purpose: Give adapters and the orchestrator one typed wire vocabulary.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each contract operation is an async request/response pair. The shapes here
//! are deliberately tolerant on input (aliases for camelCase spellings,
//! defaults for optional fields) and canonical on output (camelCase only
//! where the cross-ecosystem contract requires it, e.g. `multiFilter`).
//! Backend responses are untrusted; adapters validate by deserializing into
//! these types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Versioning
// ============================================================================

/// Source MCP Contract version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractVersion {
    /// Contract version 1.0.0.
    #[serde(rename = "1.0.0")]
    V1_0_0,
}

/// Known source backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// Horreum performance database.
    Horreum,
    /// Generic custom backend.
    CustomBackend,
    /// Data warehouse backend.
    DataWarehouse,
    /// Elasticsearch cluster.
    Elasticsearch,
}

/// Standardized contract error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request was malformed or failed validation.
    InvalidRequest,
    /// Referenced entity does not exist.
    NotFound,
    /// Caller exceeded a rate limit.
    RateLimited,
    /// Backend failed internally.
    InternalError,
    /// Backend is temporarily unavailable.
    ServiceUnavailable,
    /// Backend timed out.
    Timeout,
}

/// Data-source merging strategy for `get_key_metrics` queries.
///
/// Controls which of the label-value fast path and the dataset fallback path
/// are attempted and how their outputs combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Try label values first; fall back to datasets only when labels are
    /// empty. The default.
    #[default]
    PreferFast,
    /// Fetch from both paths and merge, labels winning on conflict.
    Comprehensive,
    /// Only use label values; error when none are available.
    LabelsOnly,
    /// Skip label values entirely and go straight to datasets.
    DatasetsOnly,
}

impl MergeStrategy {
    /// Returns the stable wire label for the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreferFast => "prefer_fast",
            Self::Comprehensive => "comprehensive",
            Self::LabelsOnly => "labels_only",
            Self::DatasetsOnly => "datasets_only",
        }
    }
}

// ============================================================================
// SECTION: Common Envelopes
// ============================================================================

/// Cache metadata for conditional requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Entity tag for conditional requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Last-modified timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Cache TTL in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Opaque token for the next page, when more data exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Whether more pages exist.
    #[serde(default)]
    pub has_more: bool,
    /// Total matching item count, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// Structured error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Standardized error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Seconds to wait before retrying, when advised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Whether the backend considers the failure retryable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

/// Standard error response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error payload.
    pub error: ErrorDetails,
}

// ============================================================================
// SECTION: source.describe
// ============================================================================

/// Source MCP implementation capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCapabilities {
    /// Supports paginated listings.
    #[serde(default = "default_true")]
    pub pagination: bool,
    /// Supports conditional/cached responses.
    #[serde(default = "default_true")]
    pub caching: bool,
    /// Supports streamed dataset bodies.
    #[serde(default)]
    pub streaming: bool,
    /// Supports schema retrieval.
    #[serde(default)]
    pub schemas: bool,
}

impl Default for SourceCapabilities {
    fn default() -> Self {
        Self {
            pagination: true,
            caching: true,
            streaming: false,
            schemas: false,
        }
    }
}

/// Serde default helper returning true.
const fn default_true() -> bool {
    true
}

/// Source MCP operational limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLimits {
    /// Maximum accepted page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<u64>,
    /// Maximum dataset size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dataset_size: Option<u64>,
    /// Requests allowed per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u64>,
}

/// Empty request for `source.describe`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescribeRequest {}

/// Response from `source.describe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescribeResponse {
    /// Backend type identifier.
    pub source_type: SourceType,
    /// Source MCP implementation version.
    pub version: String,
    /// Contract version supported by the source.
    pub contract_version: ContractVersion,
    /// Declared capabilities.
    pub capabilities: SourceCapabilities,
    /// Declared operational limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<SourceLimits>,
}

/// Validates that a source implements the minimum contract requirements.
#[must_use]
pub fn validate_contract_compatibility(response: &SourceDescribeResponse) -> bool {
    response.contract_version == ContractVersion::V1_0_0
        && response.capabilities.pagination
        && response.capabilities.caching
}

// ============================================================================
// SECTION: tests.list
// ============================================================================

/// Default page size for listing operations.
#[must_use]
pub const fn default_page_size() -> u64 {
    100
}

/// Request for `tests.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestsListRequest {
    /// Text search query for test names/descriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Filter by test tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Opaque pagination token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Test metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInfo {
    /// Test identifier.
    pub test_id: String,
    /// Test display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Response from `tests.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestsListResponse {
    /// Tests in this page.
    #[serde(default)]
    pub tests: Vec<TestInfo>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

// ============================================================================
// SECTION: runs.list
// ============================================================================

/// Test run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is still executing.
    Running,
    /// Run finished successfully.
    Completed,
    /// Run finished with failures.
    Failed,
    /// Run was cancelled.
    Cancelled,
}

/// Request for `runs.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunsListRequest {
    /// Test identifier to list runs for.
    pub test_id: String,
    /// Start of the time range filter (backend-interpreted).
    #[serde(default, rename = "from", skip_serializing_if = "Option::is_none")]
    pub from_time: Option<String>,
    /// End of the time range filter (backend-interpreted).
    #[serde(default, rename = "to", skip_serializing_if = "Option::is_none")]
    pub to_time: Option<String>,
    /// Opaque pagination token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Test run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Run identifier.
    pub run_id: String,
    /// Parent test identifier.
    pub test_id: String,
    /// Start timestamp.
    pub started_at: String,
    /// Completion timestamp, when finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Run status.
    pub status: RunStatus,
    /// Optional free-form labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Optional backend metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Response from `runs.list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunsListResponse {
    /// Runs in this page.
    #[serde(default)]
    pub runs: Vec<RunInfo>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

// ============================================================================
// SECTION: datasets.search
// ============================================================================

/// Request for `datasets.search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetsSearchRequest {
    /// Filter by specific test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// Filter by dataset schema URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    /// Filter by dataset tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Filter by specific run IDs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_ids: Option<Vec<String>>,
    /// Start of the time range filter (backend-interpreted).
    #[serde(default, rename = "from", skip_serializing_if = "Option::is_none")]
    pub from_time: Option<String>,
    /// End of the time range filter (backend-interpreted).
    #[serde(default, rename = "to", skip_serializing_if = "Option::is_none")]
    pub to_time: Option<String>,
    /// Opaque pagination token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Dataset metadata from a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Dataset identifier.
    pub dataset_id: String,
    /// Parent run identifier.
    pub run_id: String,
    /// Parent test identifier.
    pub test_id: String,
    /// Schema URI, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Content type of the dataset body.
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

/// Serde default for dataset content types.
fn default_content_type() -> String {
    "application/json".to_string()
}

/// Response from `datasets.search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetsSearchResponse {
    /// Datasets in this page.
    #[serde(default)]
    pub datasets: Vec<DatasetInfo>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

// ============================================================================
// SECTION: datasets.get
// ============================================================================

/// Request for `datasets.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetsGetRequest {
    /// Dataset identifier to retrieve.
    pub dataset_id: String,
    /// ETag for a conditional request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_none_match: Option<String>,
    /// Timestamp for a conditional request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_modified_since: Option<String>,
}

/// Dataset content metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Schema URI of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    /// Content encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Compression algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
}

/// Response from `datasets.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetsGetResponse {
    /// Dataset identifier.
    pub dataset_id: String,
    /// Raw dataset content (object, array, or string).
    pub content: Value,
    /// Content type of the body.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Size in bytes, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
    /// Optional content metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DatasetMetadata>,
}

// ============================================================================
// SECTION: artifacts.get
// ============================================================================

/// Request for `artifacts.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsGetRequest {
    /// Run identifier.
    pub run_id: String,
    /// Artifact name or path.
    pub name: String,
    /// ETag for a conditional request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_none_match: Option<String>,
    /// Timestamp for a conditional request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_modified_since: Option<String>,
}

/// Response from `artifacts.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsGetResponse {
    /// Run identifier.
    pub run_id: String,
    /// Artifact name.
    pub name: String,
    /// Base64-encoded binary content.
    pub content: String,
    /// MIME type of the artifact.
    pub content_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

// ============================================================================
// SECTION: schemas.get
// ============================================================================

/// Request for `schemas.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemasGetRequest {
    /// Schema URI to retrieve.
    pub schema_uri: String,
}

/// Response from `schemas.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemasGetResponse {
    /// Schema URI.
    pub schema_uri: String,
    /// JSON Schema definition.
    #[serde(rename = "schema")]
    pub schema_def: Value,
    /// Schema version, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Description, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// SECTION: Label Values
// ============================================================================

/// Single label value record produced by the source system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    /// Optional backend-specific label identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Canonical label name.
    pub name: String,
    /// Schema URI associated with the label value.
    #[serde(default, rename = "schema", skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    /// Raw value (numeric, string, or object); consumers coerce as needed.
    #[serde(default)]
    pub value: Value,
}

/// A bundle of label values, typically tied to a run or dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportedLabelValues {
    /// The exported label values.
    #[serde(default)]
    pub values: Vec<LabelValue>,
    /// Run identifier, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Dataset identifier, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    /// Start of the observation window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// End of the observation window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
}

/// Request for `run_label_values.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLabelValuesRequest {
    /// Target run identifier.
    pub run_id: String,
    /// Label names to include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Label names to exclude.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Optional server-side filter document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BTreeMap<String, Vec<String>>>,
    /// Enable array multi-value filtering. The canonical wire spelling is
    /// camelCase; snake_case is accepted on input.
    #[serde(default, rename = "multiFilter", alias = "multi_filter")]
    pub multi_filter: bool,
    /// Optional sort key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Sort direction, `asc` or `desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Opaque pagination token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Response from `run_label_values.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLabelValuesResponse {
    /// Label-value bundles for the run.
    #[serde(default)]
    pub items: Vec<ExportedLabelValues>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

/// Request for `test_label_values.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestLabelValuesRequest {
    /// Target test identifier.
    pub test_id: String,
    /// Label names to include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Label names to exclude.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Optional server-side filter document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BTreeMap<String, Vec<String>>>,
    /// Enable array multi-value filtering. The canonical wire spelling is
    /// camelCase; snake_case is accepted on input.
    #[serde(default, rename = "multiFilter", alias = "multi_filter")]
    pub multi_filter: bool,
    /// Request filtering (dimension) labels from the backend.
    #[serde(default)]
    pub filtering: bool,
    /// Request metrics labels from the backend.
    #[serde(default = "default_true")]
    pub metrics: bool,
    /// Upper time bound (backend-interpreted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Lower time bound (backend-interpreted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Opaque pagination token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Response from `test_label_values.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestLabelValuesResponse {
    /// Label-value bundles aggregated for the test.
    #[serde(default)]
    pub items: Vec<ExportedLabelValues>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: Pagination,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

/// Request for `dataset_label_values.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLabelValuesRequest {
    /// Dataset identifier.
    pub dataset_id: String,
}

/// Response from `dataset_label_values.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetLabelValuesResponse {
    /// Label values for the dataset.
    #[serde(default)]
    pub values: Vec<LabelValue>,
    /// Optional cache metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<CacheInfo>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
