// crates/metric-gate-contract/src/lib.rs
// ============================================================================
// Module: Metric Gate Contract
// Description: Source MCP Contract types and the domain tool surface.
// Purpose: Provide the canonical wire shapes consumed by adapters and the
//          server, plus hand-written tool definitions for MCP clients.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This crate defines the Source MCP Contract v1.0.0: the typed request and
//! response pairs every source adapter implements, the shared pagination,
//! caching, and error envelopes, and the label-value bundle shapes. It also
//! carries the Domain MCP tool surface ([`ToolName`], [`ToolDefinition`])
//! with hand-written JSON schemas; no schema reflection is used anywhere.
//! Invariants:
//! - Identifiers are strings on the wire; numeric backend IDs are coerced at
//!   the adapter boundary, never here.
//! - Time fields are backend-interpreted strings (ISO 8601, epoch millis, or
//!   natural language).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod tooling;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use tooling::ToolDefinition;
pub use tooling::ToolName;
pub use tooling::tool_definitions;
pub use types::ArtifactsGetRequest;
pub use types::ArtifactsGetResponse;
pub use types::CacheInfo;
pub use types::ContractVersion;
pub use types::DatasetInfo;
pub use types::DatasetLabelValuesRequest;
pub use types::DatasetLabelValuesResponse;
pub use types::DatasetMetadata;
pub use types::DatasetsGetRequest;
pub use types::DatasetsGetResponse;
pub use types::DatasetsSearchRequest;
pub use types::DatasetsSearchResponse;
pub use types::ErrorCode;
pub use types::ErrorDetails;
pub use types::ErrorEnvelope;
pub use types::ExportedLabelValues;
pub use types::LabelValue;
pub use types::MergeStrategy;
pub use types::Pagination;
pub use types::RunInfo;
pub use types::RunLabelValuesRequest;
pub use types::RunLabelValuesResponse;
pub use types::RunStatus;
pub use types::RunsListRequest;
pub use types::RunsListResponse;
pub use types::SchemasGetRequest;
pub use types::SchemasGetResponse;
pub use types::SourceCapabilities;
pub use types::SourceDescribeRequest;
pub use types::SourceDescribeResponse;
pub use types::SourceLimits;
pub use types::SourceType;
pub use types::TestInfo;
pub use types::TestLabelValuesRequest;
pub use types::TestLabelValuesResponse;
pub use types::TestsListRequest;
pub use types::TestsListResponse;
pub use types::validate_contract_compatibility;
