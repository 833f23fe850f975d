// crates/metric-gate-adapters/src/lib.rs
// ============================================================================
// Module: Metric Gate Adapters
// Description: Source MCP adapter trait, realizations, and resilience pieces.
// Purpose: Translate contract operations to concrete backends with retries,
//          session handling, circuit breaking, and backpressure.
// Dependencies: metric-gate-contract, metric-gate-core, async-trait, reqwest,
//               tokio, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! A [`SourceAdapter`] is a live connection object keyed by a logical source
//! id. Two realizations exist: HTTP (POST JSON against a Horreum MCP) and a
//! stdio bridge (JSON-RPC against a spawned MCP child process), with an
//! Elasticsearch reinterpretation layered on the bridge transport. Adapters
//! own their retry policy, optional session token, and (HTTP) circuit
//! breaker. Backend responses are untrusted; every payload is validated by
//! deserialization into contract types.
//! Invariants:
//! - Contract identifiers are strings on ingress; numeric backend IDs are
//!   coerced at this boundary.
//! - Errors carry enough classification for the shared retryability table.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod breaker;
pub mod elasticsearch;
pub mod http;
pub mod queue;
pub mod registry;
pub mod stdio;

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use metric_gate_contract::ArtifactsGetRequest;
use metric_gate_contract::ArtifactsGetResponse;
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
use metric_gate_contract::SchemasGetRequest;
use metric_gate_contract::SchemasGetResponse;
use metric_gate_contract::SourceDescribeRequest;
use metric_gate_contract::SourceDescribeResponse;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestLabelValuesResponse;
use metric_gate_contract::TestsListRequest;
use metric_gate_contract::TestsListResponse;
use metric_gate_core::FailureKind;
use thiserror::Error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use breaker::CircuitBreaker;
pub use breaker::CircuitBreakerConfig;
pub use breaker::CircuitState;
pub use breaker::RateLimitInfo;
pub use breaker::extract_rate_limit_info;
pub use elasticsearch::ElasticsearchAdapter;
pub use http::HorreumHttpAdapter;
pub use http::HorreumHttpConfig;
pub use queue::RequestQueue;
pub use registry::AdapterRegistry;
pub use stdio::BridgeTransport;
pub use stdio::StdioBridgeAdapter;
pub use stdio::StdioProcessTransport;
pub use stdio::StdioTransportConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Maximum number of upstream body bytes preserved in error previews.
pub const BODY_PREVIEW_LIMIT: usize = 500;

/// Errors produced by source adapters.
///
/// # Invariants
/// - `body_preview` payloads are truncated to [`BODY_PREVIEW_LIMIT`] chars.
/// - Variants map onto the shared [`FailureKind`] classification table.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport-level connection failure.
    #[error("connection error: {message}")]
    Connection {
        /// Human-readable failure description.
        message: String,
    },
    /// Operation exceeded its configured deadline.
    #[error("request timed out after {seconds}s; consider increasing timeout_seconds")]
    Timeout {
        /// Configured timeout budget in seconds.
        seconds: u64,
    },
    /// Upstream returned a non-success HTTP status.
    #[error("upstream returned status {status}: {body_preview}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated upstream body preview for diagnostics.
        body_preview: String,
    },
    /// Upstream body failed to parse as JSON.
    #[error("invalid json from upstream: {message}")]
    Json {
        /// Parse failure description.
        message: String,
    },
    /// Upstream reply violated the expected protocol shape.
    #[error("protocol error: {message}")]
    Protocol {
        /// Shape violation description.
        message: String,
    },
    /// Operation is not supported by this source type.
    #[error("operation not supported by this source: {operation}")]
    Unsupported {
        /// Contract operation name.
        operation: &'static str,
    },
    /// The adapter's circuit breaker is open.
    #[error("circuit breaker '{name}' is open; try again in {retry_in_seconds}s")]
    CircuitOpen {
        /// Breaker name (usually the source id).
        name: String,
        /// Seconds until the breaker admits a probe call.
        retry_in_seconds: u64,
    },
    /// The request queue rejected the call under backpressure.
    #[error("request queue full ({max_queue_size} requests queued); try again later")]
    QueueFull {
        /// Configured queue bound.
        max_queue_size: usize,
    },
}

impl AdapterError {
    /// Classifies the error into the shared failure-kind table.
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Connection {
                ..
            } => FailureKind::ConnectionError,
            Self::Timeout {
                ..
            } => FailureKind::Timeout,
            Self::Status {
                status, ..
            } => FailureKind::from_status(*status),
            Self::Json {
                ..
            } => FailureKind::ParseError,
            Self::Protocol {
                ..
            } => FailureKind::MissingField,
            Self::Unsupported {
                ..
            } => FailureKind::HttpError,
            Self::CircuitOpen {
                ..
            }
            | Self::QueueFull {
                ..
            } => FailureKind::ServerError,
        }
    }

    /// Returns true when the failure counts toward circuit-breaker state.
    ///
    /// Only server errors (5xx), 429, timeouts, and connect failures count;
    /// other client errors say nothing about backend health.
    #[must_use]
    pub const fn is_counted_failure(&self) -> bool {
        match self {
            Self::Status {
                status, ..
            } => *status >= 500 || *status == 429,
            Self::Timeout {
                ..
            }
            | Self::Connection {
                ..
            } => true,
            _ => false,
        }
    }
}

/// Truncates an upstream body to the diagnostic preview limit.
#[must_use]
pub fn truncate_body_preview(body: &str) -> String {
    if body.chars().count() <= BODY_PREVIEW_LIMIT {
        return body.to_string();
    }
    let head: String = body.chars().take(BODY_PREVIEW_LIMIT).collect();
    format!("{head}...")
}

// ============================================================================
// SECTION: Adapter Trait
// ============================================================================

/// Typed interface every Source MCP adapter implements.
///
/// Each operation takes a contract request record and returns a validated
/// contract response. Implementations own transport concerns (retries,
/// sessions, deadlines); callers treat every method as a suspension point.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Describes the source type, version, and contract support.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the source cannot be described.
    async fn source_describe(
        &self,
        req: SourceDescribeRequest,
    ) -> Result<SourceDescribeResponse, AdapterError>;

    /// Lists tests with optional filtering and pagination.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn tests_list(&self, req: TestsListRequest) -> Result<TestsListResponse, AdapterError>;

    /// Lists runs for a test with optional time bounds and pagination.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn runs_list(&self, req: RunsListRequest) -> Result<RunsListResponse, AdapterError>;

    /// Searches datasets across tests/runs with filters and pagination.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn datasets_search(
        &self,
        req: DatasetsSearchRequest,
    ) -> Result<DatasetsSearchResponse, AdapterError>;

    /// Fetches dataset content by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn datasets_get(
        &self,
        req: DatasetsGetRequest,
    ) -> Result<DatasetsGetResponse, AdapterError>;

    /// Fetches a binary artifact linked to a run by name.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails or the source
    /// does not support artifacts.
    async fn artifacts_get(
        &self,
        req: ArtifactsGetRequest,
    ) -> Result<ArtifactsGetResponse, AdapterError>;

    /// Fetches a dataset schema by URI.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unsupported`] unless the source implements
    /// schema retrieval.
    async fn schemas_get(
        &self,
        req: SchemasGetRequest,
    ) -> Result<SchemasGetResponse, AdapterError> {
        let _ = req;
        Err(AdapterError::Unsupported {
            operation: "schemas.get",
        })
    }

    /// Gets label values for a specific run with optional filtering.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn get_run_label_values(
        &self,
        req: RunLabelValuesRequest,
    ) -> Result<RunLabelValuesResponse, AdapterError>;

    /// Gets aggregated label values across runs for a test.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn get_test_label_values(
        &self,
        req: TestLabelValuesRequest,
    ) -> Result<TestLabelValuesResponse, AdapterError>;

    /// Gets label values for a specific dataset identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the backend call fails.
    async fn get_dataset_label_values(
        &self,
        req: DatasetLabelValuesRequest,
    ) -> Result<DatasetLabelValuesResponse, AdapterError>;
}

// ============================================================================
// SECTION: Tests
// ============================================================================
