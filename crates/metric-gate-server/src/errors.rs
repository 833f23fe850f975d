// crates/metric-gate-server/src/errors.rs
// ============================================================================
// Module: Server Errors
// Description: Structured error type for the HTTP surface.
// Purpose: Carry a stable error kind, a human detail, and optional options
//          into the uniform error envelope.
// Dependencies: metric-gate-adapters, metric-gate-core, axum, serde
// ============================================================================

//! ## Overview
//! Every failure leaving the HTTP surface serializes as
//! `{"detail": {"detail", "error_type", "available_options"}}` with the
//! status code decided by the error kind. Adapter failures are translated
//! here so the classification table in the core crate stays the single
//! source of truth.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use metric_gate_adapters::AdapterError;
use metric_gate_core::DomainErrorKind;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Structured server error surfaced over HTTP.
///
/// # Invariants
/// - `kind` decides the HTTP status code; messages never carry internals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct ServerError {
    /// Stable error kind deciding the status code and `error_type` label.
    pub kind: DomainErrorKind,
    /// Human-readable error detail.
    pub detail: String,
    /// Optional list of valid alternatives (e.g. known source ids).
    pub available_options: Option<Vec<String>>,
}

impl ServerError {
    /// Builds an error with a kind and detail message.
    #[must_use]
    pub fn new(kind: DomainErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            available_options: None,
        }
    }

    /// Attaches the list of valid options to the error.
    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.available_options = Some(options);
        self
    }

    /// Validation failure (HTTP 400).
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::ValidationError, detail)
    }

    /// Unknown dataset-type plugin (HTTP 400).
    #[must_use]
    pub fn unknown_dataset_type(dataset_type: &str) -> Self {
        Self::new(
            DomainErrorKind::UnknownDatasetType,
            format!("unknown dataset type: {dataset_type}"),
        )
    }

    /// Unknown source id with the valid ids attached (HTTP 404).
    #[must_use]
    pub fn unknown_source_id(source_id: &str, available: Vec<String>) -> Self {
        Self::new(
            DomainErrorKind::UnknownSourceId,
            format!("source id '{source_id}' not found; check your DOMAIN_MCP_CONFIG"),
        )
        .with_options(available)
    }

    /// Missing configuration (HTTP 400).
    #[must_use]
    pub fn missing_configuration(detail: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::MissingConfiguration, detail)
    }

    /// Internal failure with a generic client message (HTTP 500).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::InternalServerError, detail)
    }

    /// Translates an adapter failure into a surfaced upstream error.
    #[must_use]
    pub fn from_adapter(error: &AdapterError) -> Self {
        match error {
            AdapterError::Timeout {
                seconds,
            } => Self::new(
                DomainErrorKind::Timeout,
                format!(
                    "upstream request timed out after {seconds}s; consider increasing \
                     timeout_seconds in the source configuration"
                ),
            ),
            AdapterError::Connection {
                message,
            } => Self::new(
                DomainErrorKind::NetworkError,
                format!("upstream connection failed: {message}"),
            ),
            AdapterError::Status {
                status,
                body_preview,
            } => Self::new(
                DomainErrorKind::UpstreamHttpError,
                format!("upstream returned status {status}: {body_preview}"),
            ),
            other => Self::new(DomainErrorKind::UpstreamError, other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: HTTP Envelope
// ============================================================================

/// Inner payload of the uniform error envelope.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Human-readable error detail.
    detail: String,
    /// Stable error kind label.
    error_type: &'static str,
    /// Optional list of valid alternatives.
    #[serde(skip_serializing_if = "Option::is_none")]
    available_options: Option<Vec<String>>,
}

/// Uniform error envelope: `{"detail": {...}}`.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    /// Structured error payload.
    detail: ErrorBody,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.kind.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope = ErrorEnvelope {
            detail: ErrorBody {
                detail: self.detail,
                error_type: self.kind.as_str(),
                available_options: self.available_options,
            },
        };
        (status, Json(envelope)).into_response()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
