// crates/metric-gate-core/src/errors.rs
// ============================================================================
// Module: Domain Error Kinds
// Description: Closed error-kind vocabulary shared across the server surface.
// Purpose: Give every surfaced failure a stable label and HTTP status.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every error leaving the HTTP surface carries one of these kinds in its
//! `error_type` field. The kind decides the status code; messages stay
//! human-oriented and free of internal detail.

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Closed set of error kinds surfaced by the Domain MCP server.
///
/// # Invariants
/// - Labels are stable snake_case strings used in HTTP error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainErrorKind {
    /// Request failed input validation.
    ValidationError,
    /// Referenced source id is not configured.
    UnknownSourceId,
    /// Referenced dataset-type plugin is not registered.
    UnknownDatasetType,
    /// Required configuration is absent.
    MissingConfiguration,
    /// Upstream call exceeded its deadline.
    Timeout,
    /// Transport-level failure reaching the upstream.
    NetworkError,
    /// Upstream returned a non-success HTTP status.
    UpstreamHttpError,
    /// Upstream failed in a non-HTTP-specific way.
    UpstreamError,
    /// Generic HTTP-layer error.
    HttpError,
    /// Client exceeded a rate limit.
    RateLimitExceeded,
    /// Unhandled internal failure.
    InternalServerError,
}

impl DomainErrorKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::UnknownSourceId => "unknown_source_id",
            Self::UnknownDatasetType => "unknown_dataset_type",
            Self::MissingConfiguration => "missing_configuration",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::UpstreamHttpError => "upstream_http_error",
            Self::UpstreamError => "upstream_error",
            Self::HttpError => "http_error",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InternalServerError => "internal_server_error",
        }
    }

    /// Returns the HTTP status code this kind surfaces with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationError | Self::UnknownDatasetType | Self::MissingConfiguration => 400,
            Self::UnknownSourceId => 404,
            Self::RateLimitExceeded => 429,
            Self::Timeout => 504,
            Self::NetworkError | Self::UpstreamHttpError | Self::UpstreamError => 502,
            Self::HttpError | Self::InternalServerError => 500,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
