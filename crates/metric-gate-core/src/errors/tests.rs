// crates/metric-gate-core/src/errors/tests.rs
// ============================================================================
// Module: Domain Error Kind Tests
// Description: Unit tests for error labels and status mapping.
// Purpose: Validate stable labels and the HTTP status table.
// Dependencies: metric-gate-core
// ============================================================================

//! ## Overview
//! Pins the snake_case labels and the HTTP status each kind surfaces with.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use super::DomainErrorKind;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn labels_are_stable() {
    assert_eq!(DomainErrorKind::ValidationError.as_str(), "validation_error");
    assert_eq!(DomainErrorKind::UnknownSourceId.as_str(), "unknown_source_id");
    assert_eq!(DomainErrorKind::UnknownDatasetType.as_str(), "unknown_dataset_type");
    assert_eq!(DomainErrorKind::MissingConfiguration.as_str(), "missing_configuration");
    assert_eq!(DomainErrorKind::Timeout.as_str(), "timeout");
    assert_eq!(DomainErrorKind::NetworkError.as_str(), "network_error");
    assert_eq!(DomainErrorKind::UpstreamHttpError.as_str(), "upstream_http_error");
    assert_eq!(DomainErrorKind::UpstreamError.as_str(), "upstream_error");
    assert_eq!(DomainErrorKind::HttpError.as_str(), "http_error");
    assert_eq!(DomainErrorKind::RateLimitExceeded.as_str(), "rate_limit_exceeded");
    assert_eq!(DomainErrorKind::InternalServerError.as_str(), "internal_server_error");
}

#[test]
fn status_mapping_matches_the_table() {
    assert_eq!(DomainErrorKind::ValidationError.http_status(), 400);
    assert_eq!(DomainErrorKind::UnknownDatasetType.http_status(), 400);
    assert_eq!(DomainErrorKind::UnknownSourceId.http_status(), 404);
    assert_eq!(DomainErrorKind::RateLimitExceeded.http_status(), 429);
    assert_eq!(DomainErrorKind::Timeout.http_status(), 504);
    assert_eq!(DomainErrorKind::UpstreamHttpError.http_status(), 502);
    assert_eq!(DomainErrorKind::InternalServerError.http_status(), 500);
}
