// crates/metric-gate-core/src/timestamps/tests.rs
// ============================================================================
// Module: Timestamp Utility Tests
// Description: Unit tests for timestamp parsing and serialization.
// Purpose: Validate ISO/unix parsing and the trailing-Z round-trip laws.
// Dependencies: metric-gate-core, serde_json, time
// ============================================================================

//! ## Overview
//! Covers the parsing matrix (ISO with Z, ISO with offset, naive, unix
//! seconds, unix milliseconds) and the round-trip laws for whole-second UTC
//! instants.

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

use serde_json::json;
use time::OffsetDateTime;

use super::calculate_time_delta_ms;
use super::parse_iso8601;
use super::parse_timestamp;
use super::parse_unix_timestamp;
use super::to_iso8601;
use super::to_unix_timestamp;
use super::to_unix_timestamp_ms;

// ============================================================================
// SECTION: Parsing Tests
// ============================================================================

#[test]
fn parses_iso8601_with_trailing_z() {
    let parsed = parse_iso8601("2025-10-15T12:00:00Z").expect("parse");
    assert_eq!(parsed.unix_timestamp(), 1_760_529_600);
}

#[test]
fn parses_iso8601_with_explicit_offset() {
    let zulu = parse_iso8601("2025-10-15T12:00:00Z").expect("parse");
    let offset = parse_iso8601("2025-10-15T14:00:00+02:00").expect("parse");
    assert_eq!(zulu, offset);
}

#[test]
fn parses_naive_iso8601_as_utc() {
    let naive = parse_iso8601("2025-10-15T12:00:00").expect("parse");
    let zulu = parse_iso8601("2025-10-15T12:00:00Z").expect("parse");
    assert_eq!(naive, zulu);
}

#[test]
fn rejects_garbage_strings() {
    assert!(parse_iso8601("not-a-timestamp").is_none());
    assert!(parse_iso8601("").is_none());
}

#[test]
fn parses_unix_seconds() {
    let parsed = parse_unix_timestamp(1_697_385_600.0).expect("parse");
    assert_eq!(parsed.unix_timestamp(), 1_697_385_600);
}

#[test]
fn parses_unix_milliseconds() {
    let parsed = parse_unix_timestamp(1_697_385_600_000.0).expect("parse");
    assert_eq!(parsed.unix_timestamp(), 1_697_385_600);
}

#[test]
fn parse_timestamp_dispatches_on_json_shape() {
    assert!(parse_timestamp(&json!("2025-10-15T12:00:00Z")).is_some());
    assert!(parse_timestamp(&json!(1_697_385_600)).is_some());
    assert!(parse_timestamp(&json!({"nested": true})).is_none());
    assert!(parse_timestamp(&json!(null)).is_none());
}

// ============================================================================
// SECTION: Round-Trip Tests
// ============================================================================

#[test]
fn iso8601_round_trip_preserves_z_form() {
    let text = "2025-10-15T12:00:00Z";
    let parsed = parse_iso8601(text).expect("parse");
    assert_eq!(to_iso8601(parsed), text);
}

#[test]
fn unix_round_trip_preserves_whole_seconds() {
    let instant = OffsetDateTime::from_unix_timestamp(1_697_385_600).expect("instant");
    let seconds = to_unix_timestamp(instant);
    let reparsed = parse_unix_timestamp(seconds_as_f64(seconds)).expect("parse");
    assert_eq!(reparsed, instant);
}

#[test]
fn unix_millis_round_trip_preserves_whole_seconds() {
    let instant = OffsetDateTime::from_unix_timestamp(1_697_385_600).expect("instant");
    let millis = to_unix_timestamp_ms(instant);
    assert_eq!(millis, 1_697_385_600_000);
}

#[test]
fn delta_is_in_milliseconds() {
    let start = OffsetDateTime::from_unix_timestamp(1_000).expect("instant");
    let end = OffsetDateTime::from_unix_timestamp(1_005).expect("instant");
    let delta = calculate_time_delta_ms(start, end);
    assert!((delta - 5_000.0).abs() < f64::EPSILON);
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts whole seconds into the f64 input shape of the parser.
#[allow(clippy::cast_precision_loss, reason = "Test epochs are exactly representable.")]
fn seconds_as_f64(seconds: i64) -> f64 {
    seconds as f64
}
