// crates/metric-gate-core/src/timestamps.rs
// ============================================================================
// Module: Timestamp Utilities
// Description: Parsing and serialization for heterogeneous timestamp inputs.
// Purpose: Accept ISO 8601 and unix epoch values; emit trailing-Z UTC strings.
// Dependencies: serde_json, time, tracing
// ============================================================================

//! ## Overview
//! Backends emit timestamps as ISO 8601 strings (with or without a trailing
//! `Z`), unix seconds, or unix milliseconds. This module normalizes all of
//! them to [`OffsetDateTime`] in UTC and serializes back with a trailing `Z`.
//! Parsing is lenient and returns `None` on malformed input with a warning;
//! callers decide how to degrade.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Threshold separating unix seconds from unix milliseconds.
///
/// Values at or above `1e10` are treated as milliseconds. The boundary sits
/// in September 2001 when interpreted as seconds, far below plausible data.
const UNIX_MILLIS_THRESHOLD: f64 = 10_000_000_000.0;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a timestamp from a JSON scalar (string, integer, or float).
///
/// Strings are parsed as ISO 8601; numbers auto-detect seconds versus
/// milliseconds by magnitude. Returns `None` for other JSON shapes or
/// malformed values.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(text) => parse_iso8601(text),
        Value::Number(number) => number.as_f64().and_then(parse_unix_timestamp),
        _ => None,
    }
}

/// Parses an ISO 8601 timestamp string into a UTC instant.
///
/// A value without an explicit offset is assumed to be UTC.
#[must_use]
pub fn parse_iso8601(value: &str) -> Option<OffsetDateTime> {
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed.to_offset(time::UtcOffset::UTC));
    }
    // Retry naive datetimes as UTC.
    let assumed_utc = format!("{value}Z");
    match OffsetDateTime::parse(&assumed_utc, &Rfc3339) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(value, "timestamps.parse_iso8601_failed");
            None
        }
    }
}

/// Parses a unix timestamp in seconds or milliseconds.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    reason = "Nanosecond magnitudes from plausible epochs fit i128 exactly."
)]
pub fn parse_unix_timestamp(value: f64) -> Option<OffsetDateTime> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value >= UNIX_MILLIS_THRESHOLD { value } else { value * 1000.0 };
    let nanos = (millis * 1_000_000.0) as i128;
    match OffsetDateTime::from_unix_timestamp_nanos(nanos) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(value, "timestamps.parse_unix_failed");
            None
        }
    }
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

/// Formats a UTC instant as ISO 8601 with a trailing `Z`.
#[must_use]
pub fn to_iso8601(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(time::UtcOffset::UTC);
    let formatted = utc.format(&Rfc3339).unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
    match formatted.strip_suffix("+00:00") {
        Some(head) => format!("{head}Z"),
        None => formatted,
    }
}

/// Converts an instant to whole unix seconds.
#[must_use]
pub const fn to_unix_timestamp(instant: OffsetDateTime) -> i64 {
    instant.unix_timestamp()
}

/// Converts an instant to whole unix milliseconds.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    reason = "Millisecond epochs for representable instants fit i64."
)]
pub const fn to_unix_timestamp_ms(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Computes the delta `end - start` in milliseconds.
#[must_use]
pub fn calculate_time_delta_ms(start: OffsetDateTime, end: OffsetDateTime) -> f64 {
    let delta = end - start;
    delta.as_seconds_f64() * 1000.0
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
