// crates/metric-gate-server/src/correlation.rs
// ============================================================================
// Module: Correlation Policy
// Description: Sanitization and generation for request correlation IDs.
// Purpose: Propagate one opaque identifier through every log line a request
//          produces, across async task boundaries.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Client-provided correlation identifiers are untrusted and sanitized with
//! strict token rules before use; invalid values are dropped and the server
//! id stands alone. Server identifiers are generated per request from a
//! boot-scoped random seed plus a monotonic counter, so they are unique for
//! the process lifetime without coordination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header name for client-provided correlation identifiers.
pub const CORRELATION_HEADER: &str = "x-correlation-id";
/// Maximum allowed length for client correlation identifiers.
pub const MAX_CLIENT_CORRELATION_ID_LENGTH: usize = 128;

// ============================================================================
// SECTION: Rejection Reasons
// ============================================================================

/// Typed rejection reason for invalid client correlation IDs.
///
/// # Invariants
/// - Variants are stable for log labeling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationIdRejection {
    /// Input was empty after trimming.
    EmptyAfterTrim,
    /// Input exceeded the maximum length.
    TooLong,
    /// Input contained whitespace after trimming.
    ContainsWhitespace,
    /// Input contained control characters.
    ContainsControlChar,
    /// Input contained non-ASCII characters.
    NonAscii,
    /// Input contained disallowed ASCII characters.
    ContainsDisallowedChar,
}

impl CorrelationIdRejection {
    /// Returns a stable label for this rejection reason.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EmptyAfterTrim => "empty_after_trim",
            Self::TooLong => "too_long",
            Self::ContainsWhitespace => "contains_whitespace",
            Self::ContainsControlChar => "contains_control_char",
            Self::NonAscii => "non_ascii",
            Self::ContainsDisallowedChar => "contains_disallowed_char",
        }
    }
}

impl fmt::Display for CorrelationIdRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Correlation Context
// ============================================================================

/// Correlation identifiers attached to one request.
///
/// # Invariants
/// - `server_id` is always populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    /// Sanitized client correlation ID, when one was supplied and valid.
    pub client_id: Option<String>,
    /// Server-generated correlation ID.
    pub server_id: String,
}

impl CorrelationContext {
    /// Builds a context from an incoming header value.
    ///
    /// Invalid client values are logged and dropped; the server id always
    /// stands.
    #[must_use]
    pub fn from_header(header: Option<&str>, generator: &CorrelationIdGenerator) -> Self {
        let client_id = match sanitize_client_correlation_id(header) {
            Ok(client_id) => client_id,
            Err(rejection) => {
                tracing::warn!(reason = rejection.label(), "correlation.client_id_rejected");
                None
            }
        };
        Self {
            client_id,
            server_id: generator.issue(),
        }
    }

    /// Returns the id to log with: the client's when valid, else the server's.
    #[must_use]
    pub fn request_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or(&self.server_id)
    }
}

/// Boot-scoped correlation ID generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    /// Prefix included in every generated correlation ID.
    prefix: &'static str,
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for IDs issued in this process.
    counter: AtomicU64,
}

impl CorrelationIdGenerator {
    /// Creates a new generator with the given prefix.
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        let mut bytes = [0_u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            prefix,
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new server correlation ID.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}-{:016x}", self.prefix, self.boot_id, seq)
    }
}

// ============================================================================
// SECTION: Sanitization
// ============================================================================

/// Sanitizes a client correlation ID using strict token rules.
///
/// Returns `Ok(None)` when no header value is provided.
///
/// # Errors
/// Returns [`CorrelationIdRejection`] when the value is empty, too long, or
/// contains disallowed characters.
pub fn sanitize_client_correlation_id(
    value: Option<&str>,
) -> Result<Option<String>, CorrelationIdRejection> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CorrelationIdRejection::EmptyAfterTrim);
    }
    if trimmed.len() > MAX_CLIENT_CORRELATION_ID_LENGTH {
        return Err(CorrelationIdRejection::TooLong);
    }
    for ch in trimmed.chars() {
        if !ch.is_ascii() {
            return Err(CorrelationIdRejection::NonAscii);
        }
        if ch.is_ascii_whitespace() {
            return Err(CorrelationIdRejection::ContainsWhitespace);
        }
        if ch.is_control() {
            return Err(CorrelationIdRejection::ContainsControlChar);
        }
        if !is_tchar(ch) {
            return Err(CorrelationIdRejection::ContainsDisallowedChar);
        }
    }
    Ok(Some(trimmed.to_string()))
}

/// Returns true when the character is a valid HTTP token character.
const fn is_tchar(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '.'
                | '^'
                | '_'
                | '`'
                | '|'
                | '~'
        )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
