// crates/metric-gate-core/src/partial.rs
// ============================================================================
// Module: Partial Results
// Description: Success/failure bookkeeping for fan-out operations.
// Purpose: Return as much data as possible while classifying what failed.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Fan-out operations (per-dataset fetches, multi-source queries) must not
//! abort on the first failure. [`PartialResult`] collects successes alongside
//! typed [`FailureInfo`] records, and the classification table here is the
//! single source of truth for failure kinds and retryability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Failure Classification
// ============================================================================

/// Closed classification of fan-out failure causes.
///
/// # Invariants
/// - Labels are stable snake_case strings used in logs and failure payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Operation exceeded its deadline.
    Timeout,
    /// Upstream returned a 5xx status.
    ServerError,
    /// Upstream returned 429.
    RateLimit,
    /// Upstream returned 401 or 403.
    AuthError,
    /// Upstream returned 404.
    NotFound,
    /// Any other non-success HTTP status.
    HttpError,
    /// Transport-level connection failure.
    ConnectionError,
    /// Response body failed to parse.
    ParseError,
    /// Response was missing a required field.
    MissingField,
    /// Unclassified failure.
    UnknownError,
}

impl FailureKind {
    /// Returns a stable label for the failure kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ServerError => "server_error",
            Self::RateLimit => "rate_limit",
            Self::AuthError => "auth_error",
            Self::NotFound => "not_found",
            Self::HttpError => "http_error",
            Self::ConnectionError => "connection_error",
            Self::ParseError => "parse_error",
            Self::MissingField => "missing_field",
            Self::UnknownError => "unknown_error",
        }
    }

    /// Returns true when the failure might succeed on retry.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionError | Self::ServerError | Self::RateLimit)
    }

    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            404 => Self::NotFound,
            500..=599 => Self::ServerError,
            _ => Self::HttpError,
        }
    }
}

/// Information about one failed operation in a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    /// Identifier of the failed operation (e.g. a dataset id).
    pub identifier: String,
    /// Human-readable error message.
    pub error: String,
    /// Classified failure kind.
    pub kind: FailureKind,
    /// Whether the operation might succeed if retried.
    pub retryable: bool,
}

impl FailureInfo {
    /// Builds a failure record, deriving retryability from the kind.
    #[must_use]
    pub fn new(identifier: impl Into<String>, error: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            identifier: identifier.into(),
            error: error.into(),
            kind,
            retryable: kind.is_retryable(),
        }
    }
}

// ============================================================================
// SECTION: Partial Result
// ============================================================================

/// Error raised when a fan-out falls below its minimum success rate.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "success rate {actual_percent}% below minimum {minimum_percent}% for {operation}: \
     {successes} succeeded, {failures} failed"
)]
pub struct SuccessRateError {
    /// Operation label used in the message.
    pub operation: String,
    /// Observed success percentage, rounded down.
    pub actual_percent: u32,
    /// Required success percentage, rounded down.
    pub minimum_percent: u32,
    /// Count of successful operations.
    pub successes: usize,
    /// Count of failed operations.
    pub failures: usize,
}

/// Result container for operations that may partially fail.
///
/// # Invariants
/// - `success_rate` is zero when no operations were attempted.
#[derive(Debug, Clone, Default)]
pub struct PartialResult<T> {
    /// Successfully retrieved items, in task-creation order.
    pub successes: Vec<T>,
    /// Typed information about failed operations.
    pub failures: Vec<FailureInfo>,
}

impl<T> PartialResult<T> {
    /// Creates an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Ratio of successes to total attempts, in `0.0..=1.0`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Operation counts are far below the f64 integer precision limit."
    )]
    pub fn success_rate(&self) -> f64 {
        let total = self.successes.len() + self.failures.len();
        if total == 0 {
            return 0.0;
        }
        self.successes.len() as f64 / total as f64
    }

    /// Returns true when any operation failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns true when every attempted operation succeeded.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && !self.successes.is_empty()
    }

    /// Returns true when every attempted operation failed.
    #[must_use]
    pub const fn all_failed(&self) -> bool {
        self.successes.is_empty() && !self.failures.is_empty()
    }

    /// Enforces a minimum success rate.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessRateError`] when the observed rate is below
    /// `min_success_rate`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Percentages derived from rates in 0..=1 fit u32."
    )]
    pub fn check_success_rate(
        &self,
        min_success_rate: f64,
        operation: &str,
    ) -> Result<(), SuccessRateError> {
        let rate = self.success_rate();
        if rate < min_success_rate {
            return Err(SuccessRateError {
                operation: operation.to_string(),
                actual_percent: (rate * 100.0) as u32,
                minimum_percent: (min_success_rate * 100.0) as u32,
                successes: self.successes.len(),
                failures: self.failures.len(),
            });
        }
        Ok(())
    }

    /// Formats a human-readable failure summary grouped by kind.
    #[must_use]
    pub fn failure_summary(&self, operation: &str) -> String {
        if !self.has_failures() {
            return format!("All {} {operation}(s) succeeded.", self.successes.len());
        }
        let mut lines = vec![format!(
            "Partial results: {} succeeded, {} failed ({:.0}% success rate)",
            self.successes.len(),
            self.failures.len(),
            self.success_rate() * 100.0
        )];
        let mut by_kind: Vec<(FailureKind, Vec<&FailureInfo>)> = Vec::new();
        for failure in &self.failures {
            match by_kind.iter_mut().find(|(kind, _)| *kind == failure.kind) {
                Some((_, group)) => group.push(failure),
                None => by_kind.push((failure.kind, vec![failure])),
            }
        }
        for (kind, group) in &by_kind {
            let retry_note = if kind.is_retryable() { "retryable" } else { "not retryable" };
            lines.push(format!("  - {} {} ({retry_note})", group.len(), kind.as_str()));
            let mut identifiers: Vec<String> =
                group.iter().take(3).map(|failure| failure.identifier.clone()).collect();
            if group.len() > 3 {
                identifiers.push(format!("... and {} more", group.len() - 3));
            }
            lines.push(format!("    Affected: {}", identifiers.join(", ")));
        }
        lines.join("\n")
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
