// crates/metric-gate-core/src/validation.rs
// ============================================================================
// Module: Float Validation
// Description: Validation and sanitization for numeric metric values.
// Purpose: Keep NaN and infinities out of serialized metric output.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! JSON cannot represent NaN or infinities, and a single bad sample must not
//! poison a statistics run. These helpers validate floats, clamp to optional
//! inclusive ranges via a caller-supplied default, and filter sample lists
//! while counting drops.

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Returns true when the value is finite (neither NaN nor infinite).
#[must_use]
pub fn is_valid_float(value: f64) -> bool {
    value.is_finite()
}

/// Sanitizes a float with finiteness and optional inclusive range checks.
///
/// Returns `default` when the value is non-finite or out of range.
#[must_use]
pub fn sanitize_float(
    value: f64,
    min_value: Option<f64>,
    max_value: Option<f64>,
    default: Option<f64>,
) -> Option<f64> {
    if !is_valid_float(value) {
        return default;
    }
    if let Some(min) = min_value {
        if value < min {
            return default;
        }
    }
    if let Some(max) = max_value {
        if value > max {
            return default;
        }
    }
    Some(value)
}

/// Filters a slice to finite values, returning the kept list and drop count.
///
/// Each dropped value is logged with the provided context label.
#[must_use]
pub fn filter_valid_floats(values: &[f64], log_context: &str) -> (Vec<f64>, usize) {
    let mut valid = Vec::with_capacity(values.len());
    let mut invalid = 0_usize;
    for value in values {
        if is_valid_float(*value) {
            valid.push(*value);
        } else {
            invalid += 1;
            tracing::warn!(value = *value, context = log_context, "invalid_float_filtered");
        }
    }
    (valid, invalid)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
