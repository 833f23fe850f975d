// crates/metric-gate-core/src/aggregation.rs
// ============================================================================
// Module: Sample Aggregation
// Description: Aggregation strategies with explicit missing-data handling.
// Purpose: Collapse optional sample series into single values deterministically.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Aggregation first resolves missing values according to the missing-data
//! strategy, then applies the aggregation strategy to the cleaned series.
//! `Raise` is the only strategy that errors; every other path degrades to
//! `None` when no usable values remain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Strategies
// ============================================================================

/// Strategy for collapsing multiple samples into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Average of all values.
    Mean,
    /// Middle value (robust to outliers).
    Median,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// 95th percentile (nearest rank).
    P95,
    /// 99th percentile (nearest rank).
    P99,
    /// First value in the sequence.
    First,
    /// Last value in the sequence.
    Last,
    /// Sum of all values.
    Sum,
}

/// Strategy for handling missing values before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataStrategy {
    /// Skip missing values and aggregate the remainder.
    Skip,
    /// Treat missing values as zero.
    Zero,
    /// Linear interpolation for interior gaps; backward-fill at the head,
    /// forward-fill at the tail.
    Interpolate,
    /// Carry the previous non-missing value forward; leading gaps drop.
    ForwardFill,
    /// Error when any value is missing.
    Raise,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced by sample aggregation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// Missing data encountered under [`MissingDataStrategy::Raise`].
    #[error("missing data encountered: {missing}/{total} values are absent")]
    MissingData {
        /// Number of absent samples.
        missing: usize,
        /// Total number of samples supplied.
        total: usize,
    },
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Aggregates optional samples using the given strategies.
///
/// Returns `Ok(None)` when the cleaned series is empty.
///
/// # Errors
///
/// Returns [`AggregationError::MissingData`] when `missing_strategy` is
/// [`MissingDataStrategy::Raise`] and any sample is absent.
pub fn aggregate_samples(
    samples: &[Option<f64>],
    strategy: AggregationStrategy,
    missing_strategy: MissingDataStrategy,
) -> Result<Option<f64>, AggregationError> {
    if samples.is_empty() {
        return Ok(None);
    }
    let Some(cleaned) = resolve_missing(samples, missing_strategy)? else {
        return Ok(None);
    };
    if cleaned.is_empty() {
        return Ok(None);
    }
    Ok(Some(apply_strategy(&cleaned, strategy)))
}

/// Applies the aggregation strategy to a non-empty cleaned series.
#[allow(
    clippy::cast_precision_loss,
    reason = "Sample counts are far below the f64 integer precision limit."
)]
fn apply_strategy(values: &[f64], strategy: AggregationStrategy) -> f64 {
    match strategy {
        AggregationStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
        AggregationStrategy::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let n = sorted.len();
            if n % 2 == 1 { sorted[n / 2] } else { (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0 }
        }
        AggregationStrategy::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregationStrategy::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationStrategy::P95 => percentile_of(values, 0.95),
        AggregationStrategy::P99 => percentile_of(values, 0.99),
        AggregationStrategy::First => values[0],
        AggregationStrategy::Last => values[values.len() - 1],
        AggregationStrategy::Sum => values.iter().sum::<f64>(),
    }
}

/// Nearest-rank percentile over an unsorted series.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "The rank index is clamped into the sample range before use."
)]
fn percentile_of(values: &[f64], percentile: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = (percentile * sorted.len() as f64) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

// ============================================================================
// SECTION: Missing-Data Handling
// ============================================================================

/// Resolves missing values according to strategy.
///
/// Returns `Ok(None)` when the series has no usable values at all.
fn resolve_missing(
    samples: &[Option<f64>],
    strategy: MissingDataStrategy,
) -> Result<Option<Vec<f64>>, AggregationError> {
    match strategy {
        MissingDataStrategy::Skip => {
            let kept: Vec<f64> = samples.iter().filter_map(|sample| *sample).collect();
            Ok(if kept.is_empty() { None } else { Some(kept) })
        }
        MissingDataStrategy::Zero => {
            Ok(Some(samples.iter().map(|sample| sample.unwrap_or(0.0)).collect()))
        }
        MissingDataStrategy::Interpolate => Ok(interpolate_missing(samples)),
        MissingDataStrategy::ForwardFill => Ok(forward_fill_missing(samples)),
        MissingDataStrategy::Raise => {
            let missing = samples.iter().filter(|sample| sample.is_none()).count();
            if missing > 0 {
                return Err(AggregationError::MissingData {
                    missing,
                    total: samples.len(),
                });
            }
            Ok(Some(samples.iter().filter_map(|sample| *sample).collect()))
        }
    }
}

/// Linear interpolation for interior gaps, fills at the edges.
#[allow(
    clippy::cast_precision_loss,
    reason = "Gap widths are small integers; exact in f64."
)]
fn interpolate_missing(samples: &[Option<f64>]) -> Option<Vec<f64>> {
    if samples.iter().all(Option::is_none) {
        return None;
    }
    let mut resolved = Vec::with_capacity(samples.len());
    for (idx, sample) in samples.iter().enumerate() {
        if let Some(value) = sample {
            resolved.push(*value);
            continue;
        }
        let prev = samples[..idx]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(j, s)| s.map(|value| (j, value)));
        let next = samples[idx + 1..]
            .iter()
            .enumerate()
            .find_map(|(j, s)| s.map(|value| (idx + 1 + j, value)));
        let filled = match (prev, next) {
            (Some((prev_idx, prev_val)), Some((next_idx, next_val))) => {
                let total_gap = (next_idx - prev_idx) as f64;
                let position = (idx - prev_idx) as f64;
                prev_val + (next_val - prev_val) * (position / total_gap)
            }
            (Some((_, prev_val)), None) => prev_val,
            (None, Some((_, next_val))) => next_val,
            (None, None) => return None,
        };
        resolved.push(filled);
    }
    Some(resolved)
}

/// Forward fill from the previous non-missing value; leading gaps drop.
fn forward_fill_missing(samples: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut resolved = Vec::with_capacity(samples.len());
    let mut last_valid: Option<f64> = None;
    for sample in samples {
        match sample {
            Some(value) => {
                last_valid = Some(*value);
                resolved.push(*value);
            }
            None => {
                if let Some(value) = last_valid {
                    resolved.push(value);
                }
            }
        }
    }
    if resolved.is_empty() { None } else { Some(resolved) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
