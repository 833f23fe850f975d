// crates/metric-gate-core/src/statistics.rs
// ============================================================================
// Module: Statistical Utilities
// Description: Descriptive statistics, confidence intervals, anomaly and
//              trend detection for performance samples.
// Purpose: Keep all analysis deterministic and server-side.
// Dependencies: rand, tracing
// ============================================================================

//! ## Overview
//! Statistics are computed the same way for within-run samples and cross-run
//! series, so comparisons stay consistent. Percentiles use the nearest-rank
//! definition on the sorted sample list. The bootstrap confidence interval
//! uses a non-cryptographic RNG; it estimates a distribution, it does not
//! protect anything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rand::Rng;

// ============================================================================
// SECTION: Statistics Record
// ============================================================================

/// Container for computed statistical metrics.
///
/// # Invariants
/// - `std_dev` and `cv` are `None` when fewer than two samples were supplied.
/// - `cv` is additionally `None` when the mean is not positive.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStatistics {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (robust to outliers).
    pub median: f64,
    /// Minimum sample.
    pub min: f64,
    /// Maximum sample.
    pub max: f64,
    /// Sample standard deviation, requires two or more samples.
    pub std_dev: Option<f64>,
    /// Coefficient of variation (`std_dev / mean`).
    pub cv: Option<f64>,
    /// 95th percentile (nearest rank).
    pub p95: f64,
    /// 99th percentile (nearest rank).
    pub p99: f64,
    /// Custom percentiles keyed as `p<percent>` (e.g. `p80`).
    pub percentiles: Option<BTreeMap<String, f64>>,
    /// Number of samples.
    pub count: usize,
}

/// Computes descriptive statistics for a sample list.
///
/// Returns `None` when `samples` is empty. Custom percentile requests outside
/// `0.0..=1.0` are ignored.
#[must_use]
pub fn compute_statistics(
    samples: &[f64],
    percentiles: Option<&[f64]>,
) -> Option<SampleStatistics> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    let mean = mean_of(samples);
    let min = sorted[0];
    let max = sorted[n - 1];
    let median = median_of_sorted(&sorted);

    let mut std_dev = None;
    let mut cv = None;
    if n >= 2 {
        let deviation = sample_std_dev(samples, mean);
        std_dev = Some(deviation);
        if mean > 0.0 {
            cv = Some(deviation / mean);
        }
    }

    let p95 = nearest_rank(&sorted, 0.95);
    let p99 = nearest_rank(&sorted, 0.99);

    let custom = percentiles.map(|requested| {
        let mut map = BTreeMap::new();
        for p in requested {
            if (0.0..=1.0).contains(p) {
                let label = format!("p{}", percent_label(*p));
                map.insert(label, nearest_rank(&sorted, *p));
            }
        }
        map
    });

    Some(SampleStatistics {
        mean,
        median,
        min,
        max,
        std_dev,
        cv,
        p95,
        p99,
        percentiles: custom,
        count: n,
    })
}

// ============================================================================
// SECTION: Confidence Intervals
// ============================================================================

/// Confidence interval estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceMethod {
    /// Normal approximation; z-scores for n >= 30, t-approximations below.
    Normal,
    /// Bootstrap resampling with the percentile method.
    Bootstrap,
}

/// Number of bootstrap resamples drawn for the percentile method.
const BOOTSTRAP_RESAMPLES: usize = 1000;

/// Computes a confidence interval for the mean.
///
/// Returns `None` when fewer than two samples are supplied. Confidence levels
/// without a tabulated critical value fall back to 1.96.
#[must_use]
pub fn compute_confidence_interval(
    samples: &[f64],
    confidence: f64,
    method: ConfidenceMethod,
) -> Option<(f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    match method {
        ConfidenceMethod::Normal => confidence_interval_normal(samples, confidence),
        ConfidenceMethod::Bootstrap => confidence_interval_bootstrap(samples, confidence),
    }
}

/// Normal-approximation confidence interval.
#[allow(
    clippy::cast_precision_loss,
    reason = "Sample counts are far below the f64 integer precision limit."
)]
fn confidence_interval_normal(samples: &[f64], confidence: f64) -> Option<(f64, f64)> {
    let n = samples.len();
    let mean = mean_of(samples);
    let std_error = sample_std_dev(samples, mean) / (n as f64).sqrt();
    let critical = critical_value(confidence, n);
    let margin = critical * std_error;
    Some((mean - margin, mean + margin))
}

/// Returns the z/t critical value for the supported confidence levels.
///
/// Small samples (n < 30) use t-approximations for ten degrees of freedom.
fn critical_value(confidence: f64, n: usize) -> f64 {
    let table: &[(f64, f64)] = if n < 30 {
        &[(0.90, 1.833), (0.95, 2.228), (0.99, 3.169)]
    } else {
        &[(0.90, 1.645), (0.95, 1.960), (0.99, 2.576)]
    };
    table
        .iter()
        .find(|(level, _)| (confidence - level).abs() < f64::EPSILON)
        .map_or(1.96, |(_, value)| *value)
}

/// Bootstrap percentile-method confidence interval.
///
/// The RNG is explicitly non-cryptographic; resampling only needs statistical
/// uniformity.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "Resample indices derive from in-range percentile arithmetic."
)]
fn confidence_interval_bootstrap(samples: &[f64], confidence: f64) -> Option<(f64, f64)> {
    let n = samples.len();
    let mut rng = rand::thread_rng();
    let mut bootstrap_means = Vec::with_capacity(BOOTSTRAP_RESAMPLES);
    for _ in 0..BOOTSTRAP_RESAMPLES {
        let mut total = 0.0;
        for _ in 0..n {
            total += samples[rng.gen_range(0..n)];
        }
        bootstrap_means.push(total / n as f64);
    }
    bootstrap_means.sort_by(f64::total_cmp);

    let alpha = 1.0 - confidence;
    let lower_idx = ((alpha / 2.0) * BOOTSTRAP_RESAMPLES as f64) as usize;
    let upper_idx = ((1.0 - alpha / 2.0) * BOOTSTRAP_RESAMPLES as f64) as usize;
    let lower = bootstrap_means.get(lower_idx).copied()?;
    let upper = bootstrap_means.get(upper_idx.min(BOOTSTRAP_RESAMPLES - 1)).copied()?;
    Some((lower, upper))
}

// ============================================================================
// SECTION: Anomaly Detection
// ============================================================================

/// Anomaly (outlier) detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyMethod {
    /// Interquartile range fences (robust default, threshold 1.5).
    Iqr,
    /// Z-score distance from the mean (assumes normality, threshold 3.0).
    ZScore,
    /// Modified z-score via median absolute deviation (threshold 3.0).
    Mad,
}

/// Constant making MAD consistent with the standard deviation for normal data.
const MAD_CONSISTENCY: f64 = 0.6745;

/// Detects anomalous samples and returns their indices.
///
/// Requires at least three samples; returns an empty list otherwise.
#[must_use]
pub fn detect_anomalies(samples: &[f64], method: AnomalyMethod, threshold: f64) -> Vec<usize> {
    if samples.len() < 3 {
        return Vec::new();
    }
    match method {
        AnomalyMethod::Iqr => detect_anomalies_iqr(samples, threshold),
        AnomalyMethod::ZScore => detect_anomalies_zscore(samples, threshold),
        AnomalyMethod::Mad => detect_anomalies_mad(samples, threshold),
    }
}

/// Interquartile-range fence detection.
fn detect_anomalies_iqr(samples: &[f64], threshold: f64) -> Vec<usize> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = q3 - q1;
    let lower = q1 - threshold * iqr;
    let upper = q3 + threshold * iqr;
    samples
        .iter()
        .enumerate()
        .filter(|(_, value)| **value < lower || **value > upper)
        .map(|(idx, _)| idx)
        .collect()
}

/// Z-score distance detection.
fn detect_anomalies_zscore(samples: &[f64], threshold: f64) -> Vec<usize> {
    let mean = mean_of(samples);
    let std_dev = sample_std_dev(samples, mean);
    if std_dev == 0.0 {
        return Vec::new();
    }
    samples
        .iter()
        .enumerate()
        .filter(|(_, value)| ((*value - mean) / std_dev).abs() > threshold)
        .map(|(idx, _)| idx)
        .collect()
}

/// Median-absolute-deviation detection via the modified z-score.
fn detect_anomalies_mad(samples: &[f64], threshold: f64) -> Vec<usize> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = median_of_sorted(&sorted);
    let mut deviations: Vec<f64> = samples.iter().map(|value| (value - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    let mad = median_of_sorted(&deviations);
    if mad == 0.0 {
        return Vec::new();
    }
    samples
        .iter()
        .enumerate()
        .filter(|(_, value)| MAD_CONSISTENCY * (*value - median).abs() / mad > threshold)
        .map(|(idx, _)| idx)
        .collect()
}

// ============================================================================
// SECTION: Trend Detection
// ============================================================================

/// Trend detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMethod {
    /// Least-squares linear regression slope.
    Linear,
    /// Non-parametric Mann-Kendall tau.
    MannKendall,
}

/// Direction classification for a detected trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    /// Values grow over time.
    Increasing,
    /// Values shrink over time.
    Decreasing,
    /// No significant movement.
    Stable,
}

impl TrendDirection {
    /// Returns a stable label for the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Detects a trend over a value series.
///
/// `timestamps` defaults to sample indices when absent and must match the
/// value count when present. Requires at least three values.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    reason = "Index-derived x coordinates are exact for plausible series."
)]
pub fn detect_trend(
    values: &[f64],
    timestamps: Option<&[f64]>,
    method: TrendMethod,
) -> Option<(TrendDirection, f64)> {
    if values.len() < 3 {
        return None;
    }
    let xs: Vec<f64> = match timestamps {
        Some(given) => {
            if given.len() != values.len() {
                tracing::warn!(
                    values = values.len(),
                    timestamps = given.len(),
                    "statistics.trend_length_mismatch"
                );
                return None;
            }
            given.to_vec()
        }
        None => (0..values.len()).map(|idx| idx as f64).collect(),
    };
    match method {
        TrendMethod::Linear => detect_trend_linear(values, &xs),
        TrendMethod::MannKendall => detect_trend_mann_kendall(values),
    }
}

/// Least-squares slope classification.
///
/// The stability band is 0.1% of the mean value per time unit.
fn detect_trend_linear(values: &[f64], xs: &[f64]) -> Option<(TrendDirection, f64)> {
    let x_mean = mean_of(xs);
    let y_mean = mean_of(values);
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }
    if denominator == 0.0 {
        return Some((TrendDirection::Stable, 0.0));
    }
    let slope = numerator / denominator;
    let threshold = (y_mean * 0.001).abs();
    let direction = if slope.abs() < threshold {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };
    Some((direction, slope))
}

/// Mann-Kendall tau classification.
///
/// The stability band is |tau| <= 0.1.
#[allow(
    clippy::cast_precision_loss,
    reason = "Pair counts for plausible series are exact in f64."
)]
fn detect_trend_mann_kendall(values: &[f64]) -> Option<(TrendDirection, f64)> {
    let n = values.len();
    let mut s = 0_i64;
    for i in 0..n - 1 {
        for j in i + 1..n {
            if values[j] > values[i] {
                s += 1;
            } else if values[j] < values[i] {
                s -= 1;
            }
        }
    }
    let comparisons = (n * (n - 1) / 2) as f64;
    let tau = if comparisons > 0.0 { s as f64 / comparisons } else { 0.0 };
    let direction = if tau > 0.1 {
        TrendDirection::Increasing
    } else if tau < -0.1 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };
    Some((direction, tau))
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Arithmetic mean of a non-empty slice.
#[allow(
    clippy::cast_precision_loss,
    reason = "Sample counts are far below the f64 integer precision limit."
)]
fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n-1) standard deviation.
#[allow(
    clippy::cast_precision_loss,
    reason = "Sample counts are far below the f64 integer precision limit."
)]
fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Median of an already-sorted slice.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 { sorted[n / 2] } else { (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0 }
}

/// Nearest-rank percentile of an already-sorted slice.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "The rank index is clamped into the sample range before use."
)]
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let n = sorted.len();
    let idx = (percentile * n as f64) as usize;
    sorted[idx.min(n - 1)]
}

/// Formats a percentile fraction as an integer percent label.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Validated percentile fractions scale into u32 percent labels."
)]
fn percent_label(percentile: f64) -> u32 {
    (percentile * 100.0) as u32
}

// ============================================================================
// SECTION: Tests
// ============================================================================
