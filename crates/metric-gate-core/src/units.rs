// crates/metric-gate-core/src/units.rs
// ============================================================================
// Module: Unit Conversion
// Description: Time and data unit conversion with auto-scaling helpers.
// Purpose: Provide fixed-factor conversions and display scaling for metrics.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Closed unit enums with fixed conversion tables. Data units are binary
//! (1 KB = 1024 B). Conversions reject negative inputs; auto-scaling picks
//! the largest unit that keeps the value at or above one and rounds to the
//! requested precision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Unit Enums
// ============================================================================

/// Time units for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl TimeUnit {
    /// Returns the display suffix for the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    /// Returns the conversion factor to milliseconds.
    const fn to_millis_factor(self) -> f64 {
        match self {
            Self::Milliseconds => 1.0,
            Self::Seconds => 1_000.0,
            Self::Minutes => 60_000.0,
            Self::Hours => 3_600_000.0,
            Self::Days => 86_400_000.0,
        }
    }
}

/// Data units for conversion (binary factors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataUnit {
    /// Bytes.
    Bytes,
    /// Kibibyte-scaled kilobytes (1024 bytes).
    Kilobytes,
    /// Megabytes (1024^2 bytes).
    Megabytes,
    /// Gigabytes (1024^3 bytes).
    Gigabytes,
    /// Terabytes (1024^4 bytes).
    Terabytes,
}

impl DataUnit {
    /// Returns the display suffix for the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bytes => "B",
            Self::Kilobytes => "KB",
            Self::Megabytes => "MB",
            Self::Gigabytes => "GB",
            Self::Terabytes => "TB",
        }
    }

    /// Returns the conversion factor to bytes.
    const fn to_bytes_factor(self) -> f64 {
        match self {
            Self::Bytes => 1.0,
            Self::Kilobytes => 1024.0,
            Self::Megabytes => 1024.0 * 1024.0,
            Self::Gigabytes => 1024.0 * 1024.0 * 1024.0,
            Self::Terabytes => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        }
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Converts a time value between units.
///
/// Returns `None` for negative inputs.
#[must_use]
pub fn convert_time(value: f64, from_unit: TimeUnit, to_unit: TimeUnit) -> Option<f64> {
    if value < 0.0 {
        tracing::warn!(value, from_unit = from_unit.as_str(), "units.convert_time.negative_value");
        return None;
    }
    let ms_value = value * from_unit.to_millis_factor();
    Some(ms_value / to_unit.to_millis_factor())
}

/// Converts a data value between units.
///
/// Returns `None` for negative inputs.
#[must_use]
pub fn convert_data(value: f64, from_unit: DataUnit, to_unit: DataUnit) -> Option<f64> {
    if value < 0.0 {
        tracing::warn!(value, from_unit = from_unit.as_str(), "units.convert_data.negative_value");
        return None;
    }
    let bytes_value = value * from_unit.to_bytes_factor();
    Some(bytes_value / to_unit.to_bytes_factor())
}

// ============================================================================
// SECTION: Auto-Scaling
// ============================================================================

/// Scales a millisecond value to the most readable time unit.
///
/// Negative inputs are returned unchanged in milliseconds.
#[must_use]
pub fn auto_scale_time(value_ms: f64, precision: u32) -> (f64, &'static str) {
    if value_ms < 0.0 {
        return (value_ms, TimeUnit::Milliseconds.as_str());
    }
    let unit = if value_ms < TimeUnit::Seconds.to_millis_factor() {
        TimeUnit::Milliseconds
    } else if value_ms < TimeUnit::Minutes.to_millis_factor() {
        TimeUnit::Seconds
    } else if value_ms < TimeUnit::Hours.to_millis_factor() {
        TimeUnit::Minutes
    } else if value_ms < TimeUnit::Days.to_millis_factor() {
        TimeUnit::Hours
    } else {
        TimeUnit::Days
    };
    (round_to(value_ms / unit.to_millis_factor(), precision), unit.as_str())
}

/// Scales a byte value to the most readable data unit.
///
/// Negative inputs are returned unchanged in bytes.
#[must_use]
pub fn auto_scale_data(value_bytes: f64, precision: u32) -> (f64, &'static str) {
    if value_bytes < 0.0 {
        return (value_bytes, DataUnit::Bytes.as_str());
    }
    let unit = if value_bytes < DataUnit::Kilobytes.to_bytes_factor() {
        DataUnit::Bytes
    } else if value_bytes < DataUnit::Megabytes.to_bytes_factor() {
        DataUnit::Kilobytes
    } else if value_bytes < DataUnit::Gigabytes.to_bytes_factor() {
        DataUnit::Megabytes
    } else if value_bytes < DataUnit::Terabytes.to_bytes_factor() {
        DataUnit::Gigabytes
    } else {
        DataUnit::Terabytes
    };
    (round_to(value_bytes / unit.to_bytes_factor(), precision), unit.as_str())
}

/// Rounds a value to the given number of decimal places.
fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

// ============================================================================
// SECTION: Tests
// ============================================================================
