//! Core types for the telemetry pipeline
//!
//! This module defines the canonical schema the dashboard understands, the
//! normalized record type produced for every raw row, and the error type
//! shared by the whole library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// A raw row as delivered by the source: header string -> scalar value
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while fetching, parsing or publishing
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source {url} answered with HTTP {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Render target '{target}' failed: {message}")]
    Render { target: String, message: String },
}

/// A fixed semantic column name, independent of the source's header spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalField {
    Speed,
    Ph,
    Salinity,
    Turbidity,
    Pressure,
    Leak,
    Lat,
    Lng,
    Timestamp,
}

impl CanonicalField {
    /// All canonical fields, in alias-table order
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::Speed,
        CanonicalField::Ph,
        CanonicalField::Salinity,
        CanonicalField::Turbidity,
        CanonicalField::Pressure,
        CanonicalField::Leak,
        CanonicalField::Lat,
        CanonicalField::Lng,
        CanonicalField::Timestamp,
    ];

    /// Fields normalized to `Option<f64>`
    pub const NUMERIC: [CanonicalField; 5] = [
        CanonicalField::Speed,
        CanonicalField::Ph,
        CanonicalField::Salinity,
        CanonicalField::Turbidity,
        CanonicalField::Pressure,
    ];

    /// Lowercase name used in logs, config and the alias table
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Speed => "speed",
            CanonicalField::Ph => "ph",
            CanonicalField::Salinity => "salinity",
            CanonicalField::Turbidity => "turbidity",
            CanonicalField::Pressure => "pressure",
            CanonicalField::Leak => "leak",
            CanonicalField::Lat => "lat",
            CanonicalField::Lng => "lng",
            CanonicalField::Timestamp => "timestamp",
        }
    }

    /// True for the five numeric sensor fields
    pub fn is_numeric(&self) -> bool {
        Self::NUMERIC.contains(self)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| format!("unknown canonical field: {}", s))
    }
}

/// One normalized sample
///
/// Numeric readings are `None` when the source value was missing or not a
/// number. A reading of zero is kept as `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub speed: Option<f64>,
    pub ph: Option<f64>,
    pub salinity: Option<f64>,
    pub turbidity: Option<f64>,
    pub pressure: Option<f64>,
    /// True only if the source reported one of the accepted leak markers
    pub leak: bool,
    /// Source timestamp, or the local `HH:MM:SS` at normalization time
    pub timestamp: String,
    /// Passed through untyped
    pub lat: Option<serde_json::Value>,
    /// Passed through untyped
    pub lng: Option<serde_json::Value>,
}

impl CanonicalRecord {
    /// Create an empty record stamped with the given timestamp
    pub fn empty(timestamp: impl Into<String>) -> Self {
        Self {
            speed: None,
            ph: None,
            salinity: None,
            turbidity: None,
            pressure: None,
            leak: false,
            timestamp: timestamp.into(),
            lat: None,
            lng: None,
        }
    }

    /// Get a numeric reading by field (`None` for non-numeric fields)
    pub fn numeric(&self, field: CanonicalField) -> Option<f64> {
        match field {
            CanonicalField::Speed => self.speed,
            CanonicalField::Ph => self.ph,
            CanonicalField::Salinity => self.salinity,
            CanonicalField::Turbidity => self.turbidity,
            CanonicalField::Pressure => self.pressure,
            _ => None,
        }
    }

    pub(crate) fn set_numeric(&mut self, field: CanonicalField, value: Option<f64>) {
        match field {
            CanonicalField::Speed => self.speed = value,
            CanonicalField::Ph => self.ph = value,
            CanonicalField::Salinity => self.salinity = value,
            CanonicalField::Turbidity => self.turbidity = value,
            CanonicalField::Pressure => self.pressure = value,
            _ => {}
        }
    }
}
