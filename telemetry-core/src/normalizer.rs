//! Record normalization
//!
//! Projects a raw row through a [`FieldMapping`] into a [`CanonicalRecord`],
//! coercing values to the canonical types. Coercion never fails: values that
//! cannot be interpreted become absent (or `false` for the leak flag).

use crate::mapping::FieldMapping;
use crate::types::{CanonicalField, CanonicalRecord, RawRow};
use chrono::{DateTime, Local};
use serde_json::Value;

/// Source values that mark a leak (compared lower-cased)
pub const LEAK_MARKERS: [&str; 4] = ["yes", "1", "true", "detected"];

/// Format used for the default timestamp
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// Normalize one raw row, defaulting missing timestamps to the current local time
pub fn normalize(mapping: &FieldMapping, row: &RawRow) -> CanonicalRecord {
    normalize_at(mapping, row, Local::now())
}

/// Normalize one raw row against an explicit "now"
pub fn normalize_at(mapping: &FieldMapping, row: &RawRow, now: DateTime<Local>) -> CanonicalRecord {
    let get = |field: CanonicalField| lookup(mapping, row, field);

    let mut record = CanonicalRecord::empty(String::new());

    for field in CanonicalField::NUMERIC {
        record.set_numeric(field, get(field).and_then(coerce_number));
    }

    record.leak = get(CanonicalField::Leak).map(is_leak_marker).unwrap_or(false);

    record.timestamp = get(CanonicalField::Timestamp)
        .and_then(scalar_text)
        .filter(|ts| !ts.is_empty())
        .unwrap_or_else(|| now.format(TIME_OF_DAY_FORMAT).to_string());

    record.lat = get(CanonicalField::Lat).filter(|v| !v.is_null()).cloned();
    record.lng = get(CanonicalField::Lng).filter(|v| !v.is_null()).cloned();

    record
}

fn lookup<'a>(mapping: &FieldMapping, row: &'a RawRow, field: CanonicalField) -> Option<&'a Value> {
    mapping.header(field).and_then(|header| row.get(header))
}

/// Coerce a source value to a finite number
///
/// Numbers pass through, strings are trimmed and parsed. Blank strings,
/// non-numeric text, non-finite results and non-scalar values are absent.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// True if the value is one of the accepted leak markers
pub fn is_leak_marker(value: &Value) -> bool {
    match scalar_text(value) {
        Some(text) => {
            let text = text.to_lowercase();
            LEAK_MARKERS.contains(&text.as_str())
        }
        None => false,
    }
}

/// Text form of a scalar value (`None` for null, arrays and objects)
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
