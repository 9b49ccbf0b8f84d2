//! Shared parsing utilities for data source responses.
//!
//! `ArcGIS` attribute objects are loosely typed: dates arrive as Unix
//! millisecond timestamps (sometimes strings), coordinates as numbers
//! or numeric strings, and field names vary in casing between yearly
//! layers. These helpers normalize all of that.

use chrono::{DateTime, Utc};

/// Looks up an attribute by name, case-insensitively, trying each
/// candidate name in order.
#[must_use]
pub fn attr<'a>(
    attributes: &'a serde_json::Map<String, serde_json::Value>,
    names: &[&str],
) -> Option<&'a serde_json::Value> {
    for name in names {
        for (key, value) in attributes {
            if key.eq_ignore_ascii_case(name) && !value.is_null() {
                return Some(value);
            }
        }
    }
    None
}

/// Looks up a string attribute, trimming whitespace. Empty strings are
/// treated as missing.
#[must_use]
pub fn attr_string(
    attributes: &serde_json::Map<String, serde_json::Value>,
    names: &[&str],
) -> Option<String> {
    let value = attr(attributes, names)?;
    let s = match value {
        serde_json::Value::String(s) => s.trim().to_owned(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Parses an `ArcGIS` date attribute into a UTC timestamp.
///
/// `ArcGIS` serves dates as Unix epoch milliseconds; some layers serve
/// them as ISO 8601 strings instead.
#[must_use]
pub fn parse_arcgis_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        serde_json::Value::String(s) => parse_iso_date(s),
        _ => None,
    }
}

/// Parses an ISO 8601 datetime string, with or without an offset or
/// fractional seconds.
#[must_use]
pub fn parse_iso_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

/// Parses a coordinate from a JSON number or numeric string. Returns
/// `None` for missing, unparseable, or zero values (0,0 is the null
/// island sentinel, never a real Baltimore geocode).
#[must_use]
pub fn parse_coordinate(value: Option<&serde_json::Value>) -> Option<f64> {
    let v = match value? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (v.is_finite() && v != 0.0).then_some(v)
}

/// Title-cases a neighborhood name the way the 311 data mostly already
/// is ("Fells Point", not "FELLS POINT"), so names join consistently.
#[must_use]
pub fn normalize_neighborhood(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let name = trimmed
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(name)
}
