//! Property normalisation.
//!
//! Upstream exporters disagree on key names (`distance_m` vs `distance`,
//! `moving_time_s` vs `elapsed_time`, ...). Each quantity has a fixed priority
//! list; the first key holding a finite number wins and keys are never merged.

use serde_json::{Map, Value};

/// Distance candidates, meters.
pub const DISTANCE_KEYS: &[&str] = &["distance_m", "distance", "dist_m", "length_m"];

/// Duration candidates, seconds. Moving time is preferred over elapsed time.
pub const DURATION_KEYS: &[&str] = &[
    "moving_time_s",
    "moving_time",
    "duration_s",
    "elapsed_time_s",
    "elapsed_time",
    "duration",
];

/// Elevation gain candidates, meters.
pub const ELEVATION_KEYS: &[&str] = &[
    "elev_gain_m",
    "total_elevation_gain",
    "elevation_gain",
    "elev",
    "elevation_m",
    "elevation",
];

pub const TYPE_KEYS: &[&str] = &["type", "sport_type", "activity_type"];
pub const NAME_KEYS: &[&str] = &["name", "title"];
pub const DATE_KEYS: &[&str] = &["start_date", "start_date_local", "date"];

/// First finite numeric value among `keys`, in order.
///
/// JSON numbers and numeric strings count; `null`, booleans, empty strings and
/// non-finite values are treated as absent and the search continues.
pub fn first_number(properties: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| properties.get(*key))
        .find_map(as_finite)
}

/// First non-empty string among `keys`, in order.
pub fn first_text<'a>(properties: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| properties.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

pub fn distance(properties: &Map<String, Value>) -> Option<f64> {
    first_number(properties, DISTANCE_KEYS)
}

pub fn duration(properties: &Map<String, Value>) -> Option<f64> {
    first_number(properties, DURATION_KEYS)
}

pub fn elevation(properties: &Map<String, Value>) -> Option<f64> {
    first_number(properties, ELEVATION_KEYS)
}

pub(crate) fn as_finite(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
