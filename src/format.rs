//! Display formatting for distances, durations, elevations and timestamps.
//!
//! All functions are pure and total: absent values render as [`PLACEHOLDER`],
//! unparseable timestamps render as their raw text.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt::Display;

/// Rendered for any absent quantity.
pub const PLACEHOLDER: &str = "—";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const METERS_PER_MILE: f64 = 1609.344;
const FEET_PER_METER: f64 = 3.280_84;
/// Shorter digit runs are years or ids, not epoch milliseconds
const MIN_MILLIS_DIGITS: usize = 11;

/// `"12.3 km · 7.67 mi"`. Two decimals below 10 units, one above.
pub fn format_distance(meters: Option<f64>) -> String {
    match meters.filter(|m| m.is_finite()) {
        Some(m) => {
            let km = m / 1000.0;
            let mi = m / METERS_PER_MILE;
            format!("{:.*} km · {:.*} mi", precision(km), km, precision(mi), mi)
        }
        None => PLACEHOLDER.to_string(),
    }
}

fn precision(value: f64) -> usize {
    if value.abs() < 10.0 {
        2
    } else {
        1
    }
}

/// Seconds to the largest sensible units, floor-truncated.
///
/// Negative and non-finite input clamps to zero, so the result is never
/// negative: `0` → `"0m 00s"`, `3725` → `"1h 02m"`, `90061` → `"1d 1h 01m"`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };

    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{}d {}h {:02}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m {:02}s", minutes, secs)
    }
}

pub fn format_duration_opt(seconds: Option<f64>) -> String {
    seconds.map_or_else(|| PLACEHOLDER.to_string(), format_duration)
}

/// `"123 m · 404 ft"`, each rounded to the nearest integer.
pub fn format_elevation(meters: Option<f64>) -> String {
    match meters.filter(|m| m.is_finite()) {
        Some(m) => format!("{} m · {} ft", m.round() as i64, (m * FEET_PER_METER).round() as i64),
        None => PLACEHOLDER.to_string(),
    }
}

/// Parse the timestamp shapes seen in latest/track documents.
///
/// RFC 3339, integer milliseconds since the epoch (at least 11 digits), ISO date-times without an
/// offset (taken as UTC), and plain dates.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    if ts.len() >= MIN_MILLIS_DIGITS && ts.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(millis) = ts.parse::<i64>() {
            return Utc.timestamp_millis_opt(millis).single();
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a timestamp in the given zone; unparseable input comes back verbatim.
pub fn format_timestamp_in<Tz>(ts: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match parse_timestamp(ts) {
        Some(dt) => dt.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
        None => ts.to_string(),
    }
}

/// Format a timestamp in the local zone.
pub fn format_timestamp(ts: &str) -> String {
    format_timestamp_in(ts, &Local)
}
