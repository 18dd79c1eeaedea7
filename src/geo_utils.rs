//! # Geographic Utilities
//!
//! Geometry helpers for the tracker map: bounding boxes over GeoJSON input,
//! track lengths, and slicing a line for the live progress overlay.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`geojson_bounds`] | Bounding box over a GeoJSON geometry, feature or collection |
//! | [`geometry_points`] | Flattened positions of a Point/LineString/MultiLineString |
//! | [`geometry_lines`] | The same positions, grouped per component line |
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`line_prefix`] | Leading fraction of a polyline, by length |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use live_tracker::geo_utils;
//! use serde_json::json;
//!
//! let doc = json!({
//!     "type": "FeatureCollection",
//!     "features": [
//!         { "type": "Feature", "properties": {},
//!           "geometry": { "type": "LineString", "coordinates": [[9.10, 48.70], [9.25, 48.80]] } },
//!         { "type": "Feature", "properties": {},
//!           "geometry": { "type": "Point", "coordinates": [9.05, 48.75] } }
//!     ]
//! });
//!
//! let bounds = geo_utils::geojson_bounds(&doc).unwrap();
//! assert_eq!(bounds.min_lng, 9.05);
//! assert_eq!(bounds.max_lat, 48.80);
//!
//! // Nothing to enclose: no box, never a panic
//! assert!(geo_utils::geojson_bounds(&json!({ "type": "FeatureCollection", "features": [] })).is_none());
//! ```
//!
//! ## Coordinate System
//!
//! GeoJSON positions are `[lng, lat]` in WGS84 degrees. Comparisons are plain
//! IEEE doubles; there is no antimeridian wraparound and no polygon support.

use crate::{Bounds, GpsPoint};
use geo::{Distance, Haversine, Point};
use serde_json::Value;

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the minimal bounding box of a GeoJSON-like document.
///
/// Accepts a `FeatureCollection`, a single `Feature`, or a bare geometry.
/// Coordinates are collected from `Point`, `LineString` and `MultiLineString`
/// geometries; other geometry types, null geometries and positions that are
/// not two finite numbers are skipped.
///
/// # Returns
///
/// `None` when the root is not a GeoJSON object, when a collection has no
/// `features` array, or when no usable coordinate was found. The caller then
/// centers on the latest known position instead.
pub fn geojson_bounds(doc: &Value) -> Option<Bounds> {
    let features: Vec<&Value> = match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => doc.get("features")?.as_array()?.iter().collect(),
        Some(_) => vec![doc],
        None => return None,
    };

    let mut points = Vec::new();
    for feature in features {
        let geometry = match feature.get("type").and_then(Value::as_str) {
            Some("Feature") => match feature.get("geometry") {
                Some(g) => g,
                None => continue,
            },
            _ => feature,
        };
        points.extend(geometry_points(geometry));
    }

    Bounds::from_points(&points)
}

/// Flatten the positions of a `Point`, `LineString` or `MultiLineString`.
///
/// Any other input yields an empty vector.
pub fn geometry_points(geometry: &Value) -> Vec<GpsPoint> {
    geometry_lines(geometry).into_iter().flatten().collect()
}

/// Positions grouped by component line. A `Point` is a one-position line and a
/// `MultiLineString` yields one entry per member line.
pub fn geometry_lines(geometry: &Value) -> Vec<Vec<GpsPoint>> {
    let coords = match geometry.get("coordinates") {
        Some(c) => c,
        None => return Vec::new(),
    };

    let lines = match geometry.get("type").and_then(Value::as_str) {
        Some("Point") => vec![parse_position(coords).into_iter().collect()],
        Some("LineString") => vec![parse_line(coords)],
        Some("MultiLineString") => coords
            .as_array()
            .map(|lines| lines.iter().map(parse_line).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    lines.into_iter().filter(|line: &Vec<GpsPoint>| !line.is_empty()).collect()
}

fn parse_line(line: &Value) -> Vec<GpsPoint> {
    line.as_array()
        .map(|positions| positions.iter().filter_map(parse_position).collect())
        .unwrap_or_default()
}

/// Parse a `[lng, lat, ...]` position. Extra elements (altitude) are ignored.
fn parse_position(position: &Value) -> Option<GpsPoint> {
    let pair = position.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    let lng = pair[0].as_f64()?;
    let lat = pair[1].as_f64()?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(GpsPoint::new(lat, lng))
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use live_tracker::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a polyline in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale (the smaller one), so a square search area built
/// from the result never undershoots. Clamped near the poles.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Line Slicing
// =============================================================================

/// Leading portion of a polyline covering `fraction` of its length.
///
/// `fraction` is clamped to `0.0..=1.0` (non-finite counts as 0). The result
/// starts at the first point and ends at a point interpolated linearly inside
/// the segment where the fraction is reached. Lines with fewer than two points
/// are returned unchanged.
///
/// # Example
///
/// ```rust
/// use live_tracker::{GpsPoint, geo_utils};
///
/// let line = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, 2.0)];
/// let half = geo_utils::line_prefix(&line, 0.5);
/// let end = half.last().unwrap();
/// assert!((end.longitude - 1.0).abs() < 1e-6);
/// ```
pub fn line_prefix(points: &[GpsPoint], fraction: f64) -> Vec<GpsPoint> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let target = polyline_length(points) * fraction;

    let mut prefix = vec![points[0]];
    let mut walked = 0.0;

    for w in points.windows(2) {
        let segment = haversine_distance(&w[0], &w[1]);
        if walked + segment >= target {
            let t = if segment > 0.0 { (target - walked) / segment } else { 0.0 };
            prefix.push(GpsPoint::new(
                w[0].latitude + (w[1].latitude - w[0].latitude) * t,
                w[0].longitude + (w[1].longitude - w[0].longitude) * t,
            ));
            return prefix;
        }
        walked += segment;
        prefix.push(w[1]);
    }

    prefix
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn line_feature(coords: Value) -> Value {
        json!({ "type": "Feature", "properties": {}, "geometry": { "type": "LineString", "coordinates": coords } })
    }

    #[test]
    fn test_bounds_feature_collection() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                line_feature(json!([[9.10, 48.70], [9.20, 48.75]])),
                line_feature(json!([[9.15, 48.72], [9.30, 48.81]])),
            ]
        });
        let b = geojson_bounds(&doc).unwrap();
        assert_eq!(b.min_lng, 9.10);
        assert_eq!(b.min_lat, 48.70);
        assert_eq!(b.max_lng, 9.30);
        assert_eq!(b.max_lat, 48.81);
    }

    #[test]
    fn test_bounds_is_minimal() {
        // Every extreme is attained by some coordinate, so no tighter box exists.
        let coords = vec![[-3.5, 10.0], [2.0, -7.25], [0.5, 0.5], [1.0, 11.0]];
        let doc = line_feature(json!(coords));
        let b = geojson_bounds(&doc).unwrap();

        for c in &coords {
            assert!(b.contains(&GpsPoint::new(c[1], c[0])));
        }
        assert!(coords.iter().any(|c| c[0] == b.min_lng));
        assert!(coords.iter().any(|c| c[0] == b.max_lng));
        assert!(coords.iter().any(|c| c[1] == b.min_lat));
        assert!(coords.iter().any(|c| c[1] == b.max_lat));
    }

    #[test]
    fn test_bounds_multilinestring_flattened() {
        let doc = json!({
            "type": "MultiLineString",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0]], [[-2.0, 5.0], [3.0, -1.0]]]
        });
        let b = geojson_bounds(&doc).unwrap();
        assert_eq!(b.to_bbox(), [-2.0, -1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_bounds_single_point() {
        let doc = json!({ "type": "Point", "coordinates": [9.17, 48.78] });
        let b = geojson_bounds(&doc).unwrap();
        assert_eq!(b.to_bbox(), [9.17, 48.78, 9.17, 48.78]);
    }

    #[test]
    fn test_bounds_empty_collection() {
        let doc = json!({ "type": "FeatureCollection", "features": [] });
        assert!(geojson_bounds(&doc).is_none());
    }

    #[test]
    fn test_bounds_geometry_less_collection() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": null },
                { "type": "Feature", "properties": {} },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } }
            ]
        });
        assert!(geojson_bounds(&doc).is_none());
    }

    #[test]
    fn test_bounds_malformed_input() {
        assert!(geojson_bounds(&json!(null)).is_none());
        assert!(geojson_bounds(&json!([1, 2, 3])).is_none());
        assert!(geojson_bounds(&json!({ "type": "FeatureCollection", "features": 7 })).is_none());
        assert!(geojson_bounds(&json!({ "type": "LineString", "coordinates": "nope" })).is_none());
        assert!(geojson_bounds(&json!({ "type": "LineString", "coordinates": [["a", "b"], [1]] })).is_none());
    }

    #[test]
    fn test_bounds_skips_bad_positions() {
        let doc = line_feature(json!([[1.0, 2.0], ["x", 9.0], [3.0, 4.0, 512.0]]));
        let b = geojson_bounds(&doc).unwrap();
        assert_eq!(b.to_bbox(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(48.78, 9.17);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_polyline_length_short() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GpsPoint::new(48.78, 9.17)]), 0.0);
    }

    #[test]
    fn test_line_prefix_bounds() {
        let line = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, 2.0)];

        let none = line_prefix(&line, 0.0);
        assert_eq!(none.len(), 2);
        assert_eq!(none[1], line[0]);

        let full = line_prefix(&line, 1.0);
        assert!(approx_eq(full.last().unwrap().longitude, 2.0, 1e-9));

        let clamped = line_prefix(&line, 7.0);
        assert!(approx_eq(clamped.last().unwrap().longitude, 2.0, 1e-9));

        let nan = line_prefix(&line, f64::NAN);
        assert_eq!(nan.last().unwrap(), &line[0]);
    }

    #[test]
    fn test_line_prefix_interpolates_inside_segment() {
        let line = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, 2.0)];
        let quarter = line_prefix(&line, 0.25);
        assert_eq!(quarter.len(), 2);
        assert!(approx_eq(quarter[1].longitude, 0.5, 1e-6));

        let three_quarters = line_prefix(&line, 0.75);
        assert_eq!(three_quarters.len(), 3);
        assert!(approx_eq(three_quarters[2].longitude, 1.5, 1e-6));
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_320.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));
        assert!(meters_to_degrees(111_320.0, 45.0) > 1.0);
    }
}
