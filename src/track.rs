//! Track and latest-position documents.
//!
//! Both documents are re-fetched wholesale on every refresh. Validation turns
//! the raw JSON into typed values; anything that fails here fails the whole
//! refresh cycle.

use crate::fields::as_finite;
use crate::geo_utils::geometry_points;
use crate::{GpsPoint, Result, TrackerError};
use log::debug;
use serde_json::{json, Map, Value};

const GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

/// One activity in the track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeature {
    /// Positional id, used as the map feature id for hover state
    pub id: u64,
    /// Sequence index `i`, drives the alternating line colour
    pub index: u64,
    pub geometry: Value,
    pub properties: Map<String, Value>,
}

impl TrackFeature {
    /// Flattened positions of the feature geometry.
    pub fn points(&self) -> Vec<GpsPoint> {
        geometry_points(&self.geometry)
    }

    fn to_geojson(&self) -> Value {
        let mut properties = self.properties.clone();
        properties.insert("i".to_string(), json!(self.index));
        json!({
            "type": "Feature",
            "id": self.id,
            "properties": properties,
            "geometry": self.geometry,
        })
    }
}

/// The polled collection of recorded activities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub features: Vec<TrackFeature>,
}

impl Track {
    /// Validate a track document.
    ///
    /// Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
    /// Each feature gets `id` = its position and keeps an existing
    /// non-negative integer `properties.i`, otherwise `i` = its position.
    pub fn from_value(mut doc: Value) -> Result<Self> {
        let kind = doc.get("type").and_then(Value::as_str).map(str::to_owned);
        let raw = match kind.as_deref() {
            Some("FeatureCollection") => match doc.get_mut("features").map(Value::take) {
                Some(Value::Array(features)) => features,
                _ => return Err(TrackerError::invalid("track", "FeatureCollection without a features array")),
            },
            Some("Feature") => vec![doc],
            Some(t) if GEOMETRY_TYPES.contains(&t) => {
                vec![json!({ "type": "Feature", "properties": {}, "geometry": doc })]
            }
            Some(t) => return Err(TrackerError::invalid("track", format!("unsupported type {:?}", t))),
            None => return Err(TrackerError::invalid("track", "missing GeoJSON type")),
        };

        let mut features = Vec::with_capacity(raw.len());
        for value in raw {
            let Value::Object(mut feature) = value else {
                debug!("[Track] Skipping non-object feature entry");
                continue;
            };
            let position = features.len() as u64;
            let properties = match feature.remove("properties") {
                Some(Value::Object(p)) => p,
                _ => Map::new(),
            };
            let geometry = feature.remove("geometry").unwrap_or(Value::Null);
            let index = properties.get("i").and_then(sequence_index).unwrap_or(position);

            features.push(TrackFeature { id: position, index, geometry, properties });
        }

        Ok(Self { features })
    }

    /// FeatureCollection with ids and `properties.i` filled in, ready for the map source.
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(TrackFeature::to_geojson).collect::<Vec<_>>(),
        })
    }

    pub fn get(&self, id: u64) -> Option<&TrackFeature> {
        self.features.get(id as usize).filter(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A non-negative integral `i`, as a JSON number or numeric text.
fn sequence_index(value: &Value) -> Option<u64> {
    if let Some(i) = value.as_u64() {
        return Some(i);
    }
    let f = as_finite(value)?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// The current-location record that drives the marker.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Raw timestamp text, formatted only for display
    pub ts: String,
}

impl LatestPosition {
    /// Validate a latest-position document: `{ "lat": .., "lon": .., "ts": .. }`.
    ///
    /// `lat` and `lon` must be finite numbers (`lng` is accepted for `lon`).
    /// `ts` is kept as text: strings verbatim, numbers via their JSON text,
    /// absent or null as an empty string.
    pub fn from_value(doc: &Value) -> Result<Self> {
        if !doc.is_object() {
            return Err(TrackerError::invalid("latest", "expected an object"));
        }
        let latitude = finite(doc.get("lat")).ok_or_else(|| TrackerError::invalid("latest", "lat is not a number"))?;
        let longitude = finite(doc.get("lon").or_else(|| doc.get("lng")))
            .ok_or_else(|| TrackerError::invalid("latest", "lon is not a number"))?;
        let ts = match doc.get("ts") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Ok(Self { latitude, longitude, ts })
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Validated result of one refresh cycle. Either both documents are good or
/// there is no snapshot at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub track: Track,
    pub latest: LatestPosition,
}

impl Snapshot {
    pub fn from_documents(track: Value, latest: Value) -> Result<Self> {
        Ok(Self {
            track: Track::from_value(track)?,
            latest: LatestPosition::from_value(&latest)?,
        })
    }
}
