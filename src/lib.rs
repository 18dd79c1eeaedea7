//! # Live Tracker
//!
//! Live GPS activity tracker map: polls a track and a latest-position document,
//! keeps the map layers in sync, moves a pulsing position marker and renders
//! activity statistics.
//!
//! This library provides:
//! - Bounding boxes over heterogeneous GeoJSON geometry
//! - Property normalisation and human-readable formatting for activity stats
//! - Idempotent layer/source synchronisation against a map surface
//! - A fetch → validate → transform → apply refresh pipeline
//! - Cancellable timers for the marker blink and the live progress sweep
//!
//! The rendering engine and the network are collaborators behind two traits:
//! [`MapSurface`] and [`DocumentSource`].
//!
//! ## Features
//!
//! - **`http`** (default) - Enable the reqwest-backed [`HttpSource`]
//!
//! ## Quick Start
//!
//! ```rust
//! use live_tracker::{geo_utils, fields, format};
//! use serde_json::json;
//!
//! let track = json!({
//!     "type": "FeatureCollection",
//!     "features": [{
//!         "type": "Feature",
//!         "properties": { "distance_m": 12345.0, "moving_time_s": 3725 },
//!         "geometry": { "type": "LineString", "coordinates": [[9.17, 48.78], [9.20, 48.80]] }
//!     }]
//! });
//!
//! let bounds = geo_utils::geojson_bounds(&track).unwrap();
//! assert_eq!(bounds.to_bbox(), [9.17, 48.78, 9.20, 48.80]);
//!
//! let props = track["features"][0]["properties"].as_object().unwrap();
//! let distance = fields::distance(props);
//! println!("{}", format::format_distance(distance));
//! ```

// Unified error handling
pub mod error;
pub use error::{Result, TrackerError};

// Configuration
pub mod config;
pub use config::{TrackPalette, TrackerConfig};

// Geographic utilities (bounds, distance, line slicing)
pub mod geo_utils;

// Track / latest-position documents
pub mod track;
pub use track::{LatestPosition, Snapshot, Track, TrackFeature};

// Property normalisation and display formatting
pub mod fields;
pub mod format;

// Popup and stats panel rendering
pub mod stats;
pub use stats::{ActivitySummary, TrackTotals};

// Declarative style resources (basemaps, layer stack, marker css)
pub mod style;
pub use style::{Basemap, LayerSpec, BASEMAPS};

// Rendering engine boundary
pub mod surface;
pub use surface::{MapSurface, RecordingSurface};

// Layer synchronisation and hover state
pub mod layers;
pub use layers::LayerSynchronizer;

pub use hit_test::FeatureIndex;

// Cancellable periodic tasks
pub mod animation;
pub use animation::{LiveProgress, PeriodicTask};

// Pulsing position marker
pub mod marker;
pub use marker::{BlinkPhase, MarkerPresenter};

// Process-wide display state
pub mod state;
pub use state::DisplayState;

// Document sources (memory, file, http)
pub mod source;
pub use source::{Document, DocumentSource, FileSource, MemorySource};

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::HttpSource;

// Refresh pipeline stages
pub mod refresh;
pub use refresh::{RefreshOutcome, Status};

// Top-level controller
pub mod tracker;
pub use tracker::{Control, Tracker, UiCommand};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// GeoJSON positions are `[lng, lat]`; this type keeps the two named so the
/// order never has to be remembered at call sites.
///
/// # Example
/// ```
/// use live_tracker::GpsPoint;
/// let point = GpsPoint::new(48.78, 9.17); // Stuttgart
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// GeoJSON position order.
    pub fn to_lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Axis-aligned bounding box in degrees.
///
/// No antimeridian handling: a track crossing ±180° gets a box spanning the
/// whole globe in longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Whether the point lies inside or on the edge of the box.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }

    /// GeoJSON bbox order: `[min_lng, min_lat, max_lng, max_lat]`.
    pub fn to_bbox(&self) -> [f64; 4] {
        [self.min_lng, self.min_lat, self.max_lng, self.max_lat]
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
