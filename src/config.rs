//! Tracker configuration.
//!
//! All timings are plain milliseconds so a config file stays readable; use the
//! accessor methods to get [`Duration`]s.

use crate::{GpsPoint, Result, TrackerError, BASEMAPS};
use serde::Deserialize;
use std::time::Duration;

/// Line colours for alternating activities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackPalette {
    /// Colour for features with even `i` (default: cyan)
    pub even: String,
    /// Colour for features with odd `i` (default: magenta)
    pub odd: String,
}

impl Default for TrackPalette {
    fn default() -> Self {
        Self {
            even: "#46f3ff".to_string(),
            odd: "#ff4bd8".to_string(),
        }
    }
}

/// Configuration for the tracker controller and its presenters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Track document location. Default: `./data/track.geojson`
    pub track_url: String,

    /// Latest-position document location. Default: `./data/latest.json`
    pub latest_url: String,

    /// Poll interval. Default: 60000 ms
    pub refresh_interval_ms: u64,

    /// Per-request timeout for network sources. Default: 15000 ms
    pub request_timeout_ms: u64,

    /// Camera center before the first successful refresh, as `[lng, lat]`.
    pub initial_center: [f64; 2],

    /// Default: 11
    pub initial_zoom: f64,

    /// Padding around the track box when fitting the camera. Default: 40 px
    pub fit_padding: u32,

    /// Camera animation duration. Default: 800 ms
    pub camera_duration_ms: u64,

    /// Zoom used when the track has no box and the camera centers on the
    /// latest position instead. Default: 13
    pub fallback_zoom: f64,

    /// Re-fit the camera on every refresh instead of only the first one.
    /// Default: false (user pan/zoom is preserved)
    pub refit_on_refresh: bool,

    /// Index into [`BASEMAPS`]. Default: 0 (dark)
    pub basemap: usize,

    /// Start with 3D terrain enabled. Default: false
    pub terrain: bool,

    /// Create the live progress overlay and start its sweep. Default: true
    pub live_overlay: bool,

    /// Time for one sweep along the line. Default: 8000 ms
    pub live_sweep_ms: u64,

    /// Live overlay frame spacing. Default: 50 ms
    pub live_frame_ms: u64,

    /// Marker colour toggle interval. Default: 700 ms
    pub blink_interval_ms: u64,

    /// Max pointer distance to a line for hover/click. Default: 25 m
    pub hover_tolerance_m: f64,

    pub palette: TrackPalette,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_url: "./data/track.geojson".to_string(),
            latest_url: "./data/latest.json".to_string(),
            refresh_interval_ms: 60_000,
            request_timeout_ms: 15_000,
            initial_center: [9.17, 48.78],
            initial_zoom: 11.0,
            fit_padding: 40,
            camera_duration_ms: 800,
            fallback_zoom: 13.0,
            refit_on_refresh: false,
            basemap: 0,
            terrain: false,
            live_overlay: true,
            live_sweep_ms: 8_000,
            live_frame_ms: 50,
            blink_interval_ms: 700,
            hover_tolerance_m: 25.0,
            palette: TrackPalette::default(),
        }
    }
}

impl TrackerConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("refresh_interval_ms", self.refresh_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("live_sweep_ms", self.live_sweep_ms),
            ("live_frame_ms", self.live_frame_ms),
            ("blink_interval_ms", self.blink_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(TrackerError::Config(format!("{} must be > 0", name)));
            }
        }
        if self.basemap >= BASEMAPS.len() {
            return Err(TrackerError::Config(format!(
                "basemap {} out of range (0..{})",
                self.basemap,
                BASEMAPS.len()
            )));
        }
        if !self.hover_tolerance_m.is_finite() || self.hover_tolerance_m < 0.0 {
            return Err(TrackerError::Config("hover_tolerance_m must be >= 0".to_string()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn camera_duration(&self) -> Duration {
        Duration::from_millis(self.camera_duration_ms)
    }

    pub fn live_sweep(&self) -> Duration {
        Duration::from_millis(self.live_sweep_ms)
    }

    pub fn live_frame(&self) -> Duration {
        Duration::from_millis(self.live_frame_ms)
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    pub fn initial_center_point(&self) -> GpsPoint {
        GpsPoint::new(self.initial_center[1], self.initial_center[0])
    }
}
