//! Declarative style resources.
//!
//! Basemaps, the track layer stack, terrain and the marker stylesheet are
//! defined once here and handed to the map surface; nothing in the refresh path
//! builds styling on the fly.

use crate::TrackPalette;
use serde_json::{json, Value};

// ============================================================================
// Ids
// ============================================================================

pub const TRACK_SOURCE: &str = "track";
pub const LIVE_SOURCE: &str = "track-live";
pub const TERRAIN_SOURCE: &str = "terrain-dem";

/// Raster layer of every basemap style.
pub const BASEMAP_LAYER: &str = "osm";
pub const OVERLAY_LAYER: &str = "brighten-overlay";
pub const GLOW_LAYER: &str = "track-glow";
pub const MAIN_LAYER: &str = "track-main";
pub const HIGHLIGHT_LAYER: &str = "track-highlight";
pub const LIVE_LAYER: &str = "track-live";

// ============================================================================
// Basemaps
// ============================================================================

/// A raster basemap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basemap {
    pub name: &'static str,
    pub tiles: &'static str,
    pub attribution: &'static str,
    /// Lay the translucent white overlay and raster tweaks over this basemap
    pub brighten: bool,
}

pub const BASEMAPS: &[Basemap] = &[
    Basemap {
        name: "dark",
        tiles: "https://basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
        attribution: "© OpenMapTiles © OpenStreetMap contributors",
        brighten: true,
    },
    Basemap {
        name: "light",
        tiles: "https://basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
        attribution: "© OpenMapTiles © OpenStreetMap contributors",
        brighten: false,
    },
    Basemap {
        name: "voyager",
        tiles: "https://basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png",
        attribution: "© CARTO © OpenStreetMap contributors",
        brighten: false,
    },
    Basemap {
        name: "satellite",
        tiles: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        attribution: "Tiles © Esri",
        brighten: false,
    },
];

impl Basemap {
    /// Style-v8 document with a single raster source and layer.
    pub fn style_json(&self) -> Value {
        json!({
            "version": 8,
            "sources": {
                BASEMAP_LAYER: {
                    "type": "raster",
                    "tiles": [self.tiles],
                    "tileSize": 256,
                    "attribution": self.attribution,
                }
            },
            "layers": [
                { "id": BASEMAP_LAYER, "type": "raster", "source": BASEMAP_LAYER }
            ]
        })
    }
}

/// Paint tweaks for the basemap raster under the brighten overlay.
pub const RASTER_TWEAKS: &[(&str, f64)] = &[
    ("raster-saturation", -0.2),
    ("raster-contrast", 0.15),
    ("raster-brightness-min", 0.05),
    ("raster-brightness-max", 0.95),
];

// ============================================================================
// Layers
// ============================================================================

/// One rendering layer as handed to the map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub layer_type: String,
    pub source: Option<String>,
    pub paint: Value,
    /// Hover/click handlers get bound to this layer when it is created
    pub interactive: bool,
}

impl LayerSpec {
    fn line(id: &str, source: &str, paint: Value) -> Self {
        Self {
            id: id.to_string(),
            layer_type: "line".to_string(),
            source: Some(source.to_string()),
            paint,
            interactive: false,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut layer = json!({ "id": self.id, "type": self.layer_type, "paint": self.paint });
        if let Some(source) = &self.source {
            layer["source"] = json!(source);
        }
        layer
    }
}

/// Colour by parity of `properties.i`.
pub fn parity_color(palette: &TrackPalette) -> Value {
    json!([
        "case",
        ["==", ["%", ["to-number", ["get", "i"]], 2], 0], palette.even,
        palette.odd
    ])
}

pub fn overlay_layer() -> LayerSpec {
    LayerSpec {
        id: OVERLAY_LAYER.to_string(),
        layer_type: "background".to_string(),
        source: None,
        paint: json!({ "background-color": "rgba(255,255,255,0.16)" }),
        interactive: false,
    }
}

/// Track layers bottom to top: glow, main, highlight, then the live overlay.
pub fn track_layers(palette: &TrackPalette, live_overlay: bool) -> Vec<LayerSpec> {
    let color = parity_color(palette);

    let mut main = LayerSpec::line(
        MAIN_LAYER,
        TRACK_SOURCE,
        json!({
            "line-color": color,
            "line-width": ["case", ["boolean", ["feature-state", "hover"], false], 8, 5],
            "line-opacity": 0.92
        }),
    );
    main.interactive = true;

    let mut layers = vec![
        LayerSpec::line(
            GLOW_LAYER,
            TRACK_SOURCE,
            json!({ "line-color": color, "line-width": 12, "line-opacity": 0.28, "line-blur": 6 }),
        ),
        main,
        LayerSpec::line(
            HIGHLIGHT_LAYER,
            TRACK_SOURCE,
            json!({ "line-color": "rgba(255,255,255,0.65)", "line-width": 1.6, "line-opacity": 0.55 }),
        ),
    ];

    if live_overlay {
        layers.push(LayerSpec::line(
            LIVE_LAYER,
            LIVE_SOURCE,
            json!({ "line-color": "#ffffff", "line-width": 4, "line-opacity": 0.9, "line-blur": 1 }),
        ));
    }

    layers
}

pub fn empty_collection() -> Value {
    json!({ "type": "FeatureCollection", "features": [] })
}

// ============================================================================
// Terrain
// ============================================================================

pub const TERRAIN_EXAGGERATION: f64 = 1.3;

pub fn terrain_source() -> Value {
    json!({
        "type": "raster-dem",
        "tiles": ["https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png"],
        "encoding": "terrarium",
        "tileSize": 256,
        "maxzoom": 15
    })
}

// ============================================================================
// Marker
// ============================================================================

/// Colours of the marker dot and its pulse ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerColors {
    pub fill: &'static str,
    pub ring_border: &'static str,
    pub ring_glow: &'static str,
}

pub const MARKER_GREEN: MarkerColors = MarkerColors {
    fill: "#2bff88",
    ring_border: "rgba(43,255,136,.55)",
    ring_glow: "0 0 22px rgba(43,255,136,.40)",
};

pub const MARKER_ORANGE: MarkerColors = MarkerColors {
    fill: "#ff7a18",
    ring_border: "rgba(255,122,24,.55)",
    ring_glow: "0 0 22px rgba(255,122,24,.40)",
};

/// Marker stylesheet, installed once when the tracker is created.
pub const MARKER_CSS: &str = r#"
.tracker-marker {
  position: relative;
  width: 16px;
  height: 16px;
  border-radius: 999px;
  border: 2px solid rgba(232,238,245,.95);
  box-shadow: 0 10px 26px rgba(0,0,0,.45);
}
.tracker-marker-ring {
  position: absolute;
  left: -10px;
  top: -10px;
  width: 36px;
  height: 36px;
  border-radius: 999px;
  border: 2px solid;
  animation: trackerPulse 1.6s ease-out infinite;
}
@keyframes trackerPulse {
  0%   { transform: scale(0.55); opacity: 0.85; }
  70%  { transform: scale(1.15); opacity: 0.20; }
  100% { transform: scale(1.25); opacity: 0.00; }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_stack_order() {
        let ids: Vec<String> = track_layers(&TrackPalette::default(), true).into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![GLOW_LAYER, MAIN_LAYER, HIGHLIGHT_LAYER, LIVE_LAYER]);

        let without_live = track_layers(&TrackPalette::default(), false);
        assert_eq!(without_live.len(), 3);
    }

    #[test]
    fn test_only_main_is_interactive() {
        let interactive: Vec<String> = track_layers(&TrackPalette::default(), true)
            .into_iter()
            .filter(|l| l.interactive)
            .map(|l| l.id)
            .collect();
        assert_eq!(interactive, vec![MAIN_LAYER]);
    }

    #[test]
    fn test_parity_color_uses_palette() {
        let expr = parity_color(&TrackPalette::default());
        assert_eq!(expr[2], json!("#46f3ff"));
        assert_eq!(expr[3], json!("#ff4bd8"));
    }

    #[test]
    fn test_basemap_style_json() {
        let style = BASEMAPS[0].style_json();
        assert_eq!(style["version"], json!(8));
        assert_eq!(style["layers"][0]["id"], json!(BASEMAP_LAYER));
        assert_eq!(style["sources"][BASEMAP_LAYER]["tiles"][0], json!(BASEMAPS[0].tiles));
    }

    #[test]
    fn test_layer_to_json() {
        let overlay = overlay_layer().to_json();
        assert!(overlay.get("source").is_none());
        let glow = track_layers(&TrackPalette::default(), false)[0].to_json();
        assert_eq!(glow["source"], json!(TRACK_SOURCE));
    }
}
