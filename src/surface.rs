//! Rendering engine boundary.
//!
//! [`MapSurface`] is everything the tracker needs from a map engine. Adding a
//! source or layer that already exists is a caller error, exactly as in the
//! browser engines: implementations report it as [`TrackerError::Surface`]
//! and callers must check `has_source`/`has_layer` first.
//!
//! [`RecordingSurface`] is a headless implementation that keeps the whole map
//! state in memory. Tests and demos use it to observe what the tracker did.

use crate::style::{Basemap, LayerSpec, MarkerColors, BASEMAP_LAYER, TERRAIN_SOURCE};
use crate::{Bounds, GpsPoint, Result, TrackerError};
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub trait MapSurface {
    fn has_source(&self, id: &str) -> bool;

    /// Add a source from its spec (`{"type": "geojson", "data": ..}`, ...).
    /// Fails if the id exists.
    fn add_source(&mut self, id: &str, spec: Value) -> Result<()>;

    /// Replace the data of an existing GeoJSON source.
    fn set_source_data(&mut self, id: &str, data: Value) -> Result<()>;

    fn has_layer(&self, id: &str) -> bool;

    /// Fails if the id exists or the layer's source is missing.
    fn add_layer(&mut self, layer: &LayerSpec) -> Result<()>;

    fn set_paint_property(&mut self, layer: &str, property: &str, value: Value) -> Result<()>;

    /// Switch basemap. Drops every source, layer, feature state and the terrain.
    fn set_style(&mut self, basemap: &Basemap);

    /// Enable terrain from [`TERRAIN_SOURCE`] with the given exaggeration, or disable it.
    fn set_terrain(&mut self, exaggeration: Option<f64>) -> Result<()>;

    /// Route hover/click events on this layer back to the controller.
    fn bind_interactions(&mut self, layer: &str);

    fn set_feature_hover(&mut self, source: &str, feature_id: u64, hovered: bool);

    fn fit_bounds(&mut self, bounds: &Bounds, padding: u32, duration: Duration);

    fn ease_to(&mut self, center: GpsPoint, zoom: f64, duration: Duration);

    /// Install a stylesheet once, before anything is drawn.
    fn install_stylesheet(&mut self, css: &str);

    /// Create the single position marker. Fails if one exists.
    fn add_marker(&mut self, position: GpsPoint, colors: &MarkerColors) -> Result<()>;

    fn move_marker(&mut self, position: GpsPoint);

    fn set_marker_colors(&mut self, colors: &MarkerColors);

    fn show_popup(&mut self, at: GpsPoint, html: &str);

    fn close_popup(&mut self);

    fn set_panel(&mut self, html: &str);

    fn set_status(&mut self, status: &str, meta: &str);
}

/// A camera movement requested by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraMove {
    Fit { bounds: Bounds, padding: u32, duration: Duration },
    Ease { center: GpsPoint, zoom: f64, duration: Duration },
}

/// In-memory map surface.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub basemap: Option<&'static str>,
    pub style_changes: usize,
    pub sources: BTreeMap<String, Value>,
    pub layers: Vec<LayerSpec>,
    pub paint: HashMap<(String, String), Value>,
    pub terrain: Option<f64>,
    /// Every `bind_interactions` call, in order
    pub bindings: Vec<String>,
    pub hover_states: BTreeMap<u64, bool>,
    pub data_updates: usize,
    pub camera: Vec<CameraMove>,
    /// Stylesheets installed so far
    pub stylesheets: Vec<String>,
    pub marker: Option<GpsPoint>,
    pub marker_moves: usize,
    pub marker_colors: Option<MarkerColors>,
    pub popup: Option<(GpsPoint, String)>,
    pub panel: String,
    pub status: String,
    pub meta: String,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    /// Data of a GeoJSON source.
    pub fn source_data(&self, id: &str) -> Option<&Value> {
        self.sources.get(id).and_then(|s| s.get("data"))
    }

    /// Ids of features currently flagged as hovered.
    pub fn hovered(&self) -> Vec<u64> {
        self.hover_states
            .iter()
            .filter(|(_, hovered)| **hovered)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl MapSurface for RecordingSurface {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, spec: Value) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(TrackerError::Surface(format!("source {:?} already exists", id)));
        }
        debug!("[RecordingSurface] add source {}", id);
        self.sources.insert(id.to_string(), spec);
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: Value) -> Result<()> {
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| TrackerError::Surface(format!("source {:?} does not exist", id)))?;
        let Some(spec) = source.as_object_mut() else {
            return Err(TrackerError::Surface(format!("source {:?} is not a GeoJSON source", id)));
        };
        spec.insert("data".to_string(), data);
        self.data_updates += 1;
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        (self.basemap.is_some() && id == BASEMAP_LAYER) || self.layers.iter().any(|l| l.id == id)
    }

    fn add_layer(&mut self, layer: &LayerSpec) -> Result<()> {
        if self.has_layer(&layer.id) {
            return Err(TrackerError::Surface(format!("layer {:?} already exists", layer.id)));
        }
        if let Some(source) = &layer.source {
            if !self.sources.contains_key(source) {
                return Err(TrackerError::Surface(format!(
                    "layer {:?} references missing source {:?}",
                    layer.id, source
                )));
            }
        }
        debug!("[RecordingSurface] add layer {}", layer.id);
        self.layers.push(layer.clone());
        Ok(())
    }

    fn set_paint_property(&mut self, layer: &str, property: &str, value: Value) -> Result<()> {
        if !self.has_layer(layer) {
            return Err(TrackerError::Surface(format!("layer {:?} does not exist", layer)));
        }
        self.paint.insert((layer.to_string(), property.to_string()), value);
        Ok(())
    }

    fn set_style(&mut self, basemap: &Basemap) {
        debug!("[RecordingSurface] style -> {}", basemap.name);
        self.basemap = Some(basemap.name);
        self.style_changes += 1;
        self.sources.clear();
        self.layers.clear();
        self.paint.clear();
        self.hover_states.clear();
        self.terrain = None;
    }

    fn set_terrain(&mut self, exaggeration: Option<f64>) -> Result<()> {
        if exaggeration.is_some() && !self.sources.contains_key(TERRAIN_SOURCE) {
            return Err(TrackerError::Surface(format!("terrain source {:?} missing", TERRAIN_SOURCE)));
        }
        self.terrain = exaggeration;
        Ok(())
    }

    fn bind_interactions(&mut self, layer: &str) {
        self.bindings.push(layer.to_string());
    }

    fn set_feature_hover(&mut self, source: &str, feature_id: u64, hovered: bool) {
        if self.sources.contains_key(source) {
            self.hover_states.insert(feature_id, hovered);
        }
    }

    fn fit_bounds(&mut self, bounds: &Bounds, padding: u32, duration: Duration) {
        self.camera.push(CameraMove::Fit { bounds: *bounds, padding, duration });
    }

    fn ease_to(&mut self, center: GpsPoint, zoom: f64, duration: Duration) {
        self.camera.push(CameraMove::Ease { center, zoom, duration });
    }

    fn install_stylesheet(&mut self, css: &str) {
        self.stylesheets.push(css.to_string());
    }

    fn add_marker(&mut self, position: GpsPoint, colors: &MarkerColors) -> Result<()> {
        if self.marker.is_some() {
            return Err(TrackerError::Surface("marker already exists".to_string()));
        }
        self.marker = Some(position);
        self.marker_colors = Some(*colors);
        Ok(())
    }

    fn move_marker(&mut self, position: GpsPoint) {
        self.marker = Some(position);
        self.marker_moves += 1;
    }

    fn set_marker_colors(&mut self, colors: &MarkerColors) {
        self.marker_colors = Some(*colors);
    }

    fn show_popup(&mut self, at: GpsPoint, html: &str) {
        self.popup = Some((at, html.to_string()));
    }

    fn close_popup(&mut self) {
        self.popup = None;
    }

    fn set_panel(&mut self, html: &str) {
        self.panel = html.to_string();
    }

    fn set_status(&mut self, status: &str, meta: &str) {
        debug!("[RecordingSurface] status {:?} | {}", status, meta);
        self.status = status.to_string();
        self.meta = meta.to_string();
    }
}
