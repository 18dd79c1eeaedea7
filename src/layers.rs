//! Layer synchronisation.
//!
//! The track source and its layers are created exactly once per style. Later
//! refreshes only push new data. Checks go against the surface itself, so a
//! style switch that silently dropped everything is picked up on the next call.

use crate::style::{
    self, empty_collection, overlay_layer, track_layers, LayerSpec, BASEMAPS, BASEMAP_LAYER,
    LIVE_SOURCE, OVERLAY_LAYER, RASTER_TWEAKS, TERRAIN_EXAGGERATION, TERRAIN_SOURCE, TRACK_SOURCE,
};
use crate::{DisplayState, MapSurface, Result, TrackPalette};
use log::{debug, info};
use serde_json::{json, Value};

/// What an [`LayerSynchronizer::ensure`] call had to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub created_source: bool,
    pub created_layers: usize,
}

#[derive(Debug, Clone)]
pub struct LayerSynchronizer {
    layers: Vec<LayerSpec>,
    live_overlay: bool,
}

impl LayerSynchronizer {
    pub fn new(palette: &TrackPalette, live_overlay: bool) -> Self {
        Self {
            layers: track_layers(palette, live_overlay),
            live_overlay,
        }
    }

    /// Make sure the track source and every layer exist, then push `data`.
    ///
    /// Safe to call on every refresh: existing sources only get their data
    /// replaced and existing layers are never re-added. Interaction handlers
    /// are bound when their layer is created, so once per creation.
    pub fn ensure<S: MapSurface>(&self, surface: &mut S, state: &mut DisplayState, data: Value) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        if surface.has_source(TRACK_SOURCE) {
            surface.set_source_data(TRACK_SOURCE, data)?;
        } else {
            surface.add_source(TRACK_SOURCE, json!({ "type": "geojson", "data": data }))?;
            outcome.created_source = true;
        }

        if self.live_overlay && !surface.has_source(LIVE_SOURCE) {
            surface.add_source(LIVE_SOURCE, json!({ "type": "geojson", "data": empty_collection() }))?;
        }

        let basemap = BASEMAPS.get(state.basemap).unwrap_or(&BASEMAPS[0]);
        if basemap.brighten && !surface.has_layer(OVERLAY_LAYER) {
            surface.add_layer(&overlay_layer())?;
            outcome.created_layers += 1;
            apply_raster_tweaks(surface);
        }

        for layer in &self.layers {
            if surface.has_layer(&layer.id) {
                continue;
            }
            surface.add_layer(layer)?;
            outcome.created_layers += 1;
            if layer.interactive {
                surface.bind_interactions(&layer.id);
                state.interactions_bound = true;
            }
        }

        if outcome.created_source || outcome.created_layers > 0 {
            info!(
                "[Layers] Created {} layer(s){} on basemap {}",
                outcome.created_layers,
                if outcome.created_source { " and the track source" } else { "" },
                basemap.name
            );
        }

        state.layers_ready = true;
        Ok(outcome)
    }

    /// Push a frame of the live progress overlay. No-op without the overlay.
    pub fn set_live_data<S: MapSurface>(&self, surface: &mut S, data: Value) -> Result<()> {
        if !self.live_overlay || !surface.has_source(LIVE_SOURCE) {
            return Ok(());
        }
        surface.set_source_data(LIVE_SOURCE, data)
    }

    /// Bring the surface terrain in line with `state.terrain`.
    pub fn sync_terrain<S: MapSurface>(&self, surface: &mut S, state: &DisplayState) -> Result<()> {
        if state.terrain {
            if !surface.has_source(TERRAIN_SOURCE) {
                surface.add_source(TERRAIN_SOURCE, style::terrain_source())?;
            }
            surface.set_terrain(Some(TERRAIN_EXAGGERATION))
        } else {
            surface.set_terrain(None)
        }
    }

    /// Mark `feature_id` as hovered, clearing the previous one first.
    pub fn hover_enter<S: MapSurface>(&self, surface: &mut S, state: &mut DisplayState, feature_id: u64) {
        if state.hovered == Some(feature_id) {
            return;
        }
        if let Some(previous) = state.hovered.take() {
            surface.set_feature_hover(TRACK_SOURCE, previous, false);
        }
        surface.set_feature_hover(TRACK_SOURCE, feature_id, true);
        state.hovered = Some(feature_id);
    }

    /// Pointer left the track layer.
    pub fn hover_leave<S: MapSurface>(&self, surface: &mut S, state: &mut DisplayState) {
        if let Some(previous) = state.hovered.take() {
            surface.set_feature_hover(TRACK_SOURCE, previous, false);
        }
    }
}

fn apply_raster_tweaks<S: MapSurface>(surface: &mut S) {
    for (property, value) in RASTER_TWEAKS {
        if let Err(e) = surface.set_paint_property(BASEMAP_LAYER, property, json!(value)) {
            debug!("[Layers] Ignoring raster tweak {}: {}", property, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{GLOW_LAYER, HIGHLIGHT_LAYER, LIVE_LAYER, MAIN_LAYER};
    use crate::RecordingSurface;

    fn setup(live: bool) -> (LayerSynchronizer, RecordingSurface, DisplayState) {
        let mut surface = RecordingSurface::new();
        surface.set_style(&BASEMAPS[0]);
        (LayerSynchronizer::new(&TrackPalette::default(), live), surface, DisplayState::default())
    }

    fn data(n: u64) -> Value {
        json!({ "type": "FeatureCollection", "features": [], "n": n })
    }

    #[test]
    fn test_ensure_creates_stack_once() {
        let (sync, mut surface, mut state) = setup(true);

        let first = sync.ensure(&mut surface, &mut state, data(1)).unwrap();
        assert!(first.created_source);
        assert_eq!(first.created_layers, 5);
        assert_eq!(
            surface.layer_ids(),
            vec![OVERLAY_LAYER, GLOW_LAYER, MAIN_LAYER, HIGHLIGHT_LAYER, LIVE_LAYER]
        );

        let second = sync.ensure(&mut surface, &mut state, data(2)).unwrap();
        assert_eq!(second, SyncOutcome::default());
        assert_eq!(surface.layers.len(), 5);
        assert_eq!(surface.sources.len(), 2);
        assert_eq!(surface.source_data(TRACK_SOURCE), Some(&data(2)));
        assert_eq!(surface.bindings, vec![MAIN_LAYER]);
        assert!(state.layers_ready);
    }

    #[test]
    fn test_raster_tweaks_on_dark_basemap() {
        let (sync, mut surface, mut state) = setup(false);
        sync.ensure(&mut surface, &mut state, data(1)).unwrap();
        let key = (BASEMAP_LAYER.to_string(), "raster-saturation".to_string());
        assert_eq!(surface.paint.get(&key), Some(&json!(-0.2)));
    }

    #[test]
    fn test_no_overlay_on_light_basemap() {
        let (sync, mut surface, mut state) = setup(false);
        state.basemap = 1;
        surface.set_style(&BASEMAPS[1]);
        sync.ensure(&mut surface, &mut state, data(1)).unwrap();
        assert!(!surface.has_layer(OVERLAY_LAYER));
        assert!(surface.paint.is_empty());
    }

    #[test]
    fn test_style_change_recreates_and_rebinds() {
        let (sync, mut surface, mut state) = setup(false);
        sync.ensure(&mut surface, &mut state, data(1)).unwrap();

        surface.set_style(&BASEMAPS[2]);
        state.basemap = 2;
        state.style_changed();
        assert!(!state.interactions_bound);

        let outcome = sync.ensure(&mut surface, &mut state, data(2)).unwrap();
        assert!(outcome.created_source);
        assert_eq!(surface.layer_ids(), vec![GLOW_LAYER, MAIN_LAYER, HIGHLIGHT_LAYER]);
        assert_eq!(surface.bindings, vec![MAIN_LAYER, MAIN_LAYER]);
        assert!(state.interactions_bound);
    }

    #[test]
    fn test_hover_single_feature() {
        let (sync, mut surface, mut state) = setup(false);
        sync.ensure(&mut surface, &mut state, data(1)).unwrap();

        sync.hover_enter(&mut surface, &mut state, 0);
        assert_eq!(surface.hovered(), vec![0]);

        sync.hover_enter(&mut surface, &mut state, 1);
        assert_eq!(surface.hovered(), vec![1]);
        assert_eq!(state.hovered, Some(1));

        sync.hover_leave(&mut surface, &mut state);
        assert!(surface.hovered().is_empty());
        assert_eq!(state.hovered, None);
    }

    #[test]
    fn test_terrain_sync() {
        let (sync, mut surface, mut state) = setup(false);
        state.terrain = true;
        sync.sync_terrain(&mut surface, &state).unwrap();
        assert_eq!(surface.terrain, Some(TERRAIN_EXAGGERATION));
        // Second call must not re-add the DEM source
        sync.sync_terrain(&mut surface, &state).unwrap();

        state.terrain = false;
        sync.sync_terrain(&mut surface, &state).unwrap();
        assert_eq!(surface.terrain, None);
    }

    #[test]
    fn test_live_data_without_overlay_is_noop() {
        let (sync, mut surface, mut state) = setup(false);
        sync.ensure(&mut surface, &mut state, data(1)).unwrap();
        sync.set_live_data(&mut surface, data(9)).unwrap();
        assert!(surface.source_data(LIVE_SOURCE).is_none());
    }
}
