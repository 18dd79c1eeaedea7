//! Process-wide display state.
//!
//! One value, owned by the [`Tracker`](crate::Tracker) and lent to each
//! presenter, instead of flags scattered across components. Never persisted.

use crate::{Status, TrackerConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    /// Track source and layers exist on the current style
    pub layers_ready: bool,
    /// Hover/click handlers are bound for the current layer set
    pub interactions_bound: bool,
    pub marker_placed: bool,
    /// The camera has been fitted to the track once
    pub initial_fit_done: bool,
    /// Index into [`BASEMAPS`](crate::BASEMAPS)
    pub basemap: usize,
    pub terrain: bool,
    /// Live progress sweep on/off
    pub live: bool,
    /// Marker blink on/off
    pub blinking: bool,
    /// At most one hovered feature
    pub hovered: Option<u64>,
    pub status: Status,
}

impl DisplayState {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            layers_ready: false,
            interactions_bound: false,
            marker_placed: false,
            initial_fit_done: false,
            basemap: config.basemap,
            terrain: config.terrain,
            live: config.live_overlay,
            blinking: true,
            hovered: None,
            status: Status::Idle,
        }
    }

    /// A new style drops every source, layer and feature state.
    pub fn style_changed(&mut self) {
        self.layers_ready = false;
        self.interactions_bound = false;
        self.hovered = None;
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}
