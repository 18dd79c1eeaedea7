//! Top-level controller.
//!
//! [`Tracker`] owns the display state and every presenter, and is the only
//! place that mutates them. Timers and in-flight fetches never touch the map
//! directly: their results come back through the event loop in [`Tracker::run`].

use crate::animation::LiveProgress;
use crate::geo_utils::{self, line_prefix, polyline_length};
use crate::refresh::{error_guidance, fetch_snapshot, online_meta};
use crate::stats::{most_recent_feature, render_panel, render_popup};
use crate::style::{empty_collection, BASEMAPS, MARKER_CSS};
use crate::{
    ActivitySummary, DisplayState, DocumentSource, FeatureIndex, GpsPoint, LayerSynchronizer, MapSurface,
    MarkerPresenter, RefreshOutcome, Result, Snapshot, Status, Track, TrackTotals, TrackerConfig, TrackerError,
};
use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// User interaction forwarded from the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Pointer moved to this map position
    PointerMove(GpsPoint),
    /// Pointer left the map
    PointerLeave,
    Click(GpsPoint),
    /// Switch to the basemap at this index of [`BASEMAPS`]
    SetBasemap(usize),
    ToggleTerrain,
    ToggleLive,
    ToggleBlink,
    RefreshNow,
    Shutdown,
}

/// What the event loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Refresh,
    Stop,
}

type InFlight = Option<BoxFuture<'static, Result<Snapshot>>>;

pub struct Tracker<S: MapSurface, D: DocumentSource + 'static> {
    config: TrackerConfig,
    surface: S,
    source: Arc<D>,
    state: DisplayState,
    layers: LayerSynchronizer,
    marker: MarkerPresenter,
    live: LiveProgress,
    /// Last snapshot that made it onto the map
    last: Option<Snapshot>,
    index: FeatureIndex,
    /// Line swept by the live overlay
    live_line: Vec<GpsPoint>,
    meta: String,
    refresh_started: Option<Instant>,
}

impl<S: MapSurface, D: DocumentSource + 'static> Tracker<S, D> {
    /// Validate the config and put the surface in its initial state: basemap,
    /// terrain and the default camera.
    pub fn new(config: TrackerConfig, mut surface: S, source: D) -> Result<Self> {
        config.validate()?;
        let state = DisplayState::from_config(&config);
        let basemap = BASEMAPS
            .get(state.basemap)
            .ok_or_else(|| TrackerError::Config(format!("unknown basemap {}", state.basemap)))?;

        surface.install_stylesheet(MARKER_CSS);
        surface.set_style(basemap);
        surface.ease_to(config.initial_center_point(), config.initial_zoom, Duration::ZERO);
        surface.set_status(state.status.label(), "");

        let layers = LayerSynchronizer::new(&config.palette, config.live_overlay);
        layers.sync_terrain(&mut surface, &state)?;

        info!(
            "[Tracker] Ready on basemap {} (refresh every {:?})",
            basemap.name,
            config.refresh_interval()
        );

        Ok(Self {
            marker: MarkerPresenter::new(config.blink_interval()),
            live: LiveProgress::new(config.live_sweep(), config.live_frame()),
            config,
            surface,
            source: Arc::new(source),
            state,
            layers,
            last: None,
            index: FeatureIndex::build(&Track::default()),
            live_line: Vec::new(),
            meta: String::new(),
            refresh_started: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Run one complete refresh cycle and wait for it.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        self.begin_refresh();
        let result = fetch_snapshot(self.source.as_ref()).await;
        self.apply(result)
    }

    /// Apply stage of a refresh.
    ///
    /// On error nothing on the map changes except the status line. On success
    /// the layers, marker, panel, camera and hit-test index are brought up to
    /// date, then the status goes online.
    pub fn apply(&mut self, result: Result<Snapshot>) -> RefreshOutcome {
        let elapsed_ms = self.refresh_started.take().map_or(0, |t| t.elapsed().as_millis());
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[Refresh] Failed after {}ms: {}", elapsed_ms, e);
                return self.fail(e.to_string());
            }
        };

        match self.present(&snapshot) {
            Ok(fitted) => {
                let features = snapshot.track.len();
                info!(
                    "[Refresh] Applied {} feature(s) in {}ms, marker at {:.5}, {:.5}{}",
                    features,
                    elapsed_ms,
                    snapshot.latest.latitude,
                    snapshot.latest.longitude,
                    if fitted { ", camera fitted" } else { "" }
                );
                self.set_status(Status::Online, online_meta(&snapshot.latest));
                self.last = Some(snapshot);
                RefreshOutcome::Applied { features, fitted }
            }
            Err(e) => {
                warn!("[Refresh] Could not apply snapshot: {}", e);
                self.fail(e.to_string())
            }
        }
    }

    fn begin_refresh(&mut self) {
        self.refresh_started = Some(Instant::now());
        self.set_status(Status::Updating, self.meta.clone());
    }

    fn fail(&mut self, reason: String) -> RefreshOutcome {
        let guidance = error_guidance(self.source.as_ref());
        self.set_status(Status::Error, guidance);
        RefreshOutcome::Failed(reason)
    }

    fn present(&mut self, snapshot: &Snapshot) -> Result<bool> {
        let data = snapshot.track.to_geojson();
        let bounds = geo_utils::geojson_bounds(&data);

        self.layers.ensure(&mut self.surface, &mut self.state, data)?;
        self.marker.place(&mut self.surface, &mut self.state, snapshot.latest.point())?;
        self.surface.set_panel(&render_panel(&TrackTotals::from_track(&snapshot.track)));

        let mut fitted = false;
        if !self.state.initial_fit_done || self.config.refit_on_refresh {
            match bounds {
                Some(bounds) => {
                    self.surface
                        .fit_bounds(&bounds, self.config.fit_padding, self.config.camera_duration());
                    fitted = true;
                }
                None => {
                    debug!("[Refresh] Track has no box, centering on latest position");
                    self.surface.ease_to(
                        snapshot.latest.point(),
                        self.config.fallback_zoom,
                        self.config.camera_duration(),
                    );
                }
            }
            self.state.initial_fit_done = true;
        }

        self.index = FeatureIndex::build(&snapshot.track);
        self.live_line = most_recent_feature(&snapshot.track)
            .and_then(|f| {
                geo_utils::geometry_lines(&f.geometry)
                    .into_iter()
                    .max_by(|a, b| polyline_length(a).total_cmp(&polyline_length(b)))
            })
            .unwrap_or_default();

        if let Some(id) = self.state.hovered {
            if snapshot.track.get(id).is_none() {
                self.layers.hover_leave(&mut self.surface, &mut self.state);
            }
        }

        Ok(fitted)
    }

    fn set_status(&mut self, status: Status, meta: String) {
        self.state.status = status;
        self.surface.set_status(status.label(), &meta);
        self.meta = meta;
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn handle(&mut self, command: UiCommand) -> Control {
        debug!("[Tracker] {:?}", command);
        match command {
            UiCommand::PointerMove(at) => {
                if !self.state.layers_ready {
                    return Control::Continue;
                }
                match self.index.pick(&at, self.config.hover_tolerance_m) {
                    Some(id) => self.layers.hover_enter(&mut self.surface, &mut self.state, id),
                    None => self.layers.hover_leave(&mut self.surface, &mut self.state),
                }
            }
            UiCommand::PointerLeave => self.layers.hover_leave(&mut self.surface, &mut self.state),
            UiCommand::Click(at) => self.show_popup(at),
            UiCommand::SetBasemap(index) => {
                if let Err(e) = self.set_basemap(index) {
                    warn!("[Tracker] Basemap switch failed: {}", e);
                }
            }
            UiCommand::ToggleTerrain => {
                self.state.terrain = !self.state.terrain;
                if let Err(e) = self.layers.sync_terrain(&mut self.surface, &self.state) {
                    warn!("[Tracker] Terrain toggle failed: {}", e);
                }
            }
            UiCommand::ToggleLive => self.set_live(!self.state.live),
            UiCommand::ToggleBlink => {
                self.state.blinking = !self.state.blinking;
                if self.state.blinking {
                    if self.state.marker_placed {
                        self.marker.start_blinking();
                    }
                } else {
                    self.marker.stop_blinking(&mut self.surface);
                }
            }
            UiCommand::RefreshNow => return Control::Refresh,
            UiCommand::Shutdown => return Control::Stop,
        }
        Control::Continue
    }

    fn show_popup(&mut self, at: GpsPoint) {
        let feature = self
            .index
            .pick(&at, self.config.hover_tolerance_m)
            .and_then(|id| self.last.as_ref()?.track.get(id));

        match feature {
            Some(feature) => {
                let html = render_popup(&ActivitySummary::from_feature(feature));
                self.surface.show_popup(at, &html);
            }
            None => self.surface.close_popup(),
        }
    }

    /// Switch basemap and rebuild everything the new style dropped.
    fn set_basemap(&mut self, index: usize) -> Result<()> {
        let basemap = BASEMAPS
            .get(index)
            .ok_or_else(|| TrackerError::Config(format!("unknown basemap {}", index)))?;
        if index == self.state.basemap {
            return Ok(());
        }

        info!("[Tracker] Basemap -> {}", basemap.name);
        self.surface.set_style(basemap);
        self.state.basemap = index;
        self.state.style_changed();

        if let Some(snapshot) = &self.last {
            self.layers
                .ensure(&mut self.surface, &mut self.state, snapshot.track.to_geojson())?;
        }
        self.layers.sync_terrain(&mut self.surface, &self.state)
    }

    fn set_live(&mut self, on: bool) {
        if !self.config.live_overlay {
            debug!("[Tracker] Live overlay disabled in config");
            return;
        }
        self.state.live = on;
        if on {
            self.live.start();
        } else {
            self.live.stop();
            if let Err(e) = self.layers.set_live_data(&mut self.surface, empty_collection()) {
                debug!("[Tracker] Could not clear live overlay: {}", e);
            }
        }
    }

    /// Draw the live overlay up to `fraction` of the most recent activity.
    pub fn apply_live_frame(&mut self, fraction: f64) {
        if !self.state.live || self.live_line.len() < 2 {
            return;
        }
        let coordinates: Vec<[f64; 2]> = line_prefix(&self.live_line, fraction)
            .iter()
            .map(GpsPoint::to_lng_lat)
            .collect();
        let data: Value = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "LineString", "coordinates": coordinates }
            }]
        });
        if let Err(e) = self.layers.set_live_data(&mut self.surface, data) {
            debug!("[Tracker] Live frame dropped: {}", e);
        }
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Run until [`UiCommand::Shutdown`] or until the command channel closes.
    ///
    /// Refreshes immediately, then on every interval tick. A tick or
    /// [`UiCommand::RefreshNow`] that arrives while a refresh is in flight is
    /// skipped. Blink phases and live frames are applied as they arrive.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<UiCommand>) {
        if self.state.live && self.config.live_overlay {
            self.live.start();
        }

        let mut ticker = tokio::time::interval(self.config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: InFlight = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.start_refresh(&mut in_flight),
                result = poll_in_flight(&mut in_flight) => {
                    in_flight = None;
                    self.apply(result);
                }
                phase = self.marker.next_phase() => self.marker.apply_phase(&mut self.surface, phase),
                fraction = self.live.next_frame() => self.apply_live_frame(fraction),
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match self.handle(command) {
                        Control::Continue => {}
                        Control::Refresh => self.start_refresh(&mut in_flight),
                        Control::Stop => break,
                    }
                }
            }
        }

        self.shutdown();
    }

    fn start_refresh(&mut self, in_flight: &mut InFlight) {
        if in_flight.is_some() {
            debug!("[Refresh] Previous refresh still running, skipping");
            return;
        }
        self.begin_refresh();
        let source = Arc::clone(&self.source);
        *in_flight = Some(Box::pin(async move { fetch_snapshot(source.as_ref()).await }));
    }

    /// Stop every timer. The map keeps its last state.
    pub fn shutdown(&mut self) {
        self.marker.stop_blinking(&mut self.surface);
        self.live.stop();
        info!("[Tracker] Stopped");
    }
}

async fn poll_in_flight(in_flight: &mut InFlight) -> Result<Snapshot> {
    match in_flight {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Document;
    use crate::{MemorySource, RecordingSurface};

    fn line(coords: Value, start_date: &str) -> Value {
        json!({
            "type": "Feature",
            "properties": { "start_date": start_date },
            "geometry": { "type": "LineString", "coordinates": coords }
        })
    }

    fn source() -> MemorySource {
        MemorySource::new(
            json!({
                "type": "FeatureCollection",
                "features": [
                    line(json!([[9.10, 48.70], [9.20, 48.75]]), "2024-01-01"),
                    line(json!([[9.15, 48.72], [9.30, 48.81]]), "2024-02-01"),
                ]
            }),
            json!({ "lat": 48.78, "lon": 9.17, "ts": "2024-01-01T00:00:00Z" }),
        )
    }

    fn tracker() -> Tracker<RecordingSurface, MemorySource> {
        Tracker::new(TrackerConfig::default(), RecordingSurface::new(), source()).unwrap()
    }

    #[tokio::test]
    async fn test_new_sets_initial_view() {
        let t = tracker();
        assert_eq!(t.surface().basemap, Some(BASEMAPS[0].name));
        assert_eq!(t.surface().camera.len(), 1);
        assert_eq!(t.surface().status, Status::Idle.label());
        assert_eq!(t.state().status, Status::Idle);
        assert_eq!(t.surface().stylesheets, vec![MARKER_CSS.to_string()]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig { basemap: 99, ..TrackerConfig::default() };
        assert!(Tracker::new(config, RecordingSurface::new(), source()).is_err());
    }

    #[tokio::test]
    async fn test_live_line_is_most_recent() {
        let mut t = tracker();
        assert!(t.refresh().await.is_applied());
        assert_eq!(t.live_line.first(), Some(&GpsPoint::new(48.72, 9.15)));

        t.apply_live_frame(1.0);
        let live = t.surface().source_data(crate::style::LIVE_SOURCE).unwrap();
        assert_eq!(live["features"][0]["geometry"]["coordinates"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_live_line_is_longest_member() {
        let mut t = tracker();
        // Many short steps versus one long segment
        t.source().set(
            Document::Track,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "start_date": "2024-03-01" },
                    "geometry": {
                        "type": "MultiLineString",
                        "coordinates": [
                            [[9.000, 48.0], [9.001, 48.0], [9.002, 48.0], [9.003, 48.0], [9.004, 48.0]],
                            [[9.10, 48.0], [9.50, 48.0]]
                        ]
                    }
                }]
            }),
        );
        assert!(t.refresh().await.is_applied());
        assert_eq!(t.live_line, vec![GpsPoint::new(48.0, 9.10), GpsPoint::new(48.0, 9.50)]);
    }

    #[tokio::test]
    async fn test_live_toggle_clears_overlay() {
        let mut t = tracker();
        t.refresh().await;
        t.apply_live_frame(0.5);
        t.handle(UiCommand::ToggleLive);
        assert!(!t.state().live);
        let live = t.surface().source_data(crate::style::LIVE_SOURCE).unwrap();
        assert_eq!(live, &empty_collection());

        // Frames are ignored while off
        t.apply_live_frame(0.5);
        assert_eq!(t.surface().source_data(crate::style::LIVE_SOURCE).unwrap(), &empty_collection());
    }

    #[tokio::test]
    async fn test_click_popup() {
        let mut t = tracker();
        t.refresh().await;

        t.handle(UiCommand::Click(GpsPoint::new(48.70, 9.10)));
        let (_, html) = t.surface().popup.clone().unwrap();
        assert!(html.contains("tracker-popup"));

        t.handle(UiCommand::Click(GpsPoint::new(10.0, 10.0)));
        assert!(t.surface().popup.is_none());
    }

    #[tokio::test]
    async fn test_invalid_basemap_ignored() {
        let mut t = tracker();
        assert_eq!(t.handle(UiCommand::SetBasemap(42)), Control::Continue);
        assert_eq!(t.state().basemap, 0);
        assert_eq!(t.surface().style_changes, 1);
    }

    #[tokio::test]
    async fn test_refresh_now_and_shutdown_controls() {
        let mut t = tracker();
        assert_eq!(t.handle(UiCommand::RefreshNow), Control::Refresh);
        assert_eq!(t.handle(UiCommand::Shutdown), Control::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ticks_skipped() {
        let config = TrackerConfig { live_overlay: false, ..TrackerConfig::default() };
        let slow = source().with_delay(Duration::from_secs(90));
        let mut t = Tracker::new(config, RecordingSurface::new(), slow).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            tx.send(UiCommand::RefreshNow).await.unwrap();
            tokio::time::sleep(Duration::from_secs(120)).await;
            tx.send(UiCommand::Shutdown).await.unwrap();
        };
        tokio::join!(t.run(rx), driver);

        // t=0 starts a refresh that lasts until t=90; RefreshNow at 10 and the
        // tick at 60 are skipped; the tick at 120 starts the second one.
        assert_eq!(t.source().fetch_count(), 4);
        assert_eq!(t.state().status, Status::Updating);
        assert_eq!(t.surface().status, "updating…");
        assert!(t.snapshot().is_some());
        assert!(!t.marker.is_blinking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_recovers_after_failure() {
        let config = TrackerConfig { live_overlay: false, ..TrackerConfig::default() };
        let src = source();
        src.fail_with_status(Document::Track, 404);
        let mut t = Tracker::new(config, RecordingSurface::new(), src).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let driver = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            tx.send(UiCommand::Shutdown).await.unwrap();
        };
        tokio::join!(t.run(rx), driver);

        assert_eq!(t.state().status, Status::Error);
        assert!(t.surface().meta.starts_with("Provide memory:track"));
        assert!(t.surface().layers.is_empty());

        t.source().recover(Document::Track);
        assert!(t.refresh().await.is_applied());
        assert_eq!(t.state().status, Status::Online);
    }
}
