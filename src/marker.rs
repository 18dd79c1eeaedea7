//! Pulsing position marker.
//!
//! Exactly one marker exists once a valid position has been seen. Its colour
//! alternates on a fixed timer that knows nothing about refreshes.

use crate::animation::PeriodicTask;
use crate::style::{MarkerColors, MARKER_GREEN, MARKER_ORANGE};
use crate::{DisplayState, GpsPoint, MapSurface, Result};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Primary,
    Alternate,
}

impl BlinkPhase {
    /// Phase after `tick` timer ticks: odd ticks show the alternate colour.
    pub fn from_tick(tick: u64) -> Self {
        if tick % 2 == 1 {
            BlinkPhase::Alternate
        } else {
            BlinkPhase::Primary
        }
    }

    pub fn colors(self) -> &'static MarkerColors {
        match self {
            BlinkPhase::Primary => &MARKER_GREEN,
            BlinkPhase::Alternate => &MARKER_ORANGE,
        }
    }
}

#[derive(Debug)]
pub struct MarkerPresenter {
    blink: PeriodicTask,
    phase_tx: Arc<watch::Sender<BlinkPhase>>,
    phase_rx: watch::Receiver<BlinkPhase>,
    position: Option<GpsPoint>,
    interval: Duration,
}

impl MarkerPresenter {
    pub fn new(interval: Duration) -> Self {
        let (tx, rx) = watch::channel(BlinkPhase::Primary);
        Self {
            blink: PeriodicTask::new(),
            phase_tx: Arc::new(tx),
            phase_rx: rx,
            position: None,
            interval,
        }
    }

    pub fn position(&self) -> Option<GpsPoint> {
        self.position
    }

    /// Show the marker at `position`.
    ///
    /// Creates it on the first valid position (and starts blinking if
    /// enabled), moves it when the position changed, and does nothing
    /// otherwise. Returns whether the surface was touched.
    pub fn place<S: MapSurface>(&mut self, surface: &mut S, state: &mut DisplayState, position: GpsPoint) -> Result<bool> {
        if !position.is_valid() {
            debug!("[Marker] Ignoring invalid position {:?}", position);
            return Ok(false);
        }

        match self.position {
            None => {
                surface.add_marker(position, BlinkPhase::Primary.colors())?;
                self.position = Some(position);
                state.marker_placed = true;
                info!("[Marker] Placed at {:.5}, {:.5}", position.latitude, position.longitude);
                if state.blinking {
                    self.start_blinking();
                }
                Ok(true)
            }
            Some(current) if current == position => Ok(false),
            Some(_) => {
                surface.move_marker(position);
                self.position = Some(position);
                Ok(true)
            }
        }
    }

    pub fn start_blinking(&mut self) {
        let tx = Arc::clone(&self.phase_tx);
        self.blink.start(self.interval, move |n| {
            tx.send_replace(BlinkPhase::from_tick(n));
        });
    }

    /// Stop the timer and leave the marker in its primary colour.
    pub fn stop_blinking<S: MapSurface>(&mut self, surface: &mut S) {
        self.blink.stop();
        self.phase_tx.send_replace(BlinkPhase::Primary);
        // Drop the pending change so the loop does not re-apply it
        self.phase_rx.borrow_and_update();
        self.apply_phase(surface, BlinkPhase::Primary);
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_running()
    }

    /// Wait for the next blink phase. Pending while not blinking.
    pub async fn next_phase(&mut self) -> BlinkPhase {
        if self.phase_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        *self.phase_rx.borrow_and_update()
    }

    pub fn apply_phase<S: MapSurface>(&self, surface: &mut S, phase: BlinkPhase) {
        if self.position.is_some() {
            surface.set_marker_colors(phase.colors());
        }
    }
}
