//! Cancellable periodic tasks.
//!
//! Both self-driving animations (marker blink, live progress sweep) run as a
//! spawned tokio interval task owned by exactly one [`PeriodicTask`]. Starting
//! a task aborts the previous one first, so toggling can never leave two
//! timers running. The tasks do not touch the map: they publish into a watch
//! channel and the controller applies the latest value on its own loop.
//!
//! Starting a task needs a running tokio runtime.

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// ============================================================================
// PeriodicTask
// ============================================================================

#[derive(Debug, Default)]
pub struct PeriodicTask {
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `on_tick(n)` every `period`, with `n` counting from 1. The first
    /// call happens one period after start.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.stop();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;
            let mut n = 0u64;
            loop {
                interval.tick().await;
                n += 1;
                on_tick(n);
            }
        }));
    }

    /// Abort the running task. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// LiveProgress
// ============================================================================

/// Position of the live sweep after `tick` frames, in `[0, 1)`.
pub fn sweep_fraction(tick: u64, frame: Duration, sweep: Duration) -> f64 {
    let sweep_ms = sweep.as_millis().max(1);
    let elapsed = u128::from(tick) * frame.as_millis();
    (elapsed % sweep_ms) as f64 / sweep_ms as f64
}

/// Frame source for the live progress overlay.
///
/// Emits the sweep fraction every frame; the fraction wraps back to 0 after
/// each full sweep.
#[derive(Debug)]
pub struct LiveProgress {
    task: PeriodicTask,
    tx: Arc<watch::Sender<f64>>,
    rx: watch::Receiver<f64>,
    sweep: Duration,
    frame: Duration,
}

impl LiveProgress {
    pub fn new(sweep: Duration, frame: Duration) -> Self {
        let (tx, rx) = watch::channel(0.0);
        Self {
            task: PeriodicTask::new(),
            tx: Arc::new(tx),
            rx,
            sweep,
            frame,
        }
    }

    pub fn start(&mut self) {
        debug!("[LiveProgress] Start (sweep {:?}, frame {:?})", self.sweep, self.frame);
        let tx = Arc::clone(&self.tx);
        let (sweep, frame) = (self.sweep, self.frame);
        self.task.start(frame, move |n| {
            tx.send_replace(sweep_fraction(n, frame, sweep));
        });
    }

    pub fn stop(&mut self) {
        if self.task.stop() {
            debug!("[LiveProgress] Stop");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// Wait for the next frame. Pending while stopped.
    pub async fn next_frame(&mut self) -> f64 {
        if self.rx.changed().await.is_err() {
            // Unreachable while `self.tx` is alive
            std::future::pending::<()>().await;
        }
        *self.rx.borrow_and_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counter() -> (Arc<AtomicU64>, impl FnMut(u64) + Send + 'static) {
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        (count, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_task_ticks_and_stops() {
        let (count, tick) = counter();
        let mut task = PeriodicTask::new();
        task.start(Duration::from_millis(100), tick);
        assert!(task.is_running());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert!(task.stop());
        assert!(!task.is_running());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!task.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_duplicates() {
        let (count, tick) = counter();
        let (other, other_tick) = counter();
        let mut task = PeriodicTask::new();
        task.start(Duration::from_millis(100), other_tick);
        task.start(Duration::from_millis(100), tick);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let (count, tick) = counter();
        {
            let mut task = PeriodicTask::new();
            task.start(Duration::from_millis(100), tick);
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sweep_fraction_wraps() {
        let frame = Duration::from_millis(50);
        let sweep = Duration::from_millis(8000);
        assert_eq!(sweep_fraction(0, frame, sweep), 0.0);
        assert_eq!(sweep_fraction(80, frame, sweep), 0.5);
        assert_eq!(sweep_fraction(160, frame, sweep), 0.0);
        assert_eq!(sweep_fraction(161, frame, sweep), 50.0 / 8000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_progress_frames() {
        let mut live = LiveProgress::new(Duration::from_millis(400), Duration::from_millis(100));
        live.start();
        assert_eq!(live.next_frame().await, 0.25);
        assert_eq!(live.next_frame().await, 0.5);
        live.stop();
        assert!(!live.is_running());

        let waited = tokio::time::timeout(Duration::from_secs(5), live.next_frame()).await;
        assert!(waited.is_err());
    }
}
