//! Poll a live tracker over HTTP until Ctrl-C, then print the final map state.
//! Each refresh result is logged as it happens.
//!
//! Run with: cargo run --example live_map -- <track url> <latest url> [config.json]
//!
//! The optional config file uses the `TrackerConfig` field names; URLs on the
//! command line take precedence.

use live_tracker::{HttpSource, RecordingSurface, Tracker, TrackerConfig, UiCommand};
use log::info;

fn load_config() -> live_tracker::Result<TrackerConfig> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = match args.get(2) {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| live_tracker::TrackerError::Io {
                path: path.clone(),
                source,
            })?;
            TrackerConfig::from_json_str(&text)?
        }
        None => TrackerConfig::default(),
    };

    if let Some(track) = args.first() {
        config.track_url = track.clone();
    }
    if let Some(latest) = args.get(1) {
        config.latest_url = latest.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let source = HttpSource::from_config(&config)?;
    let mut tracker = Tracker::new(config, RecordingSurface::new(), source)?;

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("[live_map] Ctrl-C, shutting down");
            let _ = tx.send(UiCommand::Shutdown).await;
        }
    });

    tracker.run(rx).await;

    let surface = tracker.surface();
    println!("status: {} | {}", surface.status, surface.meta);
    println!("marker: {:?}", surface.marker);
    println!("panel:  {}", surface.panel);
    Ok(())
}
