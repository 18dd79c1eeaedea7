//! Drive the tracker headless against local documents.
//!
//! Run with: cargo run --example offline_map [-- <dir with track.geojson and latest.json>]
//!
//! Without a directory the demo serves a generated track from memory.

use live_tracker::{
    Document, DocumentSource, FileSource, GpsPoint, MemorySource, RecordingSurface, Tracker, TrackerConfig, UiCommand,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Three short loops around Stuttgart, one per day.
fn generated_track() -> Value {
    let features: Vec<Value> = (0..3)
        .map(|day| {
            let offset = day as f64 * 0.02;
            let coords: Vec<[f64; 2]> = (0..=20)
                .map(|step| {
                    let angle = step as f64 / 20.0 * std::f64::consts::TAU;
                    [9.17 + offset + 0.01 * angle.cos(), 48.78 + 0.01 * angle.sin()]
                })
                .collect();
            json!({
                "type": "Feature",
                "properties": {
                    "name": format!("Loop {}", day + 1),
                    "type": "Ride",
                    "start_date": format!("2024-06-0{}T07:30:00Z", day + 1),
                    "distance_m": 4200.0 + 300.0 * day as f64,
                    "moving_time_s": 900 + 60 * day,
                    "elev_gain_m": 35 + 5 * day,
                },
                "geometry": { "type": "LineString", "coordinates": coords }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

async fn run<D: DocumentSource + 'static>(source: D) -> live_tracker::Result<()> {
    let config = TrackerConfig {
        refresh_interval_ms: 2_000,
        ..TrackerConfig::default()
    };
    let mut tracker = Tracker::new(config, RecordingSurface::new(), source)?;
    let (tx, rx) = tokio::sync::mpsc::channel(16);

    let script = async move {
        let steps = [
            (2_500, UiCommand::PointerMove(GpsPoint::new(48.78, 9.18))),
            (200, UiCommand::Click(GpsPoint::new(48.78, 9.18))),
            (500, UiCommand::SetBasemap(1)),
            (500, UiCommand::ToggleTerrain),
            (1_500, UiCommand::ToggleBlink),
            (500, UiCommand::Shutdown),
        ];
        for (delay_ms, command) in steps {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            println!("-> {:?}", command);
            if tx.send(command).await.is_err() {
                break;
            }
        }
    };
    tokio::join!(tracker.run(rx), script);

    let surface = tracker.surface();
    println!("\nbasemap:  {:?}", surface.basemap);
    println!("layers:   {:?}", surface.layer_ids());
    println!("terrain:  {:?}", surface.terrain);
    println!("marker:   {:?}", surface.marker);
    println!("status:   {} | {}", surface.status, surface.meta);
    println!("hovered:  {:?}", surface.hovered());
    println!("camera:   {} move(s)", surface.camera.len());
    println!("panel:    {}", surface.panel);
    if let Some((_, html)) = &surface.popup {
        println!("popup:    {}", html);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match std::env::args().nth(1) {
        Some(dir) => run(FileSource::in_dir(dir)).await,
        None => {
            let source = MemorySource::new(
                generated_track(),
                json!({ "lat": 48.785, "lon": 9.21, "ts": "2024-06-03T08:15:00Z" }),
            );
            // Missing until the spawned task below provides it: shows the error path first
            source.fail_with_status(Document::Latest, 404);
            let source = Arc::new(source);
            let handle = Arc::clone(&source);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1_000)).await;
                handle.recover(Document::Latest);
            });
            run(source).await
        }
    };

    if let Err(e) = result {
        eprintln!("offline_map: {}", e);
        std::process::exit(1);
    }
}

