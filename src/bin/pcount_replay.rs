//! Replay Runtime - paces a people-counter log out as snapshot publications
//!
//! Usage:
//!   cargo run --release --bin pcount_replay
//!
//! Environment variables:
//!   REPLAY_SOURCE - log file, or directory with REPLAY_ALL_FILES=true
//!   REPLAY_SPEED - >0 speed-up factor, <0 flat ms pause per send, 0 no pacing
//!   REPLAY_BATCH_SIZE - snapshots per multi message (default: 1)
//!   REPLAY_OUTPUT - JSONL publish target (default: streams/pcounter.jsonl)
//!   REPLAY_INGEST - store published snapshots into STORE_DIR instead

use dotenv::dotenv;
use log::{error, info};
use pcount_replay::{
    emitter::{ChannelEmitter, Emitter, JsonlEmitter},
    ingest::ingest_channel,
    replay::{DirectoryReplayDriver, PacingEngine},
    store::RotatingLogStore,
    ReplayConfig,
};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = ReplayConfig::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    let source = config.require_source()?.clone();

    info!("🚀 Starting people-counter replay");
    info!("   ├─ Source: {}", source.display());
    info!("   ├─ Directory mode: {}", config.replay_all_files);
    info!("   ├─ Speed: {}", config.speed);
    info!("   ├─ Batch size: {}", config.batch_size);
    match &config.time_window {
        Some(w) => info!("   ├─ Time window: {} - {}", w.start, w.end),
        None => info!("   ├─ Time window: none"),
    }
    match &config.date_window {
        Some(w) => info!("   └─ Date window: {} .. {}", w.start, w.end),
        None => info!("   └─ Date window: none"),
    }

    // Loopback ingestion replaces the JSONL target
    let mut ingest_handle = None;
    let emitter: Arc<dyn Emitter> = if config.ingest {
        let (emitter, rx) = ChannelEmitter::channel(1_000);
        let store = Arc::new(RotatingLogStore::new(&config.storage_dir));
        ingest_handle = Some(tokio::spawn(ingest_channel(rx, store)));
        Arc::new(emitter)
    } else {
        Arc::new(JsonlEmitter::open(&config.output_path)?)
    };
    info!("📊 Backend: {}", emitter.backend_type());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️  Received CTRL+C, stopping replay...");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
        }
    });

    let summary = if config.replay_all_files {
        DirectoryReplayDriver::new(&source, config.date_window, config.pacing(), emitter.clone())
            .with_shutdown(shutdown_rx)
            .run()
            .await?
    } else {
        PacingEngine::new(emitter.clone(), &config.pacing())
            .with_shutdown(shutdown_rx)
            .run_file(&source)
            .await?
    };

    // Closing the last emitter handle ends loopback ingestion
    drop(emitter);
    if let Some(handle) = ingest_handle {
        match handle.await {
            Ok(ingested) => info!("📥 Stored {} snapshots", ingested.snapshots),
            Err(e) => error!("❌ Ingestion task failed: {}", e),
        }
    }

    info!("✅ Replay finished");
    info!("   ├─ Lines: {} ({} skipped, {} defaulted fields)", summary.lines, summary.skipped_lines, summary.parse_issues);
    info!("   ├─ Frames: {} opened, {} flushed", summary.frames_opened, summary.snapshots_closed);
    info!("   ├─ Events: {} kept, {} discarded", summary.events_admitted, summary.events_discarded);
    info!("   └─ Messages: {} sent ({} bytes), {} failed", summary.messages_published, summary.bytes_sent, summary.publish_failures);
    if summary.cancelled {
        info!("🛑 Replay was cancelled before the end of input");
    }

    Ok(())
}
