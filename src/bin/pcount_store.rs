//! Store Runtime - writes published snapshots into day-rotated CSV files
//!
//! Reads one encoded message per line (the `pcount_replay` JSONL output)
//! from STORE_INPUT, or stdin when unset, and appends the expanded lines
//! to STORE_DIR/YYYY-MM-DD.csv keyed by today's date.
//!
//! Usage:
//!   tail -f streams/pcounter.jsonl | cargo run --release --bin pcount_store

use dotenv::dotenv;
use log::info;
use pcount_replay::{ingest::ingest_jsonl, store::RotatingLogStore, ReplayConfig};
use std::sync::Arc;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = ReplayConfig::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Starting people-counter store");
    info!("   └─ Directory: {}", config.storage_dir.display());

    let store = Arc::new(RotatingLogStore::new(&config.storage_dir));

    let summary = match &config.store_input {
        Some(path) => {
            info!("📂 Reading messages from {}", path.display());
            let file = tokio::fs::File::open(path).await?;
            ingest_jsonl(BufReader::new(file), store).await?
        }
        None => {
            info!("📂 Reading messages from stdin");
            ingest_jsonl(BufReader::new(tokio::io::stdin()), store).await?
        }
    };

    info!(
        "✅ Stored {} messages ({} snapshots, {} events), {} undecodable",
        summary.messages, summary.snapshots, summary.events, summary.decode_failures
    );
    Ok(())
}
