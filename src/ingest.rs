//! Ingestion of published snapshots into the rotating day log
//!
//! Two delivery paths feed the same store:
//! - an in-process channel (loopback next to a replay)
//! - a JSONL stream of encoded messages (one per line)

use crate::emitter::decode;
use crate::record::Message;
use crate::store::RotatingLogStore;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub messages: u64,
    pub snapshots: u64,
    pub events: u64,
    pub decode_failures: u64,
}

impl IngestSummary {
    fn record(&mut self, message: &Message) {
        self.messages += 1;
        self.snapshots += message.snapshots().len() as u64;
        self.events += message
            .snapshots()
            .iter()
            .map(|s| s.data.len() as u64)
            .sum::<u64>();
    }
}

fn store_message(store: &Arc<RotatingLogStore>, message: &Message) {
    log::debug!(
        "📥 {} with {} snapshots",
        message.kind().supply_name(),
        message.snapshots().len()
    );
    store.store_message(message);
}

/// Store every message received until all senders are dropped.
pub async fn ingest_channel(
    mut rx: mpsc::Receiver<Message>,
    store: Arc<RotatingLogStore>,
) -> IngestSummary {
    log::info!("🚀 Starting ingestion into {}", store.dir().display());
    let mut summary = IngestSummary::default();

    while let Some(message) = rx.recv().await {
        store_message(&store, &message);
        summary.record(&message);
    }

    log::info!(
        "✅ Ingestion finished: {} messages, {} events",
        summary.messages,
        summary.events
    );
    summary
}

/// Decode and store one message per line; undecodable lines are skipped.
pub async fn ingest_jsonl<R>(
    mut reader: R,
    store: Arc<RotatingLogStore>,
) -> std::io::Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match decode(trimmed.as_bytes()) {
            Ok(message) => {
                store_message(&store, &message);
                summary.record(&message);
            }
            Err(e) => {
                summary.decode_failures += 1;
                log::warn!("⚠️  Dropping undecodable message: {}", e);
            }
        }
    }

    Ok(summary)
}
