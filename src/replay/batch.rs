//! Single vs. multi-snapshot emission policy

use crate::record::{Message, Snapshot};

/// Accumulates closed snapshots and decides when a message is due.
///
/// With `batch_size == 1` every non-empty snapshot is emitted on its own.
/// Otherwise snapshots are buffered and flushed once the buffered count
/// exceeds `batch_size`, so a full batch carries `batch_size + 1` snapshots.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    buffer: Vec<Snapshot>,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            buffer: Vec::with_capacity(if batch_size > 1 { batch_size + 1 } else { 0 }),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Offer one closed snapshot. Snapshots without events are ignored.
    pub fn accumulate(&mut self, snapshot: Snapshot) -> Option<Message> {
        if snapshot.data.is_empty() {
            return None;
        }
        if self.batch_size == 1 {
            return Some(Message::Single(snapshot));
        }

        self.buffer.push(snapshot);
        if self.buffer.len() > self.batch_size {
            return Some(Message::Batch(std::mem::take(&mut self.buffer)));
        }
        None
    }

    /// Drain whatever is buffered at end of stream, regardless of threshold.
    pub fn finish(&mut self) -> Option<Message> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(Message::Batch(std::mem::take(&mut self.buffer)))
    }
}
