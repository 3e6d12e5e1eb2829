//! Pacing Engine - frame reconstruction, window gating and timed emission
//!
//! ## Flow
//!
//! ```text
//! text line
//!     ↓
//! parse_line() → RawRecord
//!     ↓
//! PacingEngine::handle_record()
//!     ├─ FrameHeader → close open frame → BatchAccumulator → Emitter
//!     │                pacing sleep (only suspension point) → open new frame
//!     ├─ Counter / FillLevel / DwellTime → WindowGate → append to open frame
//!     └─ Alive / StatusList → ignored
//!     ↓
//! PacingEngine::finish() → final frame + batch remainder
//! ```
//!
//! One engine instance replays one source. All accumulation state lives on
//! the instance, so independent engines can run side by side.

use super::batch::BatchAccumulator;
use super::window::{GateDecision, TimeWindow, WindowGate};
use crate::emitter::Emitter;
use crate::record::{
    parse_line, Event, FrameHeader, Message, MessageKind, RawRecord, RecordBody, RecordKind,
    Snapshot,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Debug)]
pub enum ReplayError {
    Source { path: PathBuf, source: std::io::Error },
    Directory { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::Source { path, source } => {
                write!(f, "Cannot read source '{}': {}", path.display(), source)
            }
            ReplayError::Directory { path, source } => {
                write!(f, "Cannot list directory '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Source { source, .. } | ReplayError::Directory { source, .. } => {
                Some(source)
            }
        }
    }
}

/// Knobs for one replay pass
#[derive(Debug, Clone, PartialEq)]
pub struct PacingSettings {
    /// `> 0` divides source gaps, `< 0` is a flat pause in ms after each
    /// publish, `0` disables pacing
    pub speed: f64,
    pub batch_size: usize,
    pub window: Option<TimeWindow>,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            batch_size: 1,
            window: None,
        }
    }
}

/// Counters reported after a replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: u64,
    pub skipped_lines: u64,
    pub parse_issues: u64,
    pub frames_opened: u64,
    pub snapshots_closed: u64,
    pub events_admitted: u64,
    pub events_discarded: u64,
    pub messages_published: u64,
    pub publish_failures: u64,
    pub bytes_sent: u64,
    pub cancelled: bool,
}

impl ReplaySummary {
    pub fn merge(&mut self, other: &ReplaySummary) {
        self.lines += other.lines;
        self.skipped_lines += other.skipped_lines;
        self.parse_issues += other.parse_issues;
        self.frames_opened += other.frames_opened;
        self.snapshots_closed += other.snapshots_closed;
        self.events_admitted += other.events_admitted;
        self.events_discarded += other.events_discarded;
        self.messages_published += other.messages_published;
        self.publish_failures += other.publish_failures;
        self.bytes_sent += other.bytes_sent;
        self.cancelled |= other.cancelled;
    }
}

/// The single in-progress snapshot for one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFrame {
    ts: DateTime<Utc>,
    header: FrameHeader,
    events: Vec<Event>,
}

impl DeviceFrame {
    pub fn open(ts: DateTime<Utc>, header: FrameHeader) -> Self {
        Self {
            ts,
            header,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            ts: self.ts,
            hostname: self.header.hostname,
            device_id: self.header.device_id,
            mac: self.header.mac,
            ip: self.header.ip,
            ip_vpn: self.header.ip_vpn,
            data: self.events,
        }
    }
}

#[derive(Debug)]
enum EngineState {
    Idle,
    FrameOpen(DeviceFrame),
}

/// Whether processing may continue after an await point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Cancelled,
}

pub struct PacingEngine {
    emitter: Arc<dyn Emitter>,
    speed: f64,
    gate: WindowGate,
    batch: BatchAccumulator,
    state: EngineState,
    last_ts: Option<DateTime<Utc>>,
    shutdown: watch::Receiver<bool>,
    summary: ReplaySummary,
}

impl PacingEngine {
    pub fn new(emitter: Arc<dyn Emitter>, settings: &PacingSettings) -> Self {
        // A receiver whose sender is gone never reports shutdown
        let (_tx, shutdown) = watch::channel(false);
        Self {
            emitter,
            speed: settings.speed,
            gate: WindowGate::new(settings.window),
            batch: BatchAccumulator::new(settings.batch_size),
            state: EngineState::Idle,
            last_ts: None,
            shutdown,
            summary: ReplaySummary::default(),
        }
    }

    /// Observe an external shutdown signal during pacing sleeps
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_ts
    }

    /// Replay one file from start to end.
    pub async fn run_file(&mut self, path: &Path) -> Result<ReplaySummary, ReplayError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| ReplayError::Source {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("📂 Replaying {}", path.display());
        self.run(BufReader::new(file))
            .await
            .map_err(|source| ReplayError::Source {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Replay every line from `reader`, then flush what is left.
    pub async fn run<R>(&mut self, mut reader: R) -> std::io::Result<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            if self.is_cancelled() {
                return Ok(self.cancelled());
            }

            let line = String::from_utf8_lossy(&buf);
            if line.trim().is_empty() {
                continue;
            }
            self.summary.lines += 1;

            if self.handle_line(&line).await == Flow::Cancelled {
                return Ok(self.cancelled());
            }
        }

        if self.finish().await == Flow::Cancelled {
            return Ok(self.cancelled());
        }
        Ok(self.summary.clone())
    }

    /// Parse and process one line; bad lines are logged and skipped.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match parse_line(line) {
            Ok(parsed) => {
                for issue in &parsed.issues {
                    log::warn!(
                        "⚠️  Line {} from {}: {} (defaulted)",
                        self.summary.lines,
                        parsed.record.source,
                        issue
                    );
                }
                self.summary.parse_issues += parsed.issues.len() as u64;
                self.handle_record(parsed.record).await
            }
            Err(e) => {
                log::warn!("⚠️  Skipping line {}: {}", self.summary.lines, e);
                self.summary.skipped_lines += 1;
                Flow::Continue
            }
        }
    }

    pub async fn handle_record(&mut self, record: RawRecord) -> Flow {
        match record.body {
            RecordBody::Alive | RecordBody::StatusList => Flow::Continue,
            RecordBody::FrameHeader(header) => self.on_frame_header(record.timestamp, header).await,
            RecordBody::Event(event) => {
                self.on_event(event);
                Flow::Continue
            }
        }
    }

    /// Flush the open frame and any batch remainder at end of input.
    pub async fn finish(&mut self) -> Flow {
        if self.close_frame().await == Flow::Cancelled {
            return Flow::Cancelled;
        }
        if let Some(message) = self.batch.finish() {
            return self.publish(message).await;
        }
        Flow::Continue
    }

    async fn on_frame_header(&mut self, ts: DateTime<Utc>, header: FrameHeader) -> Flow {
        if self.close_frame().await == Flow::Cancelled {
            return Flow::Cancelled;
        }

        if let Some(last) = self.last_ts {
            let delay = ts - last;
            if delay < chrono::Duration::zero() {
                log::debug!("⏪ Timestamp went backwards by {}ms, resetting reference", -delay.num_milliseconds());
            } else if self.speed > 0.0 {
                let gap = delay.to_std().unwrap_or_default();
                let pause = Duration::try_from_secs_f64(gap.as_secs_f64() / self.speed)
                    .unwrap_or(Duration::MAX);
                log::debug!("⏳ Pacing sleep {:?} (source gap {:?})", pause, gap);
                if self.pause(pause).await == Flow::Cancelled {
                    return Flow::Cancelled;
                }
            }
        }
        self.last_ts = Some(ts);

        self.state = EngineState::FrameOpen(DeviceFrame::open(ts, header));
        self.summary.frames_opened += 1;
        Flow::Continue
    }

    fn on_event(&mut self, event: Event) {
        let EngineState::FrameOpen(frame) = &mut self.state else {
            self.summary.events_discarded += 1;
            return;
        };

        let kind = event.payload.kind();
        let decision = self.gate.evaluate(&event.ts, kind == RecordKind::Counter);
        match decision {
            GateDecision::Started => log::info!("▶️  Window start at {}", event.ts),
            GateDecision::Stopped => log::info!("⏹️  Window stop at {}", event.ts),
            GateDecision::Admit | GateDecision::Discard => {}
        }

        if decision.admits() {
            frame.push(event);
            self.summary.events_admitted += 1;
        } else {
            self.summary.events_discarded += 1;
        }
    }

    /// Close the open frame; it is handed on only when the gate is open and
    /// the frame holds at least one event.
    async fn close_frame(&mut self) -> Flow {
        let EngineState::FrameOpen(frame) = std::mem::replace(&mut self.state, EngineState::Idle)
        else {
            return Flow::Continue;
        };
        if frame.is_empty() || !self.gate.is_open() {
            return Flow::Continue;
        }

        log::debug!("📦 Closing frame {} with {} events", frame.header.hostname, frame.len());
        self.summary.snapshots_closed += 1;
        match self.batch.accumulate(frame.into_snapshot()) {
            Some(message) => self.publish(message).await,
            None => Flow::Continue,
        }
    }

    async fn publish(&mut self, message: Message) -> Flow {
        let kind = message.kind();
        match self.emitter.publish(&message).await {
            Ok(bytes) => {
                self.summary.messages_published += 1;
                self.summary.bytes_sent += bytes as u64;
                let ts = message
                    .last_timestamp()
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default();
                match kind {
                    MessageKind::Single => {
                        log::debug!("✅ Sent {} ({} bytes): {}", kind.supply_name(), bytes, ts)
                    }
                    MessageKind::Batch => log::info!(
                        "✅ Sent {} x{} ({} bytes): {}",
                        kind.supply_name(),
                        message.snapshots().len(),
                        bytes,
                        ts
                    ),
                }
            }
            Err(e) => {
                self.summary.publish_failures += 1;
                log::warn!("❌ Send failed via {}: {}", self.emitter.backend_type(), e);
            }
        }

        if self.speed < 0.0 {
            let pause = Duration::try_from_secs_f64(-self.speed / 1000.0).unwrap_or(Duration::MAX);
            return self.pause(pause).await;
        }
        Flow::Continue
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn cancelled(&mut self) -> ReplaySummary {
        log::info!("🛑 Replay cancelled, abandoning buffered frames");
        self.summary.cancelled = true;
        self.summary.clone()
    }

    /// The engine's only suspension point; returns early on shutdown.
    async fn pause(&mut self, duration: Duration) -> Flow {
        if self.is_cancelled() {
            return Flow::Cancelled;
        }
        if duration.is_zero() {
            return Flow::Continue;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Flow::Continue,
            _ = wait_for_shutdown(&mut self.shutdown) => Flow::Cancelled,
        }
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
