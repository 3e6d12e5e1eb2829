//! Record and snapshot types shared by the replay engine, emitters and the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminator of a parsed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Alive,
    StatusList,
    Counter,
    FillLevel,
    DwellTime,
    FrameHeader,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Alive => "alive",
            RecordKind::StatusList => "statusList",
            RecordKind::Counter => "counter",
            RecordKind::FillLevel => "fillLevel",
            RecordKind::DwellTime => "dwellTime",
            RecordKind::FrameHeader => "frameHeader",
        }
    }
}

/// Device identity carried by a frame-header line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub hostname: String,
    pub device_id: String,
    pub mac: String,
    pub ip: String,
    pub ip_vpn: String,
}

/// Kind-specific fields of a sensor event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "camelCase")]
pub enum EventPayload {
    Counter {
        dir: String,
        height: u32,
    },
    FillLevel {
        #[serde(rename = "fillLevel")]
        level: u32,
    },
    #[serde(rename_all = "camelCase")]
    DwellTime {
        dwell_time: f64,
        exp_dwell_time: f64,
        ts_exit: DateTime<Utc>,
        object_id: u32,
        height: u32,
    },
}

impl EventPayload {
    pub fn kind(&self) -> RecordKind {
        match self {
            EventPayload::Counter { .. } => RecordKind::Counter,
            EventPayload::FillLevel { .. } => RecordKind::FillLevel,
            EventPayload::DwellTime { .. } => RecordKind::DwellTime,
        }
    }
}

/// One sensor event, owned by its frame until the frame is flushed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    pub seq: u32,
    pub id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Typed body of a parsed line; the discriminator is resolved at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Alive,
    StatusList,
    Event(Event),
    FrameHeader(FrameHeader),
}

/// One decoded input line
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    /// Field 1: hostname on source logs, device id on stored logs
    pub source: String,
    pub body: RecordBody,
}

impl RawRecord {
    pub fn kind(&self) -> RecordKind {
        match &self.body {
            RecordBody::Alive => RecordKind::Alive,
            RecordBody::StatusList => RecordKind::StatusList,
            RecordBody::Event(event) => event.payload.kind(),
            RecordBody::FrameHeader(_) => RecordKind::FrameHeader,
        }
    }
}

/// Immutable materialization of a closed device frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub ts: DateTime<Utc>,
    pub hostname: String,
    pub device_id: String,
    pub mac: String,
    pub ip: String,
    pub ip_vpn: String,
    pub data: Vec<Event>,
}

impl Snapshot {
    pub fn event_count(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Single,
    Batch,
}

impl MessageKind {
    /// Supply name used on the wire
    pub fn supply_name(&self) -> &'static str {
        match self {
            MessageKind::Single => "PCounter",
            MessageKind::Batch => "PCounterMulti",
        }
    }
}

/// A unit of publication: one snapshot, or an ordered bundle of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Message {
    #[serde(rename = "PCounter")]
    Single(Snapshot),
    #[serde(rename = "PCounterMulti")]
    Batch(Vec<Snapshot>),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Single(_) => MessageKind::Single,
            Message::Batch(_) => MessageKind::Batch,
        }
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        match self {
            Message::Single(snapshot) => std::slice::from_ref(snapshot),
            Message::Batch(snapshots) => snapshots,
        }
    }

    /// Timestamp of the most recent snapshot, used in send logs
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.snapshots().last().map(|s| s.ts)
    }
}
