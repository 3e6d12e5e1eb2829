//! Shared test emitters

#![allow(dead_code)]

use async_trait::async_trait;
use pcount_replay::emitter::{encode, Emitter, PublishError};
use pcount_replay::record::{Message, MessageKind};
use std::sync::Mutex;
use tokio::time::Instant;

/// Captures every publication together with the (virtual) time it happened
#[derive(Default)]
pub struct RecordingEmitter {
    sent: Mutex<Vec<(Instant, Message)>>,
    fail: bool,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An emitter whose every publish fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn count(&self, kind: MessageKind) -> usize {
        self.messages().iter().filter(|m| m.kind() == kind).count()
    }
}

#[async_trait]
impl Emitter for RecordingEmitter {
    async fn publish(&self, message: &Message) -> Result<usize, PublishError> {
        if self.fail {
            return Err(PublishError::Disconnected);
        }
        let size = encode(message)?.len();
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), message.clone()));
        Ok(size)
    }

    fn backend_type(&self) -> &'static str {
        "recording"
    }
}

/// Frame-header line at `secs` seconds past 2021-01-01T09:00:00Z
pub fn header(secs: u32, host: &str) -> String {
    format!(
        "{},{},dev-{},1.2.3.4,10.0.0.1",
        ts(secs),
        host,
        host
    )
}

/// Counter line at `secs` seconds past 2021-01-01T09:00:00Z
pub fn counter(secs: u32, seq: u32) -> String {
    format!("{},host,{},counter,zoneA,IN,170", ts(secs), seq)
}

pub fn ts(secs: u32) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        .and_utc();
    (base + chrono::Duration::seconds(secs as i64))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

pub fn lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
