//! Expansion of snapshots into stored CSV lines
//!
//! ```text
//! header : ts, hostname, mac, ip, vpn-ip
//! event  : ts, device-id, seq, typ, id, <kind fields>
//! ```
//!
//! Event lines keep the discriminator in field 3, so a stored day file can
//! be fed back into a replay.

use crate::record::{Event, EventPayload, Message, Snapshot};
use chrono::{DateTime, SecondsFormat, Utc};

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn header_line(snapshot: &Snapshot) -> String {
    format!(
        "{},{},{},{},{}",
        timestamp(&snapshot.ts),
        snapshot.hostname,
        snapshot.mac,
        snapshot.ip,
        snapshot.ip_vpn
    )
}

pub fn event_line(device_id: &str, event: &Event) -> String {
    let fields = match &event.payload {
        EventPayload::Counter { dir, height } => format!("{},{}", dir, height),
        EventPayload::FillLevel { level } => level.to_string(),
        EventPayload::DwellTime {
            dwell_time,
            exp_dwell_time,
            ts_exit,
            object_id,
            height,
        } => format!(
            "{:.6},{:.6},{},{},{}",
            dwell_time,
            exp_dwell_time,
            timestamp(ts_exit),
            object_id,
            height
        ),
    };
    format!(
        "{},{},{},{},{},{}",
        timestamp(&event.ts),
        device_id,
        event.seq,
        event.payload.kind().as_str(),
        event.id,
        fields
    )
}

/// Header line followed by one line per event, in event order
pub fn expand_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.data.len() + 1);
    lines.push(header_line(snapshot));
    lines.extend(
        snapshot
            .data
            .iter()
            .map(|event| event_line(&snapshot.device_id, event)),
    );
    lines
}

pub fn expand_message(message: &Message) -> Vec<String> {
    message.snapshots().iter().flat_map(expand_snapshot).collect()
}
