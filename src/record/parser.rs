//! Line parser for comma-delimited people-counter logs
//!
//! Layout (0-indexed fields):
//!
//! ```text
//! frame header : ts, hostname, device-id/mac, ip, vpn-ip
//! counter      : ts, host, seq, "counter",   id, dir, height
//! fillLevel    : ts, host, seq, "fillLevel", id, level
//! dwellTime    : ts, host, seq, "dwellTime", id, dwell, expected-dwell, exit-ts, object-id, height
//! alive        : ts, host, seq, "alive", ...
//! statusList   : ts, host, seq, "statusList", ...
//! ```
//!
//! Any discriminator that is not one of the keywords is treated as the IP
//! field of a frame header. Malformed scalars never abort parsing: they fall
//! back to a zero value and are reported next to the record.

use super::types::{Event, EventPayload, FrameHeader, RawRecord, RecordBody};
use chrono::{DateTime, NaiveDateTime, Utc};

const DISCRIMINATOR: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    TooFewFields { kind: &'static str, found: usize, expected: usize },
    Timestamp { field: &'static str, value: String },
    Integer { field: &'static str, value: String },
    Float { field: &'static str, value: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::TooFewFields { kind, found, expected } => write!(
                f,
                "{} line has {} fields, expected at least {}",
                kind, found, expected
            ),
            ParseError::Timestamp { field, value } => {
                write!(f, "invalid timestamp in {}: '{}'", field, value)
            }
            ParseError::Integer { field, value } => {
                write!(f, "invalid integer in {}: '{}'", field, value)
            }
            ParseError::Float { field, value } => {
                write!(f, "invalid number in {}: '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A decoded line plus any fields that had to be defaulted
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub record: RawRecord,
    pub issues: Vec<ParseError>,
}

/// Parse a log timestamp such as `2021-01-01T09:00:00.000Z`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Collects defaulted-field issues while fields are decoded.
struct Fields<'a> {
    tokens: Vec<&'a str>,
    issues: Vec<ParseError>,
}

impl<'a> Fields<'a> {
    fn text(&self, idx: usize) -> String {
        self.tokens.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
    }

    fn timestamp(&mut self, idx: usize, field: &'static str) -> DateTime<Utc> {
        let raw = self.text(idx);
        match parse_timestamp(&raw) {
            Some(ts) => ts,
            None => {
                self.issues.push(ParseError::Timestamp { field, value: raw });
                DateTime::<Utc>::default()
            }
        }
    }

    fn uint(&mut self, idx: usize, field: &'static str) -> u32 {
        let raw = self.text(idx);
        match raw.parse::<u32>() {
            Ok(v) => v,
            Err(_) => {
                self.issues.push(ParseError::Integer { field, value: raw });
                0
            }
        }
    }

    fn float(&mut self, idx: usize, field: &'static str) -> f64 {
        let raw = self.text(idx);
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                self.issues.push(ParseError::Float { field, value: raw });
                0.0
            }
        }
    }

    fn require(&self, kind: &'static str, expected: usize) -> Result<(), ParseError> {
        if self.tokens.len() < expected {
            return Err(ParseError::TooFewFields {
                kind,
                found: self.tokens.len(),
                expected,
            });
        }
        Ok(())
    }
}

/// Decode one delimited line into a typed record.
///
/// Returns `Err` only when the line cannot be classified (too few fields);
/// the caller skips it and keeps going.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Fields {
        tokens: line.split(',').collect(),
        issues: Vec::new(),
    };
    fields.require("record", DISCRIMINATOR + 1)?;

    let timestamp = fields.timestamp(0, "timestamp");
    let source = fields.text(1);
    let discriminator = fields.text(DISCRIMINATOR);

    let body = match discriminator.as_str() {
        "alive" => RecordBody::Alive,
        "statusList" => RecordBody::StatusList,
        "counter" => {
            fields.require("counter", 7)?;
            let payload = EventPayload::Counter {
                dir: fields.text(5),
                height: fields.uint(6, "height"),
            };
            RecordBody::Event(event(&mut fields, timestamp, payload))
        }
        "fillLevel" => {
            fields.require("fillLevel", 6)?;
            let payload = EventPayload::FillLevel {
                level: fields.uint(5, "fillLevel"),
            };
            RecordBody::Event(event(&mut fields, timestamp, payload))
        }
        "dwellTime" => {
            fields.require("dwellTime", 10)?;
            let payload = EventPayload::DwellTime {
                dwell_time: fields.float(5, "dwellTime"),
                exp_dwell_time: fields.float(6, "expDwellTime"),
                ts_exit: fields.timestamp(7, "tsExit"),
                object_id: fields.uint(8, "objectId"),
                height: fields.uint(9, "height"),
            };
            RecordBody::Event(event(&mut fields, timestamp, payload))
        }
        _ => {
            let device = fields.text(2);
            RecordBody::FrameHeader(FrameHeader {
                hostname: source.clone(),
                device_id: device.clone(),
                mac: device,
                ip: discriminator.clone(),
                ip_vpn: fields.text(4),
            })
        }
    };

    Ok(ParsedLine {
        record: RawRecord {
            timestamp,
            source,
            body,
        },
        issues: fields.issues,
    })
}

fn event(fields: &mut Fields<'_>, ts: DateTime<Utc>, payload: EventPayload) -> Event {
    Event {
        ts,
        seq: fields.uint(2, "seq"),
        id: fields.text(4),
        payload,
    }
}
