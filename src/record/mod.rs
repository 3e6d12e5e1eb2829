//! Typed records decoded from sensor log lines

pub mod parser;
pub mod types;

pub use parser::{parse_line, parse_timestamp, ParseError, ParsedLine};
pub use types::{
    Event, EventPayload, FrameHeader, Message, MessageKind, RawRecord, RecordBody, RecordKind,
    Snapshot,
};
