//! People-counter log replay and day-rotated storage
//!
//! ```text
//! replay : CSV lines → parse_line → PacingEngine → BatchAccumulator → Emitter
//! ingest : Emitter delivery → expand_message → RotatingLogStore (YYYY-MM-DD.csv)
//! ```

pub mod config;
pub mod emitter;
pub mod ingest;
pub mod record;
pub mod replay;
pub mod store;

pub use config::{ConfigError, ReplayConfig};
pub use emitter::{ChannelEmitter, Emitter, JsonlEmitter, PublishError};
pub use record::{Message, MessageKind, Snapshot};
pub use replay::{DirectoryReplayDriver, PacingEngine, PacingSettings, ReplayError, ReplaySummary};
pub use store::RotatingLogStore;
