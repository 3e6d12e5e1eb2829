//! Replay of time-ordered sensor logs as paced snapshot publications
//!
//! # Architecture
//!
//! ```text
//! DirectoryReplayDriver (YYYY-MM-DD.csv, sorted, date-filtered)
//!     ↓ one file at a time
//! PacingEngine (frames + WindowGate + pacing sleep)
//!     ↓
//! BatchAccumulator (single vs. multi)
//!     ↓
//! Emitter
//! ```

pub mod batch;
pub mod driver;
pub mod engine;
pub mod window;

pub use batch::BatchAccumulator;
pub use driver::{daily_file_date, select_daily_files, DirectoryReplayDriver};
pub use engine::{DeviceFrame, Flow, PacingEngine, PacingSettings, ReplayError, ReplaySummary};
pub use window::{DateWindow, GateDecision, GateState, MonthDay, TimeOfDay, TimeWindow, WindowGate};
