//! Replay and storage configuration from environment variables

use crate::replay::{DateWindow, MonthDay, PacingSettings, TimeOfDay, TimeWindow};
use std::env;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration shared by the replay and store processes
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    /// Log file, or directory of daily files when `replay_all_files` is set
    pub source_path: Option<PathBuf>,
    pub replay_all_files: bool,
    pub storage_dir: PathBuf,
    pub speed: f64,
    pub batch_size: usize,
    pub time_window: Option<TimeWindow>,
    pub date_window: Option<DateWindow>,
    /// JSONL file the replay publishes to
    pub output_path: PathBuf,
    /// Also store what the replay publishes
    pub ingest: bool,
    /// JSONL message source for the store process; stdin when unset
    pub store_input: Option<PathBuf>,
    pub rust_log: String,
}

impl ReplayConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `REPLAY_SOURCE` (no default; required by the replay process)
    /// - `REPLAY_ALL_FILES` (default: false)
    /// - `STORE_DIR` (default: store)
    /// - `REPLAY_SPEED` (default: 1.0)
    /// - `REPLAY_BATCH_SIZE` (default: 1)
    /// - `REPLAY_START_TIME` / `REPLAY_END_TIME` as `HH:MM` (default: no gating)
    /// - `REPLAY_START_DATE` / `REPLAY_END_DATE` as `MM-DD` (default: every day)
    /// - `REPLAY_OUTPUT` (default: streams/pcounter.jsonl)
    /// - `REPLAY_INGEST` (default: false)
    /// - `STORE_INPUT` (default: stdin)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let speed = match var("REPLAY_SPEED") {
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidValue(format!("REPLAY_SPEED '{}'", raw)))?,
            None => 1.0,
        };

        let batch_size = match var("REPLAY_BATCH_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue(format!("REPLAY_BATCH_SIZE '{}'", raw)))?,
            None => 1,
        };

        let time_window = parse_bounds(
            var("REPLAY_START_TIME"),
            var("REPLAY_END_TIME"),
            "REPLAY_START_TIME/REPLAY_END_TIME",
            TimeOfDay::from_str,
            (TimeOfDay { hour: 0, minute: 0 }, TimeOfDay { hour: 23, minute: 59 }),
        )?
        .map(|(start, end)| TimeWindow { start, end });

        let date_window = parse_bounds(
            var("REPLAY_START_DATE"),
            var("REPLAY_END_DATE"),
            "REPLAY_START_DATE/REPLAY_END_DATE",
            MonthDay::from_str,
            (MonthDay { month: 1, day: 1 }, MonthDay { month: 12, day: 31 }),
        )?
        .map(|(start, end)| DateWindow { start, end });

        let config = Self {
            source_path: var("REPLAY_SOURCE").map(PathBuf::from),
            replay_all_files: parse_flag(var("REPLAY_ALL_FILES")),
            storage_dir: var("STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("store")),
            speed,
            batch_size,
            time_window,
            date_window,
            output_path: var("REPLAY_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("streams/pcounter.jsonl")),
            ingest: parse_flag(var("REPLAY_INGEST")),
            store_input: var("STORE_INPUT").map(PathBuf::from),
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() {
            return Err(ConfigError::InvalidValue(format!(
                "REPLAY_SPEED must be finite, got {}",
                self.speed
            )));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "REPLAY_BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        if let Some(w) = &self.time_window {
            if w.start > w.end {
                return Err(ConfigError::InvalidValue(format!(
                    "time window {}-{} wraps past midnight",
                    w.start, w.end
                )));
            }
        }

        if let Some(w) = &self.date_window {
            if w.start > w.end {
                return Err(ConfigError::InvalidValue(format!(
                    "date window {}..{} wraps past new year",
                    w.start, w.end
                )));
            }
        }

        Ok(())
    }

    /// Source path, required by the replay process
    pub fn require_source(&self) -> Result<&PathBuf, ConfigError> {
        self.source_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingVariable("REPLAY_SOURCE".to_string()))
    }

    pub fn pacing(&self) -> PacingSettings {
        PacingSettings {
            speed: self.speed,
            batch_size: self.batch_size,
            window: self.time_window,
        }
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Parse an optional start/end pair; a missing side takes the open default.
fn parse_bounds<T: Copy>(
    start: Option<String>,
    end: Option<String>,
    name: &str,
    parse: fn(&str) -> Option<T>,
    open: (T, T),
) -> Result<Option<(T, T)>, ConfigError> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }

    let side = |raw: Option<String>, default: T| match raw {
        Some(raw) => parse(&raw)
            .ok_or_else(|| ConfigError::InvalidValue(format!("{} '{}'", name, raw))),
        None => Ok(default),
    };

    Ok(Some((side(start, open.0)?, side(end, open.1)?)))
}
