//! Append-only storage of ingested snapshots, one CSV file per calendar day
//!
//! The day key comes from the wall clock at write time, never from the
//! event timestamps, so a late-arriving snapshot lands in today's file.

pub mod expand;

pub use expand::{expand_message, expand_snapshot};

use crate::record::Message;
use chrono::{Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
pub enum StoreError {
    CreateDir(PathBuf, std::io::Error),
    Open(PathBuf, std::io::Error),
    Write(PathBuf, std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::CreateDir(p, e) => write!(f, "Can't make dir '{}': {}", p.display(), e),
            StoreError::Open(p, e) => write!(f, "Can't open file '{}': {}", p.display(), e),
            StoreError::Write(p, e) => write!(f, "Can't write file '{}': {}", p.display(), e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Source of the calendar date used as the file key
pub trait DateSource: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDate;

impl DateSource for SystemDate {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// File name for one day's log, e.g. `2021-03-15.csv`
pub fn day_file_name(date: NaiveDate) -> String {
    format!("{}.csv", date.format("%Y-%m-%d"))
}

struct OpenLog {
    key: String,
    path: PathBuf,
    file: File,
}

/// Single-writer rotating sink. Concurrent callers are serialized by an
/// internal lock held for the whole `store()` call.
pub struct RotatingLogStore {
    dir: PathBuf,
    clock: Box<dyn DateSource>,
    current: Mutex<Option<OpenLog>>,
}

impl RotatingLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, SystemDate)
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: impl DateSource + 'static) -> Self {
        Self {
            dir: dir.into(),
            clock: Box::new(clock),
            current: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one line to today's file. Failures are logged, not returned.
    pub fn store(&self, line: &str) {
        if let Err(e) = self.try_store(line) {
            log::error!("❌ {}", e);
        }
    }

    /// Store every line of a published message, header line first.
    pub fn store_message(&self, message: &Message) {
        for line in expand_message(message) {
            self.store(&line);
        }
    }

    fn try_store(&self, line: &str) -> Result<(), StoreError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        // Day key is read under the lock; a stale key must never reopen an old day
        let key = day_file_name(self.clock.today());

        if current.as_ref().is_some_and(|open| open.key != key) {
            if let Some(old) = current.take() {
                log::info!("📄 Closed {}, rotating to {}", old.path.display(), key);
            }
        }

        if current.is_none() {
            *current = Some(self.open_day(key)?);
        }

        let Some(open) = current.as_mut() else {
            return Ok(());
        };
        open.file
            .write_all(format!("{}\n", line).as_bytes())
            .map_err(|e| StoreError::Write(open.path.clone(), e))
    }

    fn open_day(&self, key: String) -> Result<OpenLog, StoreError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| StoreError::CreateDir(self.dir.clone(), e))?;
        }

        let path = self.dir.join(&key);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::Open(path.clone(), e))?;

        log::info!("📝 Storing to {}", path.display());
        Ok(OpenLog { key, path, file })
    }
}
