//! Directory replay - runs one pacing pass per `YYYY-MM-DD.csv` file

use super::engine::{PacingEngine, PacingSettings, ReplayError, ReplaySummary};
use super::window::{DateWindow, MonthDay};
use crate::emitter::Emitter;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Parse a daily log name such as `2021-03-15.csv`.
pub fn daily_file_date(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".csv")?;
    if stem.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// Daily log files in `dir` that fall inside `dates`, in chronological order
pub fn select_daily_files(
    dir: &Path,
    dates: Option<&DateWindow>,
) -> Result<Vec<PathBuf>, ReplayError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ReplayError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReplayError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(date) = daily_file_date(&name) else {
            continue;
        };
        if dates.map_or(true, |w| w.contains(MonthDay::of(&date))) {
            names.push(name);
        }
    }

    // Fixed-width names sort chronologically
    names.sort();
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Sequences pacing runs across the daily files of one directory.
///
/// Every file gets a fresh engine; pacing does not carry over between files.
/// The emitter is shared for the whole run.
pub struct DirectoryReplayDriver {
    dir: PathBuf,
    dates: Option<DateWindow>,
    settings: PacingSettings,
    emitter: Arc<dyn Emitter>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl DirectoryReplayDriver {
    pub fn new(
        dir: impl Into<PathBuf>,
        dates: Option<DateWindow>,
        settings: PacingSettings,
        emitter: Arc<dyn Emitter>,
    ) -> Self {
        Self {
            dir: dir.into(),
            dates,
            settings,
            emitter,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn files(&self) -> Result<Vec<PathBuf>, ReplayError> {
        select_daily_files(&self.dir, self.dates.as_ref())
    }

    pub async fn run(&self) -> Result<ReplaySummary, ReplayError> {
        let files = self.files()?;
        log::info!(
            "🗂️  {} daily files selected in {}",
            files.len(),
            self.dir.display()
        );

        let mut total = ReplaySummary::default();
        for (idx, path) in files.iter().enumerate() {
            if self.is_cancelled() {
                total.cancelled = true;
                break;
            }

            log::info!("   ├─ [{}/{}] {}", idx + 1, files.len(), path.display());
            let mut engine = PacingEngine::new(self.emitter.clone(), &self.settings);
            if let Some(shutdown) = &self.shutdown {
                engine = engine.with_shutdown(shutdown.clone());
            }

            let summary = engine.run_file(path).await?;
            log::info!(
                "   └─ {} lines, {} messages sent, {} failed",
                summary.lines,
                summary.messages_published,
                summary.publish_failures
            );
            total.merge(&summary);
            if summary.cancelled {
                break;
            }
        }

        Ok(total)
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().map_or(false, |rx| *rx.borrow())
    }
}
