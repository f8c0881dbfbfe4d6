//! Level-1 ledger: an append-only CSV of derived rows per (ticker, period, interval).
//!
//! Rows are only ever appended, and only when strictly newer than the last recorded
//! row, so re-running on the same data appends nothing. A ledger that fails to parse
//! or whose times do not increase is reported as corrupt and left untouched.

use crate::adapters::run_lock::{DEFAULT_STALE_AFTER, RunLock};
use crate::domain::derived::DerivedRow;
use crate::domain::error::PipelineError;
use crate::domain::timeframe::{Interval, Period};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    pub path: PathBuf,
    /// Rows in the ledger after the append.
    pub row_count: usize,
    pub appended: usize,
}

pub struct LedgerWriter {
    root: PathBuf,
    stale_after: Duration,
}

impl LedgerWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            root: base_dir.join("level1"),
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    pub fn ledger_path(&self, ticker: &str, period: Period, interval: Interval) -> PathBuf {
        self.root
            .join(format!("{}_{}_{}.ledger", ticker, period, interval))
    }

    /// Creates the level-1 directory. A failure here is a [`PipelineError::Layout`],
    /// which aborts the run.
    pub fn prepare(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.root).map_err(|source| PipelineError::Layout {
            path: self.root.clone(),
            source,
        })
    }

    /// Full recorded history; empty if the ledger does not exist yet.
    pub fn read_rows(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<DerivedRow>, PipelineError> {
        let path = self.ledger_path(ticker, period, interval);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_ledger(&path)
    }

    /// Appends the rows of `rows` newer than the last recorded time, under the run lock.
    pub fn append(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
        rows: &[DerivedRow],
    ) -> Result<AppendOutcome, PipelineError> {
        fs::create_dir_all(&self.root).map_err(PipelineError::at(&self.root))?;
        let path = self.ledger_path(ticker, period, interval);
        let _lock = RunLock::acquire(&path, self.stale_after)?;

        let existing = if path.exists() {
            read_ledger(&path)?
        } else {
            Vec::new()
        };
        let last = existing.last().map(|r| r.time);
        let fresh: Vec<&DerivedRow> = rows
            .iter()
            .filter(|r| last.is_none_or(|t| r.time > t))
            .collect();

        if fresh.is_empty() {
            debug!(ticker, ledger = %path.display(), "ledger already up to date");
            return Ok(AppendOutcome {
                path,
                row_count: existing.len(),
                appended: 0,
            });
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(PipelineError::at(&path))?;
        let needs_header = file.metadata().map_err(PipelineError::at(&path))?.len() == 0;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for row in &fresh {
            wtr.serialize(row)?;
        }
        wtr.into_inner()
            .map_err(|e| PipelineError::at(&path)(e.into_error()))?
            .sync_all()
            .map_err(PipelineError::at(&path))?;

        info!(
            ticker,
            appended = fresh.len(),
            ledger = %path.display(),
            "appended ledger rows"
        );
        Ok(AppendOutcome {
            path,
            row_count: existing.len() + fresh.len(),
            appended: fresh.len(),
        })
    }
}

fn read_ledger(path: &Path) -> Result<Vec<DerivedRow>, PipelineError> {
    let corrupt = |reason: String| PipelineError::CorruptLedger {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = csv::Reader::from_path(path).map_err(|e| corrupt(e.to_string()))?;
    let mut rows: Vec<DerivedRow> = Vec::new();
    for (i, result) in rdr.deserialize::<DerivedRow>().enumerate() {
        let row = result.map_err(|e| corrupt(format!("row {}: {}", i + 1, e)))?;
        if let Some(prev) = rows.last().filter(|prev| row.time <= prev.time) {
            return Err(corrupt(format!(
                "row {}: time {} is not after {}",
                i + 1,
                row.time,
                prev.time
            )));
        }
        rows.push(row);
    }
    Ok(rows)
}
