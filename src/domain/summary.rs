//! Per-ticker and per-run outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub status: TickerStatus,
    pub reason: Option<String>,
    pub row_count: usize,
    pub appended_row_count: usize,
    pub overlay_count: usize,
    pub digest: Option<String>,
    pub deduplicated: bool,
    pub ledger_path: Option<PathBuf>,
    pub object_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
}

impl TickerSummary {
    pub fn failed(ticker: &str, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            status: TickerStatus::Failed,
            reason: Some(reason.into()),
            row_count: 0,
            appended_row_count: 0,
            overlay_count: 0,
            digest: None,
            deduplicated: false,
            ledger_path: None,
            object_path: None,
            manifest_path: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TickerStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_utc: DateTime<Utc>,
    pub finished_utc: DateTime<Utc>,
    pub period: String,
    pub interval: String,
    pub tickers: Vec<TickerSummary>,
}

impl RunSummary {
    pub fn ok_count(&self) -> usize {
        self.tickers.iter().filter(|t| t.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tickers.len() - self.ok_count()
    }

    pub fn ticker(&self, name: &str) -> Option<&TickerSummary> {
        self.tickers.iter().find(|t| t.ticker == name)
    }
}

/// Run ids sort lexically in time order: `20240102T030405123456Z`.
pub fn run_id(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%6fZ").to_string()
}
