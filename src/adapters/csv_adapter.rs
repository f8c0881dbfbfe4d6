//! CSV file data adapter.
//!
//! Reads `{data_dir}/{TICKER}_{interval}.csv` with a header row
//! `time,open,high,low,close,volume` (`date`, `datetime` or `timestamp` are accepted
//! for the first column). The period is measured back from the newest bar in the file.

use crate::domain::error::PipelineError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::{Interval, Period};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date", alias = "datetime", alias = "timestamp")]
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", ticker, interval))
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a plain date at midnight UTC.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

impl DataPort for CsvAdapter {
    fn fetch(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Bar>, PipelineError> {
        let no_data = || PipelineError::NoData {
            ticker: ticker.to_string(),
            period: period.to_string(),
            interval: interval.to_string(),
        };
        let fetch_err = |reason: String| PipelineError::Fetch {
            ticker: ticker.to_string(),
            reason,
        };

        let path = self.csv_path(ticker, interval);
        if !path.exists() {
            return Err(no_data());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| fetch_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| fetch_err(format!("CSV parse error: {}", e)))?;
            let time = parse_time(&row.time).ok_or_else(|| {
                fetch_err(format!("row {}: invalid time {:?}", line + 1, row.time))
            })?;
            bars.push(Bar {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.time);
        bars.dedup_by_key(|b| b.time);

        if let Some(cutoff) = bars.last().and_then(|b| period.cutoff(b.time)) {
            bars.retain(|b| b.time >= cutoff);
        }
        if bars.is_empty() {
            return Err(no_data());
        }
        debug!(ticker, bars = bars.len(), path = %path.display(), "loaded csv bars");
        Ok(bars)
    }
}
