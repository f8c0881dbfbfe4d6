//! Append-only JSON Lines log of run summaries at `{base}/summary_log.jsonl`.

use crate::domain::error::PipelineError;
use crate::domain::summary::RunSummary;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub struct SummaryLog {
    path: PathBuf,
}

impl SummaryLog {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join("summary_log.jsonl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &RunSummary) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(summary)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Each record goes out in a single write.
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<RunSummary>, PipelineError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut summaries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            summaries.push(serde_json::from_str(&line)?);
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::summary::TickerSummary;
    use chrono::Utc;
    use tempfile::TempDir;

    fn summary(run_id: &str) -> RunSummary {
        RunSummary {
            run_id: run_id.to_string(),
            started_utc: Utc::now(),
            finished_utc: Utc::now(),
            period: "1y".to_string(),
            interval: "1d".to_string(),
            tickers: vec![TickerSummary::failed("AAA", "no data")],
        }
    }

    #[test]
    fn appends_one_line_per_run() {
        let dir = TempDir::new().unwrap();
        let log = SummaryLog::new(dir.path());

        log.append(&summary("r1")).unwrap();
        log.append(&summary("r2")).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 2);

        let runs = log.read_all().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, "r1");
        assert_eq!(runs[1].run_id, "r2");
        assert_eq!(runs[1].tickers[0].reason.as_deref(), Some("no data"));
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(SummaryLog::new(dir.path()).read_all().unwrap().is_empty());
    }
}
