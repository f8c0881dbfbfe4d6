//! Runs the per-ticker pipeline across a bounded worker pool.
//!
//! Each ticker goes fetch, validate, derive, ledger, detect, calculus, score, persist.
//! A ticker-scoped error marks that ticker `failed` and the run carries on; any other
//! error aborts the run.

use crate::adapters::ledger::LedgerWriter;
use crate::adapters::object_store::{ManifestRecord, ObjectStore};
use crate::adapters::summary_log::SummaryLog;
use crate::domain::calculus::compute_calculus;
use crate::domain::config_validation::PipelineConfig;
use crate::domain::derived::compute_derived;
use crate::domain::error::PipelineError;
use crate::domain::ohlcv::validate_series;
use crate::domain::patterns::detect_all;
use crate::domain::payload::{PayloadMeta, RunPayload};
use crate::domain::scoring::select_overlays;
use crate::domain::summary::{RunSummary, TickerStatus, TickerSummary, run_id};
use crate::ports::data_port::DataPort;
use crate::ports::notify_port::NotifyPort;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::thread;
use tracing::{error, info, info_span, warn};

/// Storage handles shared by every ticker of one run.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    source: &'a dyn DataPort,
    ledger: LedgerWriter,
    store: ObjectStore,
    summary_log: SummaryLog,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, source: &'a dyn DataPort) -> Self {
        Self {
            config,
            source,
            ledger: LedgerWriter::new(&config.base_dir),
            store: ObjectStore::new(&config.base_dir),
            summary_log: SummaryLog::new(&config.base_dir),
        }
    }

    pub fn ledger(&self) -> &LedgerWriter {
        &self.ledger
    }

    /// Processes every configured ticker once and appends the run to the summary log.
    pub fn run_once(&self) -> Result<RunSummary, PipelineError> {
        let started = Utc::now();
        let id = run_id(started);
        fs::create_dir_all(&self.config.base_dir).map_err(|source| PipelineError::Layout {
            path: self.config.base_dir.clone(),
            source,
        })?;
        // Shared directories; a failure here is fatal rather than per ticker.
        self.ledger.prepare()?;
        self.store.prepare()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;

        info!(
            run_id = %id,
            tickers = self.config.tickers.len(),
            workers = self.config.workers,
            period = %self.config.period,
            interval = %self.config.interval,
            "starting run"
        );

        let results: Vec<Result<TickerSummary, PipelineError>> = pool.install(|| {
            self.config
                .tickers
                .par_iter()
                .map(|ticker| {
                    let span = info_span!("ticker", ticker = %ticker);
                    let _enter = span.enter();
                    self.process_ticker(ticker, &id, started)
                })
                .collect()
        });

        let mut tickers = Vec::with_capacity(results.len());
        for (ticker, result) in self.config.tickers.iter().zip(results) {
            match result {
                Ok(summary) => tickers.push(summary),
                Err(e) if e.is_ticker_scoped() => {
                    warn!(ticker = %ticker, error = %e, "ticker failed");
                    tickers.push(TickerSummary::failed(ticker, e.to_string()));
                }
                Err(e) => {
                    error!(ticker = %ticker, error = %e, "aborting run");
                    return Err(e);
                }
            }
        }

        let summary = RunSummary {
            run_id: id,
            started_utc: started,
            finished_utc: Utc::now(),
            period: self.config.period.to_string(),
            interval: self.config.interval.to_string(),
            tickers,
        };
        self.summary_log.append(&summary)?;

        info!(
            run_id = %summary.run_id,
            ok = summary.ok_count(),
            failed = summary.failed_count(),
            "run finished"
        );
        Ok(summary)
    }

    fn process_ticker(
        &self,
        ticker: &str,
        run_id: &str,
        created: DateTime<Utc>,
    ) -> Result<TickerSummary, PipelineError> {
        let period = self.config.period;
        let interval = self.config.interval;

        let bars = self.source.fetch(ticker, period, interval)?;
        validate_series(ticker, &bars)?;

        let derived = compute_derived(&bars);
        let appended = self.ledger.append(ticker, period, interval, &derived)?;

        let candidates = detect_all(&bars, &self.config.detection);
        let candidate_count = candidates.len();
        let calculus = compute_calculus(&derived);
        let overlays = select_overlays(candidates, &calculus, &self.config.scoring);
        let overlay_count = overlays.len();

        let meta = PayloadMeta {
            ticker: ticker.to_string(),
            period: period.to_string(),
            interval: interval.to_string(),
            bar_count: bars.len(),
            first_time: bars.first().map(|b| b.time),
            last_time: bars.last().map(|b| b.time),
            detection: self.config.detection.clone(),
            scoring: self.config.scoring.clone(),
        };
        let payload = RunPayload::new(meta, &derived, overlays, &calculus);
        let put = self.store.put_payload(&payload)?;

        let manifest_path = self.store.record(&ManifestRecord {
            run_id: run_id.to_string(),
            ticker: ticker.to_string(),
            period: period.to_string(),
            interval: interval.to_string(),
            object_ref: put.object_ref.clone(),
            digest: put.digest.clone(),
            size: put.size,
            created_utc: created,
        })?;

        info!(
            bars = bars.len(),
            appended = appended.appended,
            candidates = candidate_count,
            overlays = overlay_count,
            digest = %put.digest,
            deduplicated = put.deduplicated,
            "ticker done"
        );

        Ok(TickerSummary {
            ticker: ticker.to_string(),
            status: TickerStatus::Ok,
            reason: None,
            row_count: appended.row_count,
            appended_row_count: appended.appended,
            overlay_count,
            digest: Some(put.digest),
            deduplicated: put.deduplicated,
            ledger_path: Some(appended.path),
            object_path: Some(put.object_path),
            manifest_path: Some(manifest_path),
        })
    }
}

/// One run followed by a best-effort notification.
pub fn run_once(
    config: &PipelineConfig,
    source: &dyn DataPort,
    notifier: Option<&dyn NotifyPort>,
) -> Result<RunSummary, PipelineError> {
    let summary = Pipeline::new(config, source).run_once()?;
    if let Some(notifier) = notifier {
        if let Err(e) = notifier.notify(&summary) {
            warn!(run_id = %summary.run_id, error = %e, "notification failed");
        }
    }
    Ok(summary)
}

/// Repeats [`run_once`] every `config.loop_interval` until `stop` returns true.
///
/// Without a loop interval this runs exactly once. Returns the last summary.
pub fn run_loop(
    config: &PipelineConfig,
    source: &dyn DataPort,
    notifier: Option<&dyn NotifyPort>,
    mut stop: impl FnMut(&RunSummary) -> bool,
) -> Result<RunSummary, PipelineError> {
    loop {
        let summary = run_once(config, source, notifier)?;
        let Some(interval) = config.loop_interval else {
            return Ok(summary);
        };
        if stop(&summary) {
            return Ok(summary);
        }
        info!(secs = interval.as_secs(), "sleeping until next run");
        thread::sleep(interval);
    }
}
