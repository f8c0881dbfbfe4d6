//! Domain error types.
//!
//! Per-ticker failures (fetch, invalid series, persistence) are recorded in that
//! ticker's summary by the orchestrator; everything else aborts the run.

use std::path::PathBuf;

/// Top-level error type for chartvault.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("fetch failed for {ticker}: {reason}")]
    Fetch { ticker: String, reason: String },

    #[error("no data for {ticker} ({period}/{interval})")]
    NoData {
        ticker: String,
        period: String,
        interval: String,
    },

    #[error("invalid bar series for {ticker}: {reason}")]
    InvalidSeries { ticker: String, reason: String },

    #[error("corrupt ledger {}: {reason}", path.display())]
    CorruptLedger { path: PathBuf, reason: String },

    #[error("ledger {} is locked by another run", path.display())]
    LedgerBusy { path: PathBuf },

    #[error("cannot prepare datastore directory {}: {source}", path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest index {} append failed: {reason}", path.display())]
    Index { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object {digest} not found")]
    ObjectNotFound { digest: String },

    #[error("corrupt object {digest}: {reason}")]
    CorruptObject { digest: String, reason: String },

    #[error("notification failed: {reason}")]
    Notification { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Errors that belong to a single ticker and must not abort the whole run.
    pub fn is_ticker_scoped(&self) -> bool {
        matches!(
            self,
            PipelineError::Fetch { .. }
                | PipelineError::NoData { .. }
                | PipelineError::InvalidSeries { .. }
                | PipelineError::CorruptLedger { .. }
                | PipelineError::LedgerBusy { .. }
                | PipelineError::CorruptObject { .. }
                | PipelineError::Storage { .. }
                | PipelineError::Csv(_)
                | PipelineError::Json(_)
                | PipelineError::Io(_)
        )
    }

    /// Adapter for `map_err` that tags an io error with the path it concerns.
    pub fn at(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
        move |source| PipelineError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<&PipelineError> for std::process::ExitCode {
    fn from(err: &PipelineError) -> Self {
        let code: u8 = match err {
            PipelineError::Io(_) | PipelineError::Layout { .. } => 1,
            PipelineError::ConfigParse { .. }
            | PipelineError::ConfigMissing { .. }
            | PipelineError::ConfigInvalid { .. } => 2,
            PipelineError::CorruptLedger { .. }
            | PipelineError::LedgerBusy { .. }
            | PipelineError::Index { .. }
            | PipelineError::Storage { .. }
            | PipelineError::ObjectNotFound { .. }
            | PipelineError::CorruptObject { .. }
            | PipelineError::Csv(_)
            | PipelineError::Json(_) => 3,
            PipelineError::Fetch { .. }
            | PipelineError::NoData { .. }
            | PipelineError::InvalidSeries { .. } => 5,
            PipelineError::Notification { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
