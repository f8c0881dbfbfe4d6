//! Pipeline configuration: INI loading and validation.
//!
//! Sections: `[pipeline]`, `[source]`, `[detection]`, `[scoring]`. Missing keys take
//! defaults; present keys must parse. `validate` runs after CLI overrides are applied.

use crate::domain::error::PipelineError;
use crate::domain::patterns::DetectionConfig;
use crate::domain::scoring::ScoringConfig;
use crate::domain::timeframe::{Interval, Period};
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    pub period: Period,
    pub interval: Interval,
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub workers: usize,
    pub loop_interval: Option<Duration>,
    pub webhook_url: Option<String>,
    pub cache_ttl: Duration,
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            period: Period::Year1,
            interval: Interval::Day1,
            base_dir: PathBuf::from("datastore"),
            data_dir: PathBuf::from("data"),
            workers: DEFAULT_WORKERS,
            loop_interval: None,
            webhook_url: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            detection: DetectionConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PipelineError {
    PipelineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn parse_ticker_list(raw: &str) -> Result<Vec<String>, PipelineError> {
    parse_tickers(raw).map_err(|e| invalid("pipeline", "tickers", e.to_string()))
}

pub fn parse_period(raw: &str) -> Result<Period, PipelineError> {
    raw.parse::<Period>()
        .map_err(|e| invalid("pipeline", "period", e.to_string()))
}

pub fn parse_interval(raw: &str) -> Result<Interval, PipelineError> {
    raw.parse::<Interval>()
        .map_err(|e| invalid("pipeline", "interval", e.to_string()))
}

/// Reads every known key over the defaults. Does not call [`validate`].
pub fn load_pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, PipelineError> {
    let mut cfg = PipelineConfig::default();

    if let Some(raw) = config.get_value("pipeline", "tickers") {
        cfg.tickers = parse_ticker_list(&raw)?;
    }
    if let Some(raw) = config.get_value("pipeline", "period") {
        cfg.period = parse_period(&raw)?;
    }
    if let Some(raw) = config.get_value("pipeline", "interval") {
        cfg.interval = parse_interval(&raw)?;
    }
    if let Some(raw) = config.get_value("pipeline", "base_dir") {
        cfg.base_dir = PathBuf::from(raw);
    }
    if let Some(workers) = config.get_usize("pipeline", "workers")? {
        cfg.workers = workers;
    }
    if let Some(secs) = config.get_u64("pipeline", "loop_interval_secs")? {
        cfg.loop_interval = Some(Duration::from_secs(secs));
    }
    cfg.webhook_url = config.get_value("pipeline", "webhook_url");

    if let Some(raw) = config.get_value("source", "data_dir") {
        cfg.data_dir = PathBuf::from(raw);
    }
    if let Some(secs) = config.get_u64("source", "cache_ttl_secs")? {
        cfg.cache_ttl = Duration::from_secs(secs);
    }

    if let Some(v) = config.get_usize("detection", "consolidation_window")? {
        cfg.detection.consolidation_window = v;
    }
    if let Some(v) = config.get_f64("detection", "consolidation_max_range_pct")? {
        cfg.detection.consolidation_max_range_pct = v;
    }
    if let Some(v) = config.get_usize("detection", "triangle_window")? {
        cfg.detection.triangle_window = v;
    }

    if let Some(v) = config.get_f64("scoring", "min_score")? {
        cfg.scoring.min_score = v;
    }
    if let Some(v) = config.get_usize("scoring", "max_patterns")? {
        cfg.scoring.max_patterns = v;
    }

    Ok(cfg)
}

pub fn validate(cfg: &PipelineConfig) -> Result<(), PipelineError> {
    if cfg.tickers.is_empty() {
        return Err(PipelineError::ConfigMissing {
            section: "pipeline".to_string(),
            key: "tickers".to_string(),
        });
    }
    if cfg.workers == 0 {
        return Err(invalid("pipeline", "workers", "workers must be at least 1"));
    }
    if cfg.loop_interval.is_some_and(|d| d.is_zero()) {
        return Err(invalid(
            "pipeline",
            "loop_interval_secs",
            "loop interval must be positive",
        ));
    }
    let is_http = |url: &str| url.starts_with("http://") || url.starts_with("https://");
    if cfg.webhook_url.as_deref().is_some_and(|url| !is_http(url)) {
        return Err(invalid(
            "pipeline",
            "webhook_url",
            "webhook_url must be an http(s) URL",
        ));
    }
    validate_detection(&cfg.detection)?;
    validate_scoring(&cfg.scoring)?;
    Ok(())
}

fn validate_detection(d: &DetectionConfig) -> Result<(), PipelineError> {
    if d.consolidation_window < 2 {
        return Err(invalid(
            "detection",
            "consolidation_window",
            "consolidation_window must be at least 2",
        ));
    }
    if !(d.consolidation_max_range_pct > 0.0 && d.consolidation_max_range_pct <= 1.0) {
        return Err(invalid(
            "detection",
            "consolidation_max_range_pct",
            "consolidation_max_range_pct must be in (0, 1]",
        ));
    }
    if d.triangle_window < 2 {
        return Err(invalid(
            "detection",
            "triangle_window",
            "triangle_window must be at least 2",
        ));
    }
    Ok(())
}

fn validate_scoring(s: &ScoringConfig) -> Result<(), PipelineError> {
    if !s.min_score.is_finite() || s.min_score < 0.0 {
        return Err(invalid(
            "scoring",
            "min_score",
            "min_score must be a non-negative number",
        ));
    }
    if s.max_patterns == 0 {
        return Err(invalid(
            "scoring",
            "max_patterns",
            "max_patterns must be at least 1",
        ));
    }
    Ok(())
}
