//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::cached_source::CachedSource;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::object_store::{IndexFilter, ObjectStore};
use crate::domain::config_validation::{
    PipelineConfig, load_pipeline_config, parse_interval, parse_period, parse_ticker_list,
    validate,
};
use crate::domain::error::PipelineError;
use crate::domain::summary::RunSummary;
use crate::orchestrator::run_loop;
use crate::ports::notify_port::NotifyPort;

#[derive(Parser, Debug)]
#[command(
    name = "chartvault",
    about = "Chart-pattern detection with a two-tier datastore"
)]
pub struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. info, debug, chartvault=trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline once, or repeatedly with --loop-interval
    Run(RunArgs),
    /// Print a stored payload as JSON
    Show {
        digest: String,
        #[arg(long, default_value = "datastore")]
        base_dir: PathBuf,
    },
    /// Print manifest index rows, most recent first
    Index {
        #[arg(long, default_value = "datastore")]
        base_dir: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        contains: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Flags for `run`. Each one overrides the matching INI key.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Comma-separated ticker list
    #[arg(long)]
    pub tickers: Option<String>,
    #[arg(long)]
    pub period: Option<String>,
    #[arg(long)]
    pub interval: Option<String>,
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub workers: Option<usize>,
    /// Seconds between runs; omit to run once
    #[arg(long)]
    pub loop_interval: Option<u64>,
    #[arg(long)]
    pub webhook_url: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(&cli.log_level);
    let result = match cli.command {
        Command::Run(args) => run_pipeline(&args),
        Command::Show { digest, base_dir } => run_show(&digest, &base_dir),
        Command::Index {
            base_dir,
            ticker,
            contains,
            limit,
        } => run_index(
            &base_dir,
            IndexFilter {
                ticker,
                contains,
                limit,
            },
        ),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// `RUST_LOG` wins over `--log-level`. Safe to call more than once.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// INI file (if any), then flag overrides, then validation.
pub fn build_config(args: &RunArgs) -> Result<PipelineConfig, PipelineError> {
    let mut cfg = match &args.config {
        Some(path) => load_pipeline_config(&FileConfigAdapter::from_file(path)?)?,
        None => PipelineConfig::default(),
    };

    if let Some(raw) = &args.tickers {
        cfg.tickers = parse_ticker_list(raw)?;
    }
    if let Some(raw) = &args.period {
        cfg.period = parse_period(raw)?;
    }
    if let Some(raw) = &args.interval {
        cfg.interval = parse_interval(raw)?;
    }
    if let Some(dir) = &args.base_dir {
        cfg.base_dir = dir.clone();
    }
    if let Some(dir) = &args.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        cfg.workers = workers;
    }
    if let Some(secs) = args.loop_interval {
        cfg.loop_interval = Some(Duration::from_secs(secs));
    }
    if let Some(url) = &args.webhook_url {
        cfg.webhook_url = Some(url.clone());
    }

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(feature = "webhook")]
fn build_notifier(cfg: &PipelineConfig) -> Result<Option<Box<dyn NotifyPort>>, PipelineError> {
    use crate::adapters::webhook::{DEFAULT_TIMEOUT, WebhookNotifier};

    cfg.webhook_url
        .as_deref()
        .map(|url| {
            WebhookNotifier::new(url, DEFAULT_TIMEOUT).map(|n| Box::new(n) as Box<dyn NotifyPort>)
        })
        .transpose()
}

#[cfg(not(feature = "webhook"))]
fn build_notifier(cfg: &PipelineConfig) -> Result<Option<Box<dyn NotifyPort>>, PipelineError> {
    if cfg.webhook_url.is_some() {
        warn!("webhook_url is set but chartvault was built without the webhook feature");
    }
    Ok(None)
}

fn run_pipeline(args: &RunArgs) -> Result<(), PipelineError> {
    let cfg = build_config(args)?;
    let source = CachedSource::new(CsvAdapter::new(cfg.data_dir.clone()), cfg.cache_ttl);
    let notifier = build_notifier(&cfg)?;

    info!(
        tickers = %cfg.tickers.join(","),
        base_dir = %cfg.base_dir.display(),
        data_dir = %cfg.data_dir.display(),
        "loaded configuration"
    );

    // The CLI never stops on its own; continuous mode runs until the process is killed.
    let summary = run_loop(&cfg, &source, notifier.as_deref(), |summary| {
        print_summary(summary);
        false
    })?;
    if cfg.loop_interval.is_none() {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    eprintln!(
        "\n=== Run {} ({}/{}) ===",
        summary.run_id, summary.period, summary.interval
    );
    for t in &summary.tickers {
        match (&t.digest, &t.reason) {
            (Some(digest), _) => eprintln!(
                "  {:<10} ok      rows={:<6} new={:<6} overlays={:<3} {}{}",
                t.ticker,
                t.row_count,
                t.appended_row_count,
                t.overlay_count,
                &digest[..12],
                if t.deduplicated { " (dedup)" } else { "" }
            ),
            (None, reason) => eprintln!(
                "  {:<10} failed  {}",
                t.ticker,
                reason.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    eprintln!(
        "  {} ok, {} failed",
        summary.ok_count(),
        summary.failed_count()
    );
}

fn run_show(digest: &str, base_dir: &Path) -> Result<(), PipelineError> {
    let payload = ObjectStore::new(base_dir).fetch(digest)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_index(base_dir: &Path, filter: IndexFilter) -> Result<(), PipelineError> {
    let rows = ObjectStore::new(base_dir).scan_index(&filter)?;
    let mut wtr = csv::Writer::from_writer(io::stdout());
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    if rows.is_empty() {
        warn!(base_dir = %base_dir.display(), "no index rows matched");
    }
    Ok(())
}
