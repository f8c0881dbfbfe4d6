//! CLI integration tests: configuration layering with real INI files and the
//! `run`, `show` and `index` commands against a temporary datastore.

mod common;

use chartvault::adapters::object_store::{IndexFilter, ObjectStore};
use chartvault::adapters::summary_log::SummaryLog;
use chartvault::cli::{self, Cli, Command, RunArgs};
use chartvault::domain::error::PipelineError;
use chartvault::domain::timeframe::{Interval, Period};
use common::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

fn run_command(command: Command) -> ExitCode {
    cli::run(Cli {
        log_level: "warn".to_string(),
        command,
    })
}

const FULL_INI: &str = r#"
[pipeline]
tickers = aaa, bbb
period = 6mo
interval = 1d
workers = 2
webhook_url = https://hooks.example.com/run

[source]
cache_ttl_secs = 30

[detection]
consolidation_window = 15
consolidation_max_range_pct = 0.05
triangle_window = 25

[scoring]
min_score = 0.1
max_patterns = 20
"#;

mod config_loading {
    use super::*;

    #[test]
    fn full_ini_is_loaded() {
        let file = write_temp_ini(FULL_INI);
        let cfg = cli::build_config(&RunArgs {
            config: Some(file.path().to_path_buf()),
            ..RunArgs::default()
        })
        .unwrap();

        assert_eq!(cfg.tickers, vec!["AAA", "BBB"]);
        assert_eq!(cfg.period, Period::Month6);
        assert_eq!(cfg.interval, Interval::Day1);
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.cache_ttl.as_secs(), 30);
        assert_eq!(
            cfg.webhook_url.as_deref(),
            Some("https://hooks.example.com/run")
        );
        assert_eq!(cfg.detection.consolidation_window, 15);
        assert_eq!(cfg.detection.triangle_window, 25);
        assert_eq!(cfg.scoring.max_patterns, 20);
    }

    #[test]
    fn flags_override_ini_values() {
        let file = write_temp_ini(FULL_INI);
        let cfg = cli::build_config(&RunArgs {
            config: Some(file.path().to_path_buf()),
            tickers: Some("zzz".to_string()),
            base_dir: Some(PathBuf::from("/tmp/elsewhere")),
            workers: Some(6),
            ..RunArgs::default()
        })
        .unwrap();
        assert_eq!(cfg.tickers, vec!["ZZZ"]);
        assert_eq!(cfg.base_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(cfg.workers, 6);
        assert_eq!(cfg.period, Period::Month6);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            "[pipeline]\ntickers = AAA\nworkers = 0\n",
            "[pipeline]\ntickers = AAA,aaa\n",
            "[pipeline]\ntickers = AAA\ninterval = 1D\n",
            "[pipeline]\ntickers = AAA\nwebhook_url = ftp://x\n",
            "[pipeline]\ntickers = AAA\n[scoring]\nmax_patterns = 0\n",
            "[pipeline]\ntickers = AAA\n[detection]\ntriangle_window = 1\n",
        ];
        for ini in cases {
            let file = write_temp_ini(ini);
            let result = cli::build_config(&RunArgs {
                config: Some(file.path().to_path_buf()),
                ..RunArgs::default()
            });
            assert!(
                matches!(result, Err(PipelineError::ConfigInvalid { .. })),
                "accepted {ini:?}"
            );
        }
    }

    #[test]
    fn unparseable_number_is_invalid() {
        let file = write_temp_ini("[pipeline]\ntickers = AAA\nworkers = many\n");
        let result = cli::build_config(&RunArgs {
            config: Some(file.path().to_path_buf()),
            ..RunArgs::default()
        });
        assert!(matches!(result, Err(PipelineError::ConfigInvalid { .. })));
    }
}

mod commands {
    use super::*;

    fn seeded_data(dir: &Path) {
        write_csv(dir, "AAA", "1d", &make_wave(70, 40.0));
        write_csv(dir, "BBB", "1d", &make_triangle(30));
    }

    fn run_args(data: &TempDir, base: &TempDir) -> RunArgs {
        RunArgs {
            tickers: Some("AAA,BBB".to_string()),
            data_dir: Some(data.path().to_path_buf()),
            base_dir: Some(base.path().to_path_buf()),
            workers: Some(2),
            ..RunArgs::default()
        }
    }

    #[test]
    fn run_persists_both_tiers() {
        let data = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        seeded_data(data.path());

        assert!(is_success(run_command(Command::Run(run_args(&data, &base)))));

        assert!(base.path().join("level1/AAA_1y_1d.ledger").exists());
        assert!(base.path().join("level1/BBB_1y_1d.ledger").exists());
        assert!(base.path().join("level2/manifests/index.csv").exists());
        let store = ObjectStore::new(base.path());
        assert_eq!(store.object_count().unwrap(), 2);

        let log = SummaryLog::new(base.path()).read_all().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].ok_count(), 2);
    }

    #[test]
    fn failed_ticker_still_exits_successfully() {
        let data = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        seeded_data(data.path());
        let mut args = run_args(&data, &base);
        args.tickers = Some("AAA,MISSING".to_string());

        assert!(is_success(run_command(Command::Run(args))));
        let log = SummaryLog::new(base.path()).read_all().unwrap();
        assert_eq!(log[0].failed_count(), 1);
    }

    #[test]
    fn config_error_exits_non_zero() {
        let code = run_command(Command::Run(RunArgs::default()));
        assert!(!is_success(code));
    }

    #[test]
    fn show_and_index_read_back_the_run() {
        let data = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        seeded_data(data.path());
        assert!(is_success(run_command(Command::Run(run_args(&data, &base)))));

        let rows = ObjectStore::new(base.path())
            .scan_index(&IndexFilter {
                ticker: Some("bbb".to_string()),
                ..IndexFilter::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);

        assert!(is_success(run_command(Command::Show {
            digest: rows[0].digest.clone(),
            base_dir: base.path().to_path_buf(),
        })));
        assert!(is_success(run_command(Command::Index {
            base_dir: base.path().to_path_buf(),
            ticker: Some("AAA".to_string()),
            contains: None,
            limit: Some(1),
        })));
    }

    #[test]
    fn show_unknown_digest_fails() {
        let base = TempDir::new().unwrap();
        let code = run_command(Command::Show {
            digest: "0".repeat(64),
            base_dir: base.path().to_path_buf(),
        });
        assert!(!is_success(code));
    }
}
