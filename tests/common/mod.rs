#![allow(dead_code)]

use chartvault::domain::config_validation::PipelineConfig;
use chartvault::domain::error::PipelineError;
pub use chartvault::domain::ohlcv::Bar;
use chartvault::domain::timeframe::{Interval, Period};
use chartvault::ports::data_port::DataPort;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Bar>, PipelineError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(PipelineError::Fetch {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| PipelineError::NoData {
                ticker: ticker.to_string(),
                period: period.to_string(),
                interval: interval.to_string(),
            })
    }
}

pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        time: day(i),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Trending series with a sine wobble and varying volume.
pub fn make_wave(n: usize, base: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let c = base + (i as f64 * 0.35).sin() * base * 0.03 + i as f64 * 0.05;
            let volume = 20_000.0 + (i as f64 * 1.3).cos() * 6_000.0;
            make_bar(i, c * 0.996, c * 1.012, c * 0.985, c, volume)
        })
        .collect()
}

/// Highs fall 110 -> 100 and lows rise 90 -> 100 over `n` bars.
pub fn make_triangle(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            let high = 110.0 - 10.0 * t;
            let low = 90.0 + 10.0 * t;
            let mid = (high + low) / 2.0;
            make_bar(i, mid, high, low, mid, 1_000.0)
        })
        .collect()
}

/// 13-bar pole rising 100 -> 120 followed by a 15-bar body inside a 2-point band.
pub fn make_bull_flag() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..13)
        .map(|i| {
            let c = 100.0 + 20.0 * i as f64 / 12.0;
            make_bar(i, c, c + 0.5, c - 0.5, c, 1_000.0)
        })
        .collect();
    bars.extend((13..28).map(|i| make_bar(i, 120.0, 121.0, 119.0, 120.0, 1_000.0)));
    bars
}

pub fn make_config(base_dir: &Path, tickers: &[&str]) -> PipelineConfig {
    PipelineConfig {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        base_dir: base_dir.to_path_buf(),
        workers: 3,
        ..PipelineConfig::default()
    }
}

/// Writes bars as `{dir}/{ticker}_{interval}.csv` in the layout `CsvAdapter` reads.
pub fn write_csv(dir: &Path, ticker: &str, interval: &str, bars: &[Bar]) {
    let mut wtr = csv::Writer::from_path(dir.join(format!("{ticker}_{interval}.csv"))).unwrap();
    wtr.write_record(["time", "open", "high", "low", "close", "volume"])
        .unwrap();
    for b in bars {
        wtr.write_record([
            b.time.to_rfc3339(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])
        .unwrap();
    }
    wtr.flush().unwrap();
}
