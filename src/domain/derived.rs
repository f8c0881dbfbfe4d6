//! Per-bar derived fields.
//!
//! Computed from the full series at once. `smoothed_close` comes from a centered
//! Savitzky-Golay window and therefore looks ahead; it is descriptive, not causal.

use crate::domain::indicator::savgol::calculate_savgol;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::zscore::calculate_zscore;
use crate::domain::ohlcv::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SMA_PERIOD: usize = 10;
pub const VOLUME_ZSCORE_PERIOD: usize = 20;
pub const SMOOTHING_WINDOW: usize = 9;
pub const SMOOTHING_DEGREE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub return_1: f64,
    pub high_low_spread: f64,
    pub open_close_spread: f64,
    pub sma_10: Option<f64>,
    pub volume_zscore_20: Option<f64>,
    pub smoothed_close: f64,
}

pub fn compute_derived(bars: &[Bar]) -> Vec<DerivedRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let sma = calculate_sma(&closes, SMA_PERIOD);
    let vol_z = calculate_zscore(&volumes, VOLUME_ZSCORE_PERIOD);
    let smoothed = calculate_savgol(&closes, SMOOTHING_WINDOW, SMOOTHING_DEGREE);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let return_1 = if i == 0 {
                0.0
            } else {
                ratio(bar.close - bars[i - 1].close, bars[i - 1].close)
            };
            DerivedRow {
                time: bar.time,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                return_1,
                high_low_spread: ratio(bar.high - bar.low, bar.close),
                open_close_spread: ratio(bar.close - bar.open, bar.open),
                sma_10: sma.value_at(i),
                volume_zscore_20: vol_z.value_at(i),
                smoothed_close: smoothed.value_at(i).unwrap_or(bar.close),
            }
        })
        .collect()
}

/// num / den, 0 when the denominator is 0.
pub(crate) fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}
