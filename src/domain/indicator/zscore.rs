//! Rolling z-score.
//!
//! Z(n)[i] = (X[i] - SMA(n)[i]) / STDDEV(n)[i]; 0 when the window has no spread.
//! Warmup: first (n-1) samples are `None`.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::stddev::calculate_stddev;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_zscore(values: &[f64], period: usize) -> IndicatorSeries {
    let mean = calculate_sma(values, period);
    let stdev = calculate_stddev(values, period);

    let out = values
        .iter()
        .enumerate()
        .map(|(i, &v)| match (mean.value_at(i), stdev.value_at(i)) {
            (Some(m), Some(s)) if s > 0.0 => Some((v - m) / s),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Zscore(period),
        values: out,
    }
}
