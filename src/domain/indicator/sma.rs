//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(X[i-n+1..=i]). Warmup: first (n-1) samples are `None`.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_sma(values: &[f64], period: usize) -> IndicatorSeries {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if period > 0 && i >= period {
            sum -= values[i - period];
        }
        if period > 0 && i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_warmup() {
        let series = calculate_sma(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(series.values[0], None);
        assert_eq!(series.values[1], None);
        assert!(series.values[2].is_some());
        assert!(series.values[3].is_some());
    }

    #[test]
    fn sma_trailing_mean() {
        let series = calculate_sma(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!((series.value_at(2).unwrap() - 20.0).abs() < 1e-12);
        assert!((series.value_at(3).unwrap() - 30.0).abs() < 1e-12);
        assert!((series.value_at(4).unwrap() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn sma_zero_period_is_all_none() {
        let series = calculate_sma(&[1.0, 2.0], 0);
        assert!(series.values.iter().all(Option::is_none));
    }
}
