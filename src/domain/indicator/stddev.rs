//! Rolling standard deviation.
//!
//! Population standard deviation over n samples.
//! STDDEV(n)[i] = sqrt(sum((X[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) samples are `None`.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_stddev(values: &[f64], period: usize) -> IndicatorSeries {
    let mut out = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if period == 0 || i + 1 < period {
            out.push(None);
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let mean: f64 = window.iter().sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        out.push(Some(variance.sqrt()));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_warmup() {
        let series = calculate_stddev(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        assert!(series.values[0].is_none());
        assert!(series.values[1].is_none());
        assert!(series.values[2].is_some());
        assert!(series.values[3].is_some());
        assert!(series.values[4].is_some());
    }

    #[test]
    fn stddev_constant_values() {
        let series = calculate_stddev(&[100.0; 5], 3);
        assert!(series.value_at(2).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_known_values() {
        let series = calculate_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        assert!((series.value_at(7).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn stddev_indicator_type() {
        let series = calculate_stddev(&[10.0, 20.0, 30.0], 5);
        assert_eq!(series.indicator_type, IndicatorType::Stddev(5));
        assert!(series.values.iter().all(Option::is_none));
    }
}
