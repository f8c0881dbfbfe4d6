//! Rolling-window indicators used by the derived-field pass.
//!
//! Indicators run over a plain `&[f64]` column (close, volume, ...) so the same
//! window code serves price and volume fields.
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: one optional value per input sample; `None` during warm-up

pub mod savgol;
pub mod sma;
pub mod stddev;
pub mod zscore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Stddev(usize),
    Zscore(usize),
    SavitzkyGolay { window: usize, degree: usize },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}
