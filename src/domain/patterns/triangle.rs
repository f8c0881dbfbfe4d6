//! Primary symmetric triangle over the trailing window.

use crate::domain::ohlcv::Bar;
use crate::domain::patterns::regression::linear_fit;
use crate::domain::patterns::{PatternFamily, PatternOverlay};

/// Fits highs and lows of the last `window` bars; a falling upper line together with
/// a rising lower line is a symmetric triangle spanning the whole window.
pub fn detect_primary_triangle(bars: &[Bar], window: usize) -> Vec<PatternOverlay> {
    if window < 2 || bars.len() < window {
        return Vec::new();
    }
    let start = bars.len() - window;
    let slice = &bars[start..];

    let highs: Vec<f64> = slice.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = slice.iter().map(|b| b.low).collect();
    let (Some(upper), Some(lower)) = (linear_fit(&highs), linear_fit(&lows)) else {
        return Vec::new();
    };

    if upper.slope < 0.0 && lower.slope > 0.0 {
        let last = (window - 1) as f64;
        vec![PatternOverlay::new(
            "primary_sym_triangle",
            PatternFamily::Triangle,
            (start, bars.len() - 1),
            (upper.value_at(0.0), upper.value_at(last)),
            (lower.value_at(0.0), lower.value_at(last)),
            bars.len(),
        )]
    } else {
        Vec::new()
    }
}
