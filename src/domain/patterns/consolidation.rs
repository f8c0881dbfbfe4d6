//! Consolidation (tight trading range) detector.
//!
//! A window of `window` bars qualifies when (max high - min low) / midpoint is at most
//! `max_range_pct`. Only the most recent qualifying window is reported.

use crate::domain::ohlcv::Bar;
use crate::domain::patterns::{PatternFamily, PatternOverlay};

pub fn detect_consolidation(
    bars: &[Bar],
    window: usize,
    max_range_pct: f64,
) -> Vec<PatternOverlay> {
    if window == 0 || bars.len() < window {
        return Vec::new();
    }

    for start in (0..=bars.len() - window).rev() {
        let slice = &bars[start..start + window];
        let top = slice.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let bottom = slice.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let midpoint = (top + bottom) / 2.0;
        if midpoint <= 0.0 {
            continue;
        }
        if (top - bottom) / midpoint <= max_range_pct {
            let end = start + window - 1;
            return vec![PatternOverlay::new(
                "consolidation",
                PatternFamily::Consolidation,
                (start, end),
                (top, top),
                (bottom, bottom),
                bars.len(),
            )];
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, high: f64, low: f64) -> Bar {
        Bar {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(i as i64),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1000.0,
        }
    }

    #[test]
    fn finds_most_recent_tight_window() {
        // 10 wide bars followed by 25 tight ones
        let mut bars: Vec<Bar> = (0..10).map(|i| bar(i, 120.0, 80.0)).collect();
        bars.extend((10..35).map(|i| bar(i, 101.0, 99.0)));

        let found = detect_consolidation(&bars, 20, 0.04);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "consolidation");
        assert_eq!(found[0].start_index, 15);
        assert_eq!(found[0].end_index, 34);
        assert_eq!(found[0].upper_start, 101.0);
        assert_eq!(found[0].lower_end, 99.0);
    }

    #[test]
    fn wide_range_does_not_qualify() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| bar(i, 100.0 + i as f64, 90.0 + i as f64))
            .collect();
        assert!(detect_consolidation(&bars, 20, 0.04).is_empty());
    }

    #[test]
    fn too_short_is_empty() {
        let bars: Vec<Bar> = (0..5).map(|i| bar(i, 101.0, 99.0)).collect();
        assert!(detect_consolidation(&bars, 20, 0.04).is_empty());
    }
}
