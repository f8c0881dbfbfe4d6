//! Chart-pattern detection.
//!
//! Every detector is a pure function over a bar slice returning zero or more
//! candidate overlays with a zero score. Input that is too short for a detector
//! yields no candidates. Overlay indices outside the slice are a bug and panic.

pub mod candlestick;
pub mod consolidation;
pub mod continuation;
pub mod regression;
pub mod triangle;

use crate::domain::ohlcv::Bar;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    Consolidation,
    Triangle,
    Flag,
    Pennant,
    Wedge,
    Channel,
    Rectangle,
    Candlestick,
}

impl PatternFamily {
    /// Multiplier applied to an overlay's score during selection.
    pub fn bias(self) -> f64 {
        match self {
            PatternFamily::Triangle | PatternFamily::Pennant | PatternFamily::Flag => 1.08,
            _ => 1.0,
        }
    }
}

impl fmt::Display for PatternFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternFamily::Consolidation => "consolidation",
            PatternFamily::Triangle => "triangle",
            PatternFamily::Flag => "flag",
            PatternFamily::Pennant => "pennant",
            PatternFamily::Wedge => "wedge",
            PatternFamily::Channel => "channel",
            PatternFamily::Rectangle => "rectangle",
            PatternFamily::Candlestick => "candlestick",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternOverlay {
    pub name: String,
    pub family: PatternFamily,
    pub start_index: usize,
    pub end_index: usize,
    pub upper_start: f64,
    pub upper_end: f64,
    pub lower_start: f64,
    pub lower_end: f64,
    pub score: f64,
}

impl PatternOverlay {
    /// Builds an unscored overlay over `[start, end]` of a series of length `len`.
    ///
    /// Panics if the span is inverted or leaves the series.
    pub fn new(
        name: &str,
        family: PatternFamily,
        (start, end): (usize, usize),
        (upper_start, upper_end): (f64, f64),
        (lower_start, lower_end): (f64, f64),
        len: usize,
    ) -> Self {
        assert!(
            start <= end && end < len,
            "overlay {name} span {start}..={end} outside series of {len} bars"
        );
        Self {
            name: name.to_string(),
            family,
            start_index: start,
            end_index: end,
            upper_start,
            upper_end,
            lower_start,
            lower_end,
            score: 0.0,
        }
    }

    /// A one-bar overlay whose envelope is that bar's high/low.
    pub fn single_bar(name: &str, family: PatternFamily, bars: &[Bar], index: usize) -> Self {
        let bar = &bars[index];
        Self::new(
            name,
            family,
            (index, index),
            (bar.high, bar.high),
            (bar.low, bar.low),
            bars.len(),
        )
    }

    pub fn width(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub consolidation_window: usize,
    pub consolidation_max_range_pct: f64,
    pub triangle_window: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            consolidation_window: 20,
            consolidation_max_range_pct: 0.04,
            triangle_window: 30,
        }
    }
}

/// Runs every detector and drops duplicate (name, start, end) candidates,
/// keeping the first in detection order.
pub fn detect_all(bars: &[Bar], config: &DetectionConfig) -> Vec<PatternOverlay> {
    let mut candidates = Vec::new();
    candidates.extend(consolidation::detect_consolidation(
        bars,
        config.consolidation_window,
        config.consolidation_max_range_pct,
    ));
    candidates.extend(triangle::detect_primary_triangle(
        bars,
        config.triangle_window,
    ));
    candidates.extend(continuation::detect_continuation(bars));
    candidates.extend(candlestick::detect_candlesticks(bars));
    dedup_overlays(candidates)
}

pub fn dedup_overlays(overlays: Vec<PatternOverlay>) -> Vec<PatternOverlay> {
    let mut seen = HashSet::new();
    overlays
        .into_iter()
        .filter(|o| seen.insert((o.name.clone(), o.start_index, o.end_index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(name: &str, start: usize, end: usize) -> PatternOverlay {
        PatternOverlay::new(
            name,
            PatternFamily::Flag,
            (start, end),
            (2.0, 2.0),
            (1.0, 1.0),
            50,
        )
    }

    #[test]
    fn family_bias() {
        assert_eq!(PatternFamily::Triangle.bias(), 1.08);
        assert_eq!(PatternFamily::Pennant.bias(), 1.08);
        assert_eq!(PatternFamily::Flag.bias(), 1.08);
        assert_eq!(PatternFamily::Wedge.bias(), 1.0);
        assert_eq!(PatternFamily::Candlestick.bias(), 1.0);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut first = overlay("bull_flag", 13, 27);
        first.upper_start = 99.0;
        let out = dedup_overlays(vec![
            first,
            overlay("bull_flag", 13, 27),
            overlay("bull_flag", 14, 28),
            overlay("bear_flag", 13, 27),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].upper_start, 99.0);
    }

    #[test]
    #[should_panic(expected = "outside series")]
    fn out_of_bounds_overlay_panics() {
        overlay("bull_flag", 10, 50);
    }

    #[test]
    #[should_panic]
    fn inverted_span_panics() {
        overlay("bull_flag", 10, 9);
    }

    #[test]
    fn family_serializes_snake_case() {
        let json = serde_json::to_string(&PatternFamily::Candlestick).unwrap();
        assert_eq!(json, "\"candlestick\"");
    }

    #[test]
    fn empty_series_detects_nothing() {
        assert!(detect_all(&[], &DetectionConfig::default()).is_empty());
    }
}
