//! Continuation patterns over a sliding 28-bar window.
//!
//! Each window is split into a 13-bar pole and a 15-bar body. The body's highs and
//! lows are fitted with regression lines; slopes are expressed in percent of the body
//! midpoint per bar so the thresholds do not depend on the price level.
//!
//! | shape                 | condition                                              |
//! |-----------------------|--------------------------------------------------------|
//! | bull/bear pennant     | strong pole, upper slope < -flat, lower slope > flat   |
//! | bull/bear flag        | strong pole, parallel slopes not extending the pole,   |
//! |                       | body move under half the pole move                     |
//! | symmetric triangle    | upper < -flat, lower > flat                            |
//! | ascending triangle    | upper flat, lower > flat                               |
//! | descending triangle   | upper < -flat, lower flat                              |
//! | rising wedge          | both > flat, not parallel, lower steeper               |
//! | falling wedge         | both < -flat, not parallel, upper steeper              |
//! | parallel channel      | parallel, not flat                                     |
//! | rectangle             | both flat, range / midpoint < 4%                       |
//!
//! flat: |slope| < 0.2; parallel: |upper - lower| < 0.2; strong pole: |move| >= 5%.

use crate::domain::derived::ratio;
use crate::domain::ohlcv::Bar;
use crate::domain::patterns::regression::{LinearFit, linear_fit};
use crate::domain::patterns::{PatternFamily, PatternOverlay, dedup_overlays};

pub const WINDOW: usize = 28;
pub const POLE: usize = 13;
pub const BODY: usize = WINDOW - POLE;

const FLAT_SLOPE: f64 = 0.2;
const STRONG_POLE_PCT: f64 = 0.05;
const RECTANGLE_RANGE_PCT: f64 = 0.04;

struct BodyShape {
    upper: LinearFit,
    lower: LinearFit,
    upper_slope: f64,
    lower_slope: f64,
    range_pct: f64,
    body_move: f64,
}

pub fn detect_continuation(bars: &[Bar]) -> Vec<PatternOverlay> {
    if bars.len() < WINDOW {
        return Vec::new();
    }

    let mut found = Vec::new();
    for start in 0..=bars.len() - WINDOW {
        let pole = &bars[start..start + POLE];
        let body = &bars[start + POLE..start + WINDOW];
        let Some(shape) = measure_body(body) else {
            continue;
        };
        let Some((name, family)) = classify(pole, &shape) else {
            continue;
        };
        let last = (BODY - 1) as f64;
        found.push(PatternOverlay::new(
            name,
            family,
            (start + POLE, start + WINDOW - 1),
            (shape.upper.value_at(0.0), shape.upper.value_at(last)),
            (shape.lower.value_at(0.0), shape.lower.value_at(last)),
            bars.len(),
        ));
    }
    dedup_overlays(found)
}

fn measure_body(body: &[Bar]) -> Option<BodyShape> {
    let highs: Vec<f64> = body.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = body.iter().map(|b| b.low).collect();
    let upper = linear_fit(&highs)?;
    let lower = linear_fit(&lows)?;

    let top = highs.iter().copied().fold(f64::MIN, f64::max);
    let bottom = lows.iter().copied().fold(f64::MAX, f64::min);
    let midpoint = (top + bottom) / 2.0;
    if midpoint <= 0.0 {
        return None;
    }

    Some(BodyShape {
        upper,
        lower,
        upper_slope: upper.slope / midpoint * 100.0,
        lower_slope: lower.slope / midpoint * 100.0,
        range_pct: (top - bottom) / midpoint,
        body_move: body[body.len() - 1].close - body[0].close,
    })
}

fn classify(pole: &[Bar], s: &BodyShape) -> Option<(&'static str, PatternFamily)> {
    let flat = |slope: f64| slope.abs() < FLAT_SLOPE;
    let rising = |slope: f64| slope > FLAT_SLOPE;
    let falling = |slope: f64| slope < -FLAT_SLOPE;
    let parallel = (s.upper_slope - s.lower_slope).abs() < FLAT_SLOPE;
    let converging = falling(s.upper_slope) && rising(s.lower_slope);

    let pole_move = pole[pole.len() - 1].close - pole[0].close;
    let pole_pct = ratio(pole_move, pole[0].close);

    if pole_pct.abs() >= STRONG_POLE_PCT {
        let up = pole_pct > 0.0;
        if converging {
            return Some(if up {
                ("bull_pennant", PatternFamily::Pennant)
            } else {
                ("bear_pennant", PatternFamily::Pennant)
            });
        }
        let against_pole = if up {
            s.upper_slope < FLAT_SLOPE
        } else {
            s.lower_slope > -FLAT_SLOPE
        };
        if parallel && against_pole && s.body_move.abs() < pole_move.abs() / 2.0 {
            return Some(if up {
                ("bull_flag", PatternFamily::Flag)
            } else {
                ("bear_flag", PatternFamily::Flag)
            });
        }
    }

    if converging {
        Some(("symmetric_triangle", PatternFamily::Triangle))
    } else if flat(s.upper_slope) && rising(s.lower_slope) {
        Some(("ascending_triangle", PatternFamily::Triangle))
    } else if falling(s.upper_slope) && flat(s.lower_slope) {
        Some(("descending_triangle", PatternFamily::Triangle))
    } else if rising(s.upper_slope) && rising(s.lower_slope) && !parallel {
        (s.lower_slope > s.upper_slope).then_some(("rising_wedge", PatternFamily::Wedge))
    } else if falling(s.upper_slope) && falling(s.lower_slope) && !parallel {
        (s.upper_slope < s.lower_slope).then_some(("falling_wedge", PatternFamily::Wedge))
    } else if parallel && !flat(s.upper_slope) {
        Some(("parallel_channel", PatternFamily::Channel))
    } else if flat(s.upper_slope) && flat(s.lower_slope) && s.range_pct < RECTANGLE_RANGE_PCT {
        Some(("rectangle", PatternFamily::Rectangle))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn pole(rising: bool) -> Vec<Bar> {
        (0..POLE)
            .map(|i| {
                let step = 20.0 * i as f64 / (POLE - 1) as f64;
                let c = if rising { 100.0 + step } else { 120.0 - step };
                bar(i, c, c + 0.5, c - 0.5, c)
            })
            .collect()
    }

    fn body_from(level: f64, upper_step: f64, lower_step: f64, half_width: f64) -> Vec<Bar> {
        (0..BODY)
            .map(|k| {
                let hi = level + half_width + upper_step * k as f64;
                let lo = level - half_width + lower_step * k as f64;
                let mid = (hi + lo) / 2.0;
                bar(POLE + k, mid, hi, lo, mid)
            })
            .collect()
    }

    fn names(overlays: &[PatternOverlay]) -> Vec<&str> {
        overlays.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn bull_flag_after_rising_pole() {
        let mut bars = pole(true);
        bars.extend(body_from(120.0, 0.0, 0.0, 1.0));
        let found = detect_continuation(&bars);
        assert_eq!(names(&found), vec!["bull_flag"]);
        assert_eq!(found[0].start_index, 13);
        assert_eq!(found[0].end_index, 27);
        assert_eq!(found[0].family, PatternFamily::Flag);
    }

    #[test]
    fn bear_flag_after_falling_pole() {
        let mut bars = pole(false);
        bars.extend(body_from(100.0, 0.0, 0.0, 1.0));
        assert_eq!(names(&detect_continuation(&bars)), vec!["bear_flag"]);
    }

    #[test]
    fn bull_pennant_after_rising_pole() {
        let mut bars = pole(true);
        bars.extend(body_from(120.0, -0.3, 0.3, 5.0));
        assert_eq!(names(&detect_continuation(&bars)), vec!["bull_pennant"]);
    }

    #[test]
    fn body_shapes_without_pole() {
        let flat_pole: Vec<Bar> = (0..POLE).map(|i| bar(i, 100.0, 100.5, 99.5, 100.0)).collect();
        let cases = [
            (-0.25, 0.25, 4.0, "symmetric_triangle"),
            (0.0, 0.5, 4.0, "ascending_triangle"),
            (-0.5, 0.0, 4.0, "descending_triangle"),
            (0.4, 0.8, 4.0, "rising_wedge"),
            (-0.8, -0.4, 4.0, "falling_wedge"),
            (0.5, 0.5, 2.0, "parallel_channel"),
            (0.0, 0.0, 1.0, "rectangle"),
        ];
        for (upper, lower, width, expected) in cases {
            let mut bars = flat_pole.clone();
            bars.extend(body_from(100.0, upper, lower, width));
            assert_eq!(names(&detect_continuation(&bars)), vec![expected]);
        }
    }

    #[test]
    fn wide_flat_body_is_not_a_rectangle() {
        let mut bars: Vec<Bar> = (0..POLE).map(|i| bar(i, 100.0, 100.5, 99.5, 100.0)).collect();
        bars.extend(body_from(100.0, 0.0, 0.0, 10.0));
        assert!(detect_continuation(&bars).is_empty());
    }

    #[test]
    fn overlays_stay_in_bounds_when_sliding() {
        let bars: Vec<Bar> = (0..60)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.3;
                bar(i, c - 0.2, c + 1.0, c - 1.0, c)
            })
            .collect();
        for o in detect_continuation(&bars) {
            assert!(o.start_index <= o.end_index);
            assert!(o.end_index < bars.len());
            assert_eq!(o.width(), BODY);
        }
    }

    #[test]
    fn short_series_is_empty() {
        assert!(detect_continuation(&pole(true)).is_empty());
    }
}
