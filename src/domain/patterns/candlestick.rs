//! Single- and multi-bar candlestick patterns.
//!
//! All checks are fixed ratios of body, range and shadow sizes. A match is reported as
//! a one-bar overlay on the pattern's final bar.

use crate::domain::derived::ratio;
use crate::domain::ohlcv::Bar;
use crate::domain::patterns::{PatternFamily, PatternOverlay};

const TINY_BODY: f64 = 0.1;
const SMALL_BODY: f64 = 0.3;
const SOLID_BODY: f64 = 0.5;
const LONG_BODY: f64 = 0.65;
const SHADOW_DOMINANT: f64 = 2.2;
const MARUBOZU_SHADOW: f64 = 0.05;
const TWEEZER_TOLERANCE: f64 = 0.001;
const TREND_LOOKBACK: usize = 3;
const VOLATILITY_LOOKBACK: usize = 10;
const FLAT_VOLATILITY_PCT: f64 = 0.015;
const REJECTION_RANGE_MULT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
}

pub fn detect_candlesticks(bars: &[Bar]) -> Vec<PatternOverlay> {
    let mut found = Vec::new();
    for i in 0..bars.len() {
        let names = single_bar(bars, i)
            .into_iter()
            .chain(two_bar(bars, i))
            .chain(three_bar(bars, i));
        for name in names {
            found.push(PatternOverlay::single_bar(
                name,
                PatternFamily::Candlestick,
                bars,
                i,
            ));
        }
    }
    found
}

/// Direction of closes over the bars before `i`.
fn prior_trend(bars: &[Bar], i: usize) -> Option<Trend> {
    if i < TREND_LOOKBACK {
        return None;
    }
    let then = bars[i - TREND_LOOKBACK].close;
    let prev = bars[i - 1].close;
    if prev > then {
        Some(Trend::Up)
    } else if prev < then {
        Some(Trend::Down)
    } else {
        None
    }
}

fn single_bar(bars: &[Bar], i: usize) -> Vec<&'static str> {
    let b = &bars[i];
    let range = b.range();
    if range <= 0.0 {
        return Vec::new();
    }
    let body = b.body();
    let body_ratio = body / range;
    let upper = b.upper_shadow();
    let lower = b.lower_shadow();
    let mut names = Vec::new();

    if body_ratio < TINY_BODY {
        let up = upper / range;
        let lo = lower / range;
        names.push(if up < 0.1 && lo > 0.6 {
            "dragonfly_doji"
        } else if lo < 0.1 && up > 0.6 {
            "gravestone_doji"
        } else if up > 0.35 && lo > 0.35 {
            "long_legged_doji"
        } else {
            "doji"
        });
        return names;
    }

    let trend = prior_trend(bars, i);
    if lower > SHADOW_DOMINANT * body && upper <= body {
        match trend {
            Some(Trend::Down) => names.push("hammer"),
            Some(Trend::Up) => names.push("hanging_man"),
            None => {}
        }
    }
    if upper > SHADOW_DOMINANT * body && lower <= body {
        match trend {
            Some(Trend::Down) => names.push("inverted_hammer"),
            Some(Trend::Up) => names.push("shooting_star"),
            None => {}
        }
    }

    if body_ratio > LONG_BODY
        && upper / range < MARUBOZU_SHADOW
        && lower / range < MARUBOZU_SHADOW
    {
        names.push(if b.is_bullish() {
            "bullish_marubozu"
        } else {
            "bearish_marubozu"
        });
    }

    if body_ratio <= SMALL_BODY && upper > body && lower > body {
        names.push("spinning_top");
    }

    if is_wick_rejection(bars, i) {
        names.push("wick_rejection");
    }

    names
}

/// A long wick on an unusually wide bar after a stretch of quiet bars.
fn is_wick_rejection(bars: &[Bar], i: usize) -> bool {
    if i < VOLATILITY_LOOKBACK {
        return false;
    }
    let lookback = &bars[i - VOLATILITY_LOOKBACK..i];
    let n = lookback.len() as f64;
    let avg_range = lookback.iter().map(Bar::range).sum::<f64>() / n;
    let avg_range_pct = lookback
        .iter()
        .map(|b| ratio(b.range(), b.close))
        .sum::<f64>()
        / n;

    let b = &bars[i];
    let wick = b.upper_shadow().max(b.lower_shadow());
    avg_range_pct <= FLAT_VOLATILITY_PCT
        && b.range() >= REJECTION_RANGE_MULT * avg_range
        && wick > SHADOW_DOMINANT * b.body()
}

fn two_bar(bars: &[Bar], i: usize) -> Vec<&'static str> {
    if i < 1 {
        return Vec::new();
    }
    let prev = &bars[i - 1];
    let curr = &bars[i];
    let mut names = Vec::new();

    if prev.is_bearish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
        && curr.body() > prev.body()
    {
        names.push("bullish_engulfing");
    }
    if prev.is_bullish()
        && curr.is_bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
        && curr.body() > prev.body()
    {
        names.push("bearish_engulfing");
    }

    if prev.is_bearish()
        && prev.body_ratio() > SOLID_BODY
        && curr.is_bullish()
        && curr.open < prev.close
        && curr.close > prev.body_midpoint()
        && curr.close < prev.open
    {
        names.push("piercing_line");
    }
    if prev.is_bullish()
        && prev.body_ratio() > SOLID_BODY
        && curr.is_bearish()
        && curr.open > prev.close
        && curr.close < prev.body_midpoint()
        && curr.close > prev.open
    {
        names.push("dark_cloud_cover");
    }

    let inside = curr.open.max(curr.close) < prev.open.max(prev.close)
        && curr.open.min(curr.close) > prev.open.min(prev.close);
    if prev.body_ratio() > LONG_BODY && inside && curr.body() < prev.body() * 0.5 {
        if prev.is_bearish() && curr.is_bullish() {
            names.push("bullish_harami");
        } else if prev.is_bullish() && curr.is_bearish() {
            names.push("bearish_harami");
        }
    }

    if prev.is_bullish()
        && curr.is_bearish()
        && (curr.high - prev.high).abs() <= TWEEZER_TOLERANCE * prev.high
    {
        names.push("tweezer_top");
    }
    if prev.is_bearish()
        && curr.is_bullish()
        && (curr.low - prev.low).abs() <= TWEEZER_TOLERANCE * prev.low
    {
        names.push("tweezer_bottom");
    }

    names
}

fn three_bar(bars: &[Bar], i: usize) -> Vec<&'static str> {
    if i < 2 {
        return Vec::new();
    }
    let a = &bars[i - 2];
    let b = &bars[i - 1];
    let c = &bars[i];
    let mut names = Vec::new();

    let star = b.body_ratio() < SMALL_BODY;
    if a.is_bearish()
        && a.body_ratio() > LONG_BODY
        && star
        && b.open.max(b.close) <= a.close
        && c.is_bullish()
        && c.close > a.body_midpoint()
    {
        names.push("morning_star");
    }
    if a.is_bullish()
        && a.body_ratio() > LONG_BODY
        && star
        && b.open.min(b.close) >= a.close
        && c.is_bearish()
        && c.close < a.body_midpoint()
    {
        names.push("evening_star");
    }

    let soldiers = [a, b, c]
        .iter()
        .all(|x| x.is_bullish() && x.body_ratio() > SOLID_BODY)
        && b.close > a.close
        && c.close > b.close
        && b.open > a.open
        && b.open <= a.close
        && c.open > b.open
        && c.open <= b.close;
    if soldiers {
        names.push("three_white_soldiers");
    }

    let crows = [a, b, c]
        .iter()
        .all(|x| x.is_bearish() && x.body_ratio() > SOLID_BODY)
        && b.close < a.close
        && c.close < b.close
        && b.open < a.open
        && b.open >= a.close
        && c.open < b.open
        && c.open >= b.close;
    if crows {
        names.push("three_black_crows");
    }

    names
}
