//! Period and interval vocabulary.
//!
//! A period is how far back a fetch reaches; an interval is the bar size.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day1,
    Day5,
    Month1,
    Month3,
    Month6,
    Year1,
    Year2,
    Year5,
    Year10,
    YearToDate,
    Max,
}

const PERIODS: [(Period, &str); 11] = [
    (Period::Day1, "1d"),
    (Period::Day5, "5d"),
    (Period::Month1, "1mo"),
    (Period::Month3, "3mo"),
    (Period::Month6, "6mo"),
    (Period::Year1, "1y"),
    (Period::Year2, "2y"),
    (Period::Year5, "5y"),
    (Period::Year10, "10y"),
    (Period::YearToDate, "ytd"),
    (Period::Max, "max"),
];

impl Period {
    pub fn as_str(self) -> &'static str {
        PERIODS
            .iter()
            .find(|(p, _)| *p == self)
            .map(|(_, s)| *s)
            .unwrap_or("max")
    }

    /// Earliest bar time covered when the period ends at `now`. `None` means unbounded.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Period::Day1 => 1,
            Period::Day5 => 5,
            Period::Month1 => 30,
            Period::Month3 => 91,
            Period::Month6 => 182,
            Period::Year1 => 365,
            Period::Year2 => 730,
            Period::Year5 => 1826,
            Period::Year10 => 3652,
            Period::YearToDate => {
                return Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0).single();
            }
            Period::Max => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct TimeframeError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Period {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PERIODS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(p, _)| *p)
            .ok_or_else(|| TimeframeError {
                kind: "period",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Min1,
    Min2,
    Min5,
    Min15,
    Min30,
    Min60,
    Min90,
    Hour1,
    Day1,
    Day5,
    Week1,
    Month1,
    Month3,
}

const INTERVALS: [(Interval, &str); 13] = [
    (Interval::Min1, "1m"),
    (Interval::Min2, "2m"),
    (Interval::Min5, "5m"),
    (Interval::Min15, "15m"),
    (Interval::Min30, "30m"),
    (Interval::Min60, "60m"),
    (Interval::Min90, "90m"),
    (Interval::Hour1, "1h"),
    (Interval::Day1, "1d"),
    (Interval::Day5, "5d"),
    (Interval::Week1, "1wk"),
    (Interval::Month1, "1mo"),
    (Interval::Month3, "3mo"),
];

impl Interval {
    pub fn as_str(self) -> &'static str {
        INTERVALS
            .iter()
            .find(|(i, _)| *i == self)
            .map(|(_, s)| *s)
            .unwrap_or("1d")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Case-sensitive: "1m" is a minute, never a month.
        let s = s.trim();
        INTERVALS
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(i, _)| *i)
            .ok_or_else(|| TimeframeError {
                kind: "interval",
                value: s.to_string(),
            })
    }
}
