//! Timeframe tokens and the fixed granularity table
//!
//! [`Timeframe::resolve`] is the only place that decides which lookback
//! window and sampling interval a chart uses. Nothing downstream infers
//! granularity on its own.

use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart timeframe selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    /// One trading day of 5-minute bars
    #[default]
    #[serde(rename = "1d")]
    IntradayFine,
    /// Five trading days of 15-minute bars
    #[serde(rename = "5d")]
    IntradayCoarse,
    /// One month of daily bars
    #[serde(rename = "1mo")]
    Month1,
    /// Three months of daily bars
    #[serde(rename = "3mo")]
    Month3,
    /// One year of daily bars
    #[serde(rename = "1y")]
    Year1,
    /// Five years of daily bars
    #[serde(rename = "5y")]
    Year5,
}

/// How far back a chart reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lookback {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    OneYear,
    FiveYears,
}

/// Sampling interval of a single bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    FiveMinutes,
    FifteenMinutes,
    OneDay,
}

/// A (lookback window, sampling interval) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub window: Lookback,
    pub interval: Interval,
}

impl Timeframe {
    /// All tokens, in display order
    pub const ALL: [Timeframe; 6] = [
        Timeframe::IntradayFine,
        Timeframe::IntradayCoarse,
        Timeframe::Month1,
        Timeframe::Month3,
        Timeframe::Year1,
        Timeframe::Year5,
    ];

    /// Canonical token ("1d", "5d", ...)
    pub fn token(&self) -> &'static str {
        match self {
            Self::IntradayFine => "1d",
            Self::IntradayCoarse => "5d",
            Self::Month1 => "1mo",
            Self::Month3 => "3mo",
            Self::Year1 => "1y",
            Self::Year5 => "5y",
        }
    }

    /// Button label shown next to the chart
    pub fn label(&self) -> &'static str {
        match self {
            Self::IntradayFine => "1D",
            Self::IntradayCoarse => "1W",
            Self::Month1 => "1M",
            Self::Month3 => "3M",
            Self::Year1 => "1Y",
            Self::Year5 => "5Y",
        }
    }

    /// Resolve to the fixed (window, interval) pair
    pub fn resolve(&self) -> Resolution {
        let (window, interval) = match self {
            Self::IntradayFine => (Lookback::OneDay, Interval::FiveMinutes),
            Self::IntradayCoarse => (Lookback::FiveDays, Interval::FifteenMinutes),
            Self::Month1 => (Lookback::OneMonth, Interval::OneDay),
            Self::Month3 => (Lookback::ThreeMonths, Interval::OneDay),
            Self::Year1 => (Lookback::OneYear, Interval::OneDay),
            Self::Year5 => (Lookback::FiveYears, Interval::OneDay),
        };
        Resolution { window, interval }
    }

    /// Whether the chart should hide weekend gaps on its time axis
    ///
    /// At one and five years the gaps are visually negligible.
    pub fn suppress_weekend_gaps(&self) -> bool {
        !matches!(self, Self::Year1 | Self::Year5)
    }

    /// Whether bars are finer than one day
    pub fn is_intraday(&self) -> bool {
        self.resolve().interval.is_intraday()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Timeframe {
    type Err = AnalystError;

    /// Accepts tokens and button labels, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "1d" => Ok(Self::IntradayFine),
            "5d" | "1w" => Ok(Self::IntradayCoarse),
            "1mo" | "1m" => Ok(Self::Month1),
            "3mo" | "3m" => Ok(Self::Month3),
            "1y" => Ok(Self::Year1),
            "5y" => Ok(Self::Year5),
            _ => Err(AnalystError::InvalidTimeframe(s.to_string())),
        }
    }
}

impl Lookback {
    /// Yahoo chart `range` parameter
    pub fn as_range(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
        }
    }
}

impl Interval {
    /// Yahoo chart `interval` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneDay => "1d",
        }
    }

    /// Whether bars are finer than one day
    pub fn is_intraday(&self) -> bool {
        !matches!(self, Self::OneDay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_table() {
        let fine = Timeframe::IntradayFine.resolve();
        assert_eq!(fine.window, Lookback::OneDay);
        assert_eq!(fine.interval, Interval::FiveMinutes);

        let coarse = Timeframe::IntradayCoarse.resolve();
        assert_eq!(coarse.window, Lookback::FiveDays);
        assert_eq!(coarse.interval, Interval::FifteenMinutes);

        let five_years = Timeframe::Year5.resolve();
        assert_eq!(five_years.window, Lookback::FiveYears);
        assert_eq!(five_years.interval, Interval::OneDay);

        for tf in [Timeframe::Month1, Timeframe::Month3, Timeframe::Year1] {
            assert_eq!(tf.resolve().interval, Interval::OneDay);
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.resolve(), tf.resolve());
            assert_eq!(tf.resolve().window.as_range(), tf.token());
        }
    }

    #[test]
    fn test_gap_suppression() {
        let suppressed: Vec<_> = Timeframe::ALL
            .into_iter()
            .filter(Timeframe::suppress_weekend_gaps)
            .collect();
        assert_eq!(
            suppressed,
            vec![
                Timeframe::IntradayFine,
                Timeframe::IntradayCoarse,
                Timeframe::Month1,
                Timeframe::Month3
            ]
        );
    }

    #[test]
    fn test_parse_tokens_and_labels() {
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::IntradayFine);
        assert_eq!("1D".parse::<Timeframe>().unwrap(), Timeframe::IntradayFine);
        assert_eq!("1W".parse::<Timeframe>().unwrap(), Timeframe::IntradayCoarse);
        assert_eq!("3mo".parse::<Timeframe>().unwrap(), Timeframe::Month3);
        assert_eq!(" 5Y ".parse::<Timeframe>().unwrap(), Timeframe::Year5);
        assert!(matches!(
            "2y".parse::<Timeframe>(),
            Err(AnalystError::InvalidTimeframe(t)) if t == "2y"
        ));
    }

    #[test]
    fn test_token_round_trip() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.token().parse::<Timeframe>().unwrap(), tf);
            assert_eq!(tf.label().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn test_serde_uses_tokens() {
        assert_eq!(serde_json::to_string(&Timeframe::Month3).unwrap(), "\"3mo\"");
        let tf: Timeframe = serde_json::from_str("\"1y\"").unwrap();
        assert_eq!(tf, Timeframe::Year1);
    }

    #[test]
    fn test_intraday_flags() {
        assert!(Timeframe::IntradayFine.is_intraday());
        assert!(Timeframe::IntradayCoarse.is_intraday());
        assert!(!Timeframe::Month1.is_intraday());
        assert!(Interval::FifteenMinutes.is_intraday());
    }
}
