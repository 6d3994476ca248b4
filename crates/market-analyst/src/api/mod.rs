//! Market-data provider boundary
//!
//! Providers answer with an explicit schema: a [`RawBarSet`] declares its
//! granularity once and every row carries a tagged [`RawStamp`]. The
//! series normalizer never guesses which kind of timestamp it is holding.

pub mod yahoo;

use crate::error::Result;
use crate::timeframe::{Interval, Lookback};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use yahoo::YahooFinanceClient;

/// Whether a bar set is sampled within the day or once per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Intraday,
    Daily,
}

impl From<Interval> for Granularity {
    fn from(interval: Interval) -> Self {
        if interval.is_intraday() {
            Self::Intraday
        } else {
            Self::Daily
        }
    }
}

/// Timestamp exactly as the provider reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RawStamp {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

/// One unvalidated provider row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub stamp: RawStamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Provider response for one bar request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBarSet {
    pub granularity: Granularity,
    pub rows: Vec<RawBar>,
}

impl RawBarSet {
    pub fn empty(granularity: Granularity) -> Self {
        Self {
            granularity,
            rows: Vec::new(),
        }
    }
}

/// A news headline attached to a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
}

impl Headline {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

/// Source of bars, company profiles and headlines
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Bars for `symbol` over `window`, sampled every `interval`
    async fn get_bars(&self, symbol: &str, window: Lookback, interval: Interval) -> Result<RawBarSet>;

    /// Long-form business summary, `None` when the provider has none
    async fn get_profile(&self, symbol: &str) -> Result<Option<String>>;

    /// Recent headlines, most recent first
    async fn get_news(&self, symbol: &str) -> Result<Vec<Headline>>;
}
