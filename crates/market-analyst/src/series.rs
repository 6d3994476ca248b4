//! Candlestick series normalization
//!
//! Turns whatever a [`MarketDataProvider`] returns into an ordered,
//! duplicate-free series of consistent OHLC bars.

use crate::api::{Granularity, MarketDataProvider, RawBar, RawBarSet, RawStamp};
use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::retry::RetryPolicy;
use crate::timeframe::Timeframe;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Timestamp of a normalized bar
///
/// Daily series hold calendar dates, intraday series hold UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum BarTime {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

impl BarTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(d) => *d,
            Self::Instant(dt) => dt.date_naive(),
        }
    }

    fn unify(stamp: RawStamp, granularity: Granularity) -> Self {
        match (granularity, stamp) {
            (Granularity::Daily, RawStamp::Date(d)) => Self::Date(d),
            (Granularity::Daily, RawStamp::DateTime(dt)) => Self::Date(dt.date_naive()),
            (Granularity::Intraday, RawStamp::DateTime(dt)) => Self::Instant(dt),
            (Granularity::Intraday, RawStamp::Date(d)) => Self::Instant(d.and_time(NaiveTime::MIN).and_utc()),
        }
    }
}

impl fmt::Display for BarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Instant(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
        }
    }
}

/// One validated candlestick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub time: BarTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Validate and repair a raw row; `None` if any price is unusable
    fn from_raw(raw: &RawBar, granularity: Granularity) -> Option<Self> {
        let prices = [raw.open, raw.high, raw.low, raw.close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }

        let high = prices.iter().copied().fold(f64::MIN, f64::max);
        let low = prices.iter().copied().fold(f64::MAX, f64::min);

        Some(Self {
            time: BarTime::unify(raw.stamp, granularity),
            open: raw.open,
            high,
            low,
            close: raw.close,
            volume: raw.volume,
        })
    }
}

/// Chart-ready series for one (symbol, timeframe) selection
///
/// Built fresh for every selection change and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<PriceBar>,
    suppress_weekend_gaps: bool,
}

/// Headline figures for a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub first: BarTime,
    pub last: BarTime,
    pub bars: usize,
    pub min_low: f64,
    pub max_high: f64,
    pub last_close: f64,
    /// Last close minus first open
    pub change: f64,
    /// `change` relative to the first open, in percent; `None` when that open is zero
    pub change_pct: Option<f64>,
}

impl NormalizedSeries {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Whether the chart axis should skip non-trading days
    pub fn suppress_weekend_gaps(&self) -> bool {
        self.suppress_weekend_gaps
    }

    pub fn summary(&self) -> SeriesSummary {
        // Construction guarantees at least one bar
        let first = &self.bars[0];
        let last = &self.bars[self.bars.len() - 1];
        let change = last.close - first.open;

        SeriesSummary {
            first: first.time,
            last: last.time,
            bars: self.bars.len(),
            min_low: self.bars.iter().map(|b| b.low).fold(f64::MAX, f64::min),
            max_high: self.bars.iter().map(|b| b.high).fold(f64::MIN, f64::max),
            last_close: last.close,
            change,
            change_pct: (first.open > 0.0).then(|| change / first.open * 100.0),
        }
    }
}

/// Normalize a provider response for `symbol` at `timeframe`
pub fn normalize(symbol: &str, timeframe: Timeframe, raw: RawBarSet) -> Result<NormalizedSeries> {
    let expected = Granularity::from(timeframe.resolve().interval);
    if raw.granularity != expected {
        warn!(symbol, %timeframe, declared = ?raw.granularity, "Provider granularity differs from timeframe");
    }

    let received = raw.rows.len();
    let mut bars: Vec<PriceBar> = raw
        .rows
        .iter()
        .filter_map(|row| PriceBar::from_raw(row, raw.granularity))
        .collect();

    if bars.len() < received {
        debug!(symbol, dropped = received - bars.len(), "Dropped invalid rows");
    }
    if bars.is_empty() {
        return Err(AnalystError::unavailable(
            symbol,
            format!("no usable bars for timeframe {timeframe}"),
        ));
    }

    // Stable, so later duplicates stay later
    bars.sort_by_key(|b| b.time);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(prev) if prev.time == bar.time => *prev = bar,
            _ => deduped.push(bar),
        }
    }

    Ok(NormalizedSeries {
        symbol: symbol.to_string(),
        timeframe,
        bars: deduped,
        suppress_weekend_gaps: timeframe.suppress_weekend_gaps(),
    })
}

/// Fetches bars through a provider and normalizes them
pub struct SeriesNormalizer {
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
}

impl SeriesNormalizer {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &AnalystConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch and normalize the series for a (symbol, timeframe) selection
    #[instrument(skip(self, timeframe), fields(timeframe = %timeframe))]
    pub async fn fetch_series(&self, symbol: &str, timeframe: Timeframe) -> Result<NormalizedSeries> {
        let resolution = timeframe.resolve();
        let raw = self
            .retry
            .execute("get_bars", || {
                self.provider
                    .get_bars(symbol, resolution.window, resolution.interval)
            })
            .await?;

        let series = normalize(symbol, timeframe, raw)?;
        info!(symbol, bars = series.bars.len(), "Series ready");
        Ok(series)
    }
}
