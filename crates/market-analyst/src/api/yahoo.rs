//! Yahoo Finance adapter

use super::{Granularity, Headline, MarketDataProvider, RawBar, RawBarSet, RawStamp};
use crate::error::{AnalystError, Result};
use crate::retry::with_timeout;
use crate::timeframe::{Interval, Lookback};
use async_trait::async_trait;
use chrono::DateTime;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use yahoo_finance_api::{self as yahoo, YQuoteSummary, YahooError};

const PROVIDER: &str = "yahoo";

/// Yahoo Finance client
///
/// Every call builds a fresh `YahooConnector`, which negotiates its own
/// session cookie and crumb for the summary endpoint.
pub struct YahooFinanceClient {
    timeout: Duration,
}

impl YahooFinanceClient {
    /// Create a client whose every call is bounded by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| AnalystError::upstream(PROVIDER, e))
    }
}

/// Sort a library error into "nothing to show" versus "transport trouble"
///
/// Yahoo answers an unknown ticker with an API error body, which must not
/// be retried.
fn classify(symbol: &str, err: YahooError) -> AnalystError {
    match err {
        YahooError::ApiError(_)
        | YahooError::NoResult
        | YahooError::NoQuotes
        | YahooError::DataInconsistency => AnalystError::unavailable(symbol, err.to_string()),
        other => AnalystError::upstream(PROVIDER, other),
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    #[instrument(skip(self, window, interval), fields(range = window.as_range(), interval = interval.as_str()))]
    async fn get_bars(&self, symbol: &str, window: Lookback, interval: Interval) -> Result<RawBarSet> {
        let granularity = Granularity::from(interval);

        with_timeout(PROVIDER, self.timeout, async {
            let response = Self::connector()?
                .get_quote_range(symbol, interval.as_str(), window.as_range())
                .await
                .map_err(|e| classify(symbol, e))?;

            // An answer without a quote block means "no bars", not a transport failure
            let quotes = match response.quotes() {
                Ok(quotes) => quotes,
                Err(e) => {
                    debug!(symbol, error = %e, "Response carried no quotes");
                    return Ok(RawBarSet::empty(granularity));
                }
            };

            let rows: Vec<RawBar> = quotes
                .iter()
                .filter_map(|q| {
                    Some(RawBar {
                        stamp: stamp_for(q.timestamp, granularity)?,
                        open: q.open,
                        high: q.high,
                        low: q.low,
                        close: q.close,
                        volume: q.volume,
                    })
                })
                .collect();

            debug!(symbol, rows = rows.len(), "Fetched bars");
            Ok(RawBarSet { granularity, rows })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, symbol: &str) -> Result<Option<String>> {
        let summary = with_timeout(PROVIDER, self.timeout, async {
            let mut connector = Self::connector()?;
            match connector.get_ticker_info(symbol).await {
                Ok(info) => Ok(business_summary(info)),
                Err(e) => match classify(symbol, e) {
                    AnalystError::DataUnavailable { .. } => Ok(None),
                    err => Err(err),
                },
            }
        })
        .await?;
        if summary.is_none() {
            warn!(symbol, "No business summary available");
        }
        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn get_news(&self, symbol: &str) -> Result<Vec<Headline>> {
        with_timeout(PROVIDER, self.timeout, async {
            let result = Self::connector()?
                .search_ticker(symbol)
                .await
                .map_err(|e| classify(symbol, e))?;

            Ok(result
                .news
                .into_iter()
                .map(|item| headline_from_title(item.title))
                .collect())
        })
        .await
    }
}

/// Tag a unix timestamp according to the declared granularity
fn stamp_for(secs: i64, granularity: Granularity) -> Option<RawStamp> {
    let instant = DateTime::from_timestamp(secs, 0)?;
    Some(match granularity {
        Granularity::Intraday => RawStamp::DateTime(instant),
        Granularity::Daily => RawStamp::Date(instant.date_naive()),
    })
}

fn headline_from_title(title: String) -> Headline {
    if title.trim().is_empty() {
        Headline::new("News")
    } else {
        Headline::new(title.trim())
    }
}

fn business_summary(info: YQuoteSummary) -> Option<String> {
    info.quote_summary?
        .result?
        .into_iter()
        .next()?
        .asset_profile?
        .long_business_summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
