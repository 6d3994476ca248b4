//! Per-turn grounding context

use crate::api::{Headline, MarketDataProvider};
use crate::error::Result;
use crate::retry::with_timeout;
use std::time::Duration;
use tracing::{debug, instrument};

/// Summary used when the provider has none
pub const NO_SUMMARY: &str = "No company summary available.";

/// Headline block used when the provider has no news
pub const NO_NEWS: &str = "No recent news.";

/// Live background for one chat turn
///
/// Fetched fresh on every turn and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingContext {
    symbol: String,
    summary: String,
    headlines: Vec<String>,
}

impl GroundingContext {
    /// Build a context, applying placeholders and keeping at most `max_headlines`
    pub fn new(
        symbol: impl Into<String>,
        summary: Option<String>,
        headlines: Vec<Headline>,
        max_headlines: usize,
    ) -> Self {
        let summary = summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        Self {
            symbol: symbol.into(),
            summary,
            headlines: headlines
                .into_iter()
                .take(max_headlines)
                .map(|h| h.title)
                .collect(),
        }
    }

    /// Fetch profile and news for `symbol`, each bounded by `timeout`
    #[instrument(skip(provider, timeout))]
    pub async fn fetch(
        provider: &dyn MarketDataProvider,
        symbol: &str,
        max_headlines: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let (summary, news) = tokio::try_join!(
            with_timeout("market-data", timeout, provider.get_profile(symbol)),
            with_timeout("market-data", timeout, provider.get_news(symbol)),
        )?;
        debug!(
            symbol,
            has_summary = summary.is_some(),
            headlines = news.len(),
            "Fetched grounding context"
        );
        Ok(Self::new(symbol, summary, news, max_headlines))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn headlines(&self) -> &[String] {
        &self.headlines
    }

    /// Headlines as a dashed list, or [`NO_NEWS`]
    pub fn headline_block(&self) -> String {
        if self.headlines.is_empty() {
            return NO_NEWS.to_string();
        }
        self.headlines
            .iter()
            .map(|title| format!("- {title}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketDataProvider;
    use crate::error::AnalystError;

    fn headlines(n: usize) -> Vec<Headline> {
        (1..=n).map(|i| Headline::new(format!("Headline {i}"))).collect()
    }

    #[test]
    fn test_keeps_first_three_headlines() {
        let context = GroundingContext::new("AAPL", None, headlines(5), 3);
        assert_eq!(context.headlines(), ["Headline 1", "Headline 2", "Headline 3"]);
        assert_eq!(
            context.headline_block(),
            "- Headline 1\n- Headline 2\n- Headline 3"
        );
    }

    #[test]
    fn test_placeholders() {
        let context = GroundingContext::new("AAPL", Some("   ".to_string()), vec![], 3);
        assert_eq!(context.summary(), NO_SUMMARY);
        assert_eq!(context.headline_block(), NO_NEWS);
    }

    #[tokio::test]
    async fn test_fetch_from_provider() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_get_profile()
            .times(1)
            .returning(|_| Ok(Some("Makes software.".to_string())));
        provider
            .expect_get_news()
            .times(1)
            .returning(|_| Ok(headlines(4)));

        let context = GroundingContext::fetch(&provider, "MSFT", 3, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(context.symbol(), "MSFT");
        assert_eq!(context.summary(), "Makes software.");
        assert_eq!(context.headlines().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_propagates_failure() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_get_profile().returning(|_| Ok(None));
        provider
            .expect_get_news()
            .returning(|_| Err(AnalystError::upstream("yahoo", "search failed")));

        let err = GroundingContext::fetch(&provider, "MSFT", 3, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalystError::UpstreamError { .. }));
    }
}
