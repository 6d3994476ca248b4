//! Market analyst
//!
//! A sector/asset browser with candlestick charts and a chat assistant that
//! answers questions about the selected stock using live market context.
//!
//! - [`catalog`]: static sector to symbol mapping and the cascading selection
//! - [`timeframe`]: chart timeframes and their fixed (window, interval) table
//! - [`series`]: fetches bars through a [`MarketDataProvider`] and normalizes them
//! - [`conversation`]: grounded chat turns over immutable transcript snapshots
//!
//! # Example
//!
//! ```rust,ignore
//! use market_analyst::{
//!     AnalystConfig, ChatMessage, ConversationManager, ModelClient, SectorCatalog,
//!     SeriesNormalizer, Timeframe, Transcript, YahooFinanceClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AnalystConfig::builder().with_env()?.build()?;
//!     let market = Arc::new(YahooFinanceClient::new(config.request_timeout));
//!
//!     let catalog = SectorCatalog::builtin();
//!     let selection = catalog.select("Technology")?;
//!
//!     let series = SeriesNormalizer::new(market.clone(), &config)
//!         .fetch_series(selection.symbol(), Timeframe::Year1)
//!         .await?;
//!     println!("{} bars", series.bars().len());
//!
//!     let manager = ConversationManager::new(market, ModelClient::from_env(&config)?, &config)?;
//!     let transcript = manager
//!         .handle_turn(ChatMessage::user("What's the outlook?"), &Transcript::new(), selection.symbol())
//!         .await;
//!     println!("{}", transcript[1].content);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod error;
pub mod prompts;
pub mod render;
pub mod retry;
pub mod series;
pub mod timeframe;

pub use api::{Headline, MarketDataProvider, YahooFinanceClient};
pub use catalog::{AssetSelection, SectorCatalog, SectorEntry};
pub use config::{AnalystConfig, ModelProviderKind};
pub use conversation::{
    ChatMessage, ChatRole, ChatUpdate, ConversationManager, GroundingContext, ModelClient,
    Transcript,
};
pub use error::{AnalystError, Result};
pub use retry::RetryPolicy;
pub use series::{BarTime, NormalizedSeries, PriceBar, SeriesNormalizer, SeriesSummary};
pub use timeframe::Timeframe;
