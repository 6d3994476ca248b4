//! Error types for the market analyst

use analyst_llm::LLMError;
use thiserror::Error;

/// Errors raised by the catalog, the series pipeline and the chat turn
#[derive(Debug, Error)]
pub enum AnalystError {
    /// Sector key not present in the catalog
    #[error("Unknown sector: {0}")]
    InvalidSector(String),

    /// Symbol not listed under the selected sector
    #[error("Symbol {symbol} is not listed under sector {sector}")]
    InvalidSymbol { sector: String, symbol: String },

    /// Timeframe token outside the supported set
    #[error("Invalid timeframe: {0} (expected one of 1d, 5d, 1mo, 3mo, 1y, 5y)")]
    InvalidTimeframe(String),

    /// Provider answered but had nothing usable
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Transport, auth or protocol failure talking to a market-data provider
    #[error("{provider} request failed: {reason}")]
    UpstreamError { provider: String, reason: String },

    /// Language model invocation failed
    #[error("Model error: {0}")]
    ModelError(#[from] LLMError),

    /// Prompt template could not be rendered
    #[error("Prompt error: {0}")]
    PromptError(String),

    /// Invalid configuration or catalog definition
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for analyst operations
pub type Result<T> = std::result::Result<T, AnalystError>;

impl AnalystError {
    /// Shorthand for [`AnalystError::UpstreamError`]
    pub fn upstream(provider: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamError {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`AnalystError::DataUnavailable`]
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamError { .. })
    }
}

impl From<minijinja::Error> for AnalystError {
    fn from(err: minijinja::Error) -> Self {
        Self::PromptError(err.to_string())
    }
}
