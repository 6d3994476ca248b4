//! Configuration for the market analyst

use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Hosted language model backing the chat assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProviderKind {
    /// OpenAI or any OpenAI-compatible server
    OpenAI,
    /// Anthropic Claude
    Anthropic,
    /// Google Gemini
    #[default]
    Gemini,
}

impl ModelProviderKind {
    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-5",
            Self::Gemini => "gemini-2.5-flash",
        }
    }
}

impl fmt::Display for ModelProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        })
    }
}

impl FromStr for ModelProviderKind {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(AnalystError::ConfigError(format!(
                "Unknown model provider '{other}' (expected openai, anthropic or gemini)"
            ))),
        }
    }
}

/// Configuration for series fetching and the chat assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    /// Timeout for each market-data HTTP call
    pub request_timeout: Duration,

    /// Total attempts for a bar fetch (1 = no retry)
    pub max_attempts: u32,

    /// First retry delay
    pub retry_backoff_base: Duration,

    /// Upper bound on any retry delay
    pub retry_backoff_max: Duration,

    /// Headlines injected into each prompt
    pub max_headlines: usize,

    /// Business summaries longer than this are cut (characters)
    pub max_summary_chars: usize,

    /// Language model provider
    pub model_provider: ModelProviderKind,

    /// Model identifier
    pub model: String,

    /// Completion token budget
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Hard deadline for one model call
    pub model_timeout: Duration,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        let model_provider = ModelProviderKind::default();
        Self {
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff_base: Duration::from_millis(500),
            retry_backoff_max: Duration::from_secs(5),
            max_headlines: 3,
            max_summary_chars: 4000,
            model_provider,
            model: model_provider.default_model().to_string(),
            max_tokens: 8192,
            temperature: None,
            model_timeout: Duration::from_secs(120),
        }
    }
}

impl AnalystConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalystConfigBuilder {
        AnalystConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AnalystError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.max_headlines == 0 {
            return Err(AnalystError::ConfigError(
                "max_headlines must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(AnalystError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AnalystError::ConfigError("model must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() || self.model_timeout.is_zero() {
            return Err(AnalystError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(AnalystError::ConfigError(format!(
                    "temperature {t} outside 0.0..=2.0"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for AnalystConfig
#[derive(Debug, Default)]
pub struct AnalystConfigBuilder {
    request_timeout: Option<Duration>,
    max_attempts: Option<u32>,
    retry_backoff_base: Option<Duration>,
    retry_backoff_max: Option<Duration>,
    max_headlines: Option<usize>,
    max_summary_chars: Option<usize>,
    model_provider: Option<ModelProviderKind>,
    model: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    model_timeout: Option<Duration>,
}

impl AnalystConfigBuilder {
    /// Set the market-data request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set total attempts for bar fetches
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the first retry delay
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set the retry delay cap
    pub fn retry_backoff_max(mut self, duration: Duration) -> Self {
        self.retry_backoff_max = Some(duration);
        self
    }

    /// Set how many headlines go into each prompt
    pub fn max_headlines(mut self, n: usize) -> Self {
        self.max_headlines = Some(n);
        self
    }

    /// Set the business summary length cap
    pub fn max_summary_chars(mut self, n: usize) -> Self {
        self.max_summary_chars = Some(n);
        self
    }

    /// Set the model provider
    pub fn model_provider(mut self, provider: ModelProviderKind) -> Self {
        self.model_provider = Some(provider);
        self
    }

    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the model call deadline
    pub fn model_timeout(mut self, duration: Duration) -> Self {
        self.model_timeout = Some(duration);
        self
    }

    /// Load settings from `ANALYST_*` environment variables
    ///
    /// Values already set on the builder win over the environment.
    pub fn with_env(mut self) -> Result<Self> {
        if self.model_provider.is_none() {
            if let Ok(v) = std::env::var("ANALYST_LLM_PROVIDER") {
                self.model_provider = Some(v.parse()?);
            }
        }
        if self.model.is_none() {
            self.model = std::env::var("ANALYST_MODEL").ok().filter(|m| !m.trim().is_empty());
        }
        if self.max_headlines.is_none() {
            self.max_headlines = env_parse("ANALYST_MAX_HEADLINES")?;
        }
        if self.request_timeout.is_none() {
            self.request_timeout =
                env_parse::<u64>("ANALYST_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalystConfig> {
        let defaults = AnalystConfig::default();
        let model_provider = self.model_provider.unwrap_or(defaults.model_provider);

        let config = AnalystConfig {
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            retry_backoff_max: self.retry_backoff_max.unwrap_or(defaults.retry_backoff_max),
            max_headlines: self.max_headlines.unwrap_or(defaults.max_headlines),
            max_summary_chars: self.max_summary_chars.unwrap_or(defaults.max_summary_chars),
            model_provider,
            // The default model follows the chosen provider
            model: self
                .model
                .unwrap_or_else(|| model_provider.default_model().to_string()),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
            model_timeout: self.model_timeout.unwrap_or(defaults.model_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AnalystError::ConfigError(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalystConfig::default();
        assert_eq!(config.max_headlines, 3);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.model_provider, ModelProviderKind::Gemini);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.max_tokens, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AnalystConfig::builder()
            .model_provider(ModelProviderKind::OpenAI)
            .max_attempts(5)
            .request_timeout(Duration::from_secs(10))
            .temperature(0.2)
            .build()
            .unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn test_explicit_model_wins() {
        let config = AnalystConfig::builder()
            .model_provider(ModelProviderKind::Anthropic)
            .model("claude-opus-4-1")
            .build()
            .unwrap();
        assert_eq!(config.model, "claude-opus-4-1");
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let result = AnalystConfig::builder().max_attempts(0).build();
        assert!(matches!(result, Err(AnalystError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_headlines() {
        let config = AnalystConfig {
            max_headlines: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_temperature() {
        let result = AnalystConfig::builder().temperature(3.5).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("OpenAI".parse::<ModelProviderKind>().unwrap(), ModelProviderKind::OpenAI);
        assert_eq!("claude".parse::<ModelProviderKind>().unwrap(), ModelProviderKind::Anthropic);
        assert_eq!(" gemini ".parse::<ModelProviderKind>().unwrap(), ModelProviderKind::Gemini);
        assert!("mistral".parse::<ModelProviderKind>().is_err());
        assert_eq!(ModelProviderKind::Anthropic.to_string(), "anthropic");
    }
}
