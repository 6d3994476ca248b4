//! Language model client used by the conversation manager

use crate::config::{AnalystConfig, ModelProviderKind};
use crate::error::AnalystError;
use analyst_llm::providers::{
    AnthropicProvider, GeminiConfig, GeminiProvider, OpenAIConfig, OpenAIProvider,
};
use analyst_llm::{CompletionRequest, LLMError, LLMProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Result of one model invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    Answered(String),
    Errored(String),
}

/// Explicitly constructed handle to a language model
///
/// Sends a single user message per call, plus the standing instructions
/// as the system prompt. No retry, bounded by `timeout`.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    instructions: Option<String>,
    max_tokens: usize,
    temperature: Option<f32>,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalystConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            instructions: None,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.model_timeout,
        }
    }

    /// Build the configured provider from its environment credentials
    ///
    /// The HTTP client gets the same deadline as the call itself.
    pub fn from_env(config: &AnalystConfig) -> crate::error::Result<Self> {
        let timeout_secs = config.model_timeout.as_secs().max(1);
        let provider: Arc<dyn LLMProvider> = match config.model_provider {
            ModelProviderKind::OpenAI => Arc::new(OpenAIProvider::with_config(
                OpenAIConfig::from_env()?.with_timeout(timeout_secs),
            )?),
            ModelProviderKind::Anthropic => {
                Arc::new(AnthropicProvider::from_env_with_timeout(timeout_secs)?)
            }
            ModelProviderKind::Gemini => Arc::new(GeminiProvider::with_config(
                GeminiConfig::from_env()?.with_timeout(timeout_secs),
            )?),
        };
        Ok(Self::new(provider, config))
    }

    /// Standing instructions sent as the system prompt on every call
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn request(&self, prompt: &str) -> CompletionRequest {
        let request = CompletionRequest::prompt(&self.model, prompt)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature);
        match &self.instructions {
            Some(instructions) => request.system(instructions.as_str()),
            None => request,
        }
    }

    /// Ask the model for a completion of `prompt`
    #[instrument(skip(self, prompt), fields(model = %self.model, provider = self.provider.name()))]
    pub async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        let request = self.request(prompt);
        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| LLMError::Timeout(self.timeout.as_secs()))??;

        let text = response.text().trim();
        if text.is_empty() {
            return Err(LLMError::EmptyCompletion(self.provider.name().to_string()));
        }
        debug!(
            tokens = response.usage.total(),
            stop_reason = ?response.stop_reason,
            "Model answered"
        );
        Ok(text.to_string())
    }

    /// [`generate`](Self::generate) folded into an outcome; never fails
    pub async fn invoke(&self, prompt: &str) -> ModelOutcome {
        match self.generate(prompt).await {
            Ok(text) => ModelOutcome::Answered(text),
            Err(e) => {
                warn!(model = %self.model, error = %e, "Model invocation failed");
                ModelOutcome::Errored(AnalystError::from(e).to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_llm::{CompletionResponse, Message, StopReason, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingProvider {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn complete(&self, request: CompletionRequest) -> analyst_llm::Result<CompletionResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(CompletionResponse {
                message: Message::assistant(self.reply.clone()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LLMProvider for SlowProvider {
        async fn complete(&self, _request: CompletionRequest) -> analyst_llm::Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(LLMError::RequestFailed("unreachable".to_string()))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_generate_sends_single_user_message() {
        let provider = Arc::new(RecordingProvider {
            reply: "  Looks bullish.  ".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let config = AnalystConfig::builder()
            .model("test-model")
            .temperature(0.2)
            .build()
            .unwrap();
        let client = ModelClient::new(provider.clone(), &config);

        let text = client.generate("prompt body").await.unwrap();
        assert_eq!(text, "Looks bullish.");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "test-model");
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].messages[0].text(), "prompt body");
        assert_eq!(seen[0].temperature, Some(0.2));
        assert!(seen[0].system.is_none());
    }

    #[tokio::test]
    async fn test_instructions_travel_as_system_prompt() {
        let provider = Arc::new(RecordingProvider {
            reply: "ok".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let client = ModelClient::new(provider.clone(), &AnalystConfig::default())
            .with_instructions("Answer like an analyst.");

        client.generate("question").await.unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].system.as_deref(), Some("Answer like an analyst."));
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].messages[0].text(), "question");
    }

    #[tokio::test]
    async fn test_default_config_token_budget() {
        let provider = Arc::new(RecordingProvider {
            reply: "ok".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let client = ModelClient::new(provider.clone(), &AnalystConfig::default());

        client.generate("question").await.unwrap();

        let cap = provider.seen.lock().unwrap()[0].max_tokens;
        assert_eq!(cap, Some(8192));
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let provider = Arc::new(RecordingProvider {
            reply: "   ".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let client = ModelClient::new(provider, &AnalystConfig::default());

        assert!(matches!(
            client.generate("p").await,
            Err(LLMError::EmptyCompletion(name)) if name == "recording"
        ));
    }

    #[tokio::test]
    async fn test_timeout_becomes_errored_outcome() {
        let config = AnalystConfig::builder()
            .model_timeout(Duration::from_millis(10))
            .build()
            .unwrap();
        let client = ModelClient::new(Arc::new(SlowProvider), &config);

        match client.invoke("p").await {
            ModelOutcome::Errored(reason) => assert!(reason.contains("timed out")),
            ModelOutcome::Answered(text) => panic!("unexpected answer: {text}"),
        }
    }
}
