//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations wrap one hosted model API. They are shared behind
/// `Arc<dyn LLMProvider>` and injected into whatever needs completions.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for the request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name (e.g., "openai", "anthropic", "gemini")
    fn name(&self) -> &str;
}
