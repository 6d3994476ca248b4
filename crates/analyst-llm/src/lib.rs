//! Language-model provider abstraction for market-analyst
//!
//! Provider-agnostic request/response types and the [`LLMProvider`] trait,
//! plus concrete adapters in [`providers`]. The analyst only ever sends a
//! single composed prompt and reads back text, so messages are text-only.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
