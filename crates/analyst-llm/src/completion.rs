//! One-shot completion exchange
//!
//! A [`CompletionRequest`] carries the instructions, the turns, and the
//! sampling limits for a single call. Adapters translate it into their own
//! wire body; limits left as `None` are omitted so the hosted model's own
//! defaults apply.

use crate::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    /// Instructions sent out-of-band from the turns (system role).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    /// Cap on generated tokens; `None` leaves it to the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Request with a single user turn and no limits set.
    pub fn prompt(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_messages(model, vec![Message::user(text)])
    }

    pub fn with_messages(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    #[must_use]
    pub fn system(mut self, instructions: impl Into<String>) -> Self {
        self.system = Some(instructions.into());
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, cap: usize) -> Self {
        self.max_tokens = Some(cap);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Text of the most recent turn, if any.
    pub fn last_text(&self) -> Option<&str> {
        self.messages.last().map(Message::text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn text(&self) -> &str {
        self.message.text()
    }

    /// True when generation ran into the token cap.
    pub fn truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    /// Provider withheld content (safety filters)
    ContentFiltered,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}
