//! Grounded chat about the selected symbol

pub mod context;
pub mod manager;
pub mod model;
pub mod transcript;

pub use context::GroundingContext;
pub use manager::{ChatUpdate, ConversationManager};
pub use model::{ModelClient, ModelOutcome};
pub use transcript::{ChatMessage, ChatRole, Transcript};
