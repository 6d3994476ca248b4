//! Fixed prompt template and canned assistant texts

use crate::conversation::GroundingContext;
use crate::error::Result;
use minijinja::{Environment, context};

/// First assistant message of every conversation
pub const GREETING: &str = "Hello! I am your AI Market Analyst. Ask me anything about this stock!";

/// Standing instructions sent as the system prompt
pub const SYSTEM_PROMPT: &str = "You are a professional, helpful financial assistant built into a stock market dashboard. \
Answer the user's question concisely and accurately based on the context provided with it. \
Keep the tone conversational and professional, and address the question directly.";

const TEMPLATE_NAME: &str = "grounded_question";

const TEMPLATE: &str = r"The user is currently looking at the stock ticker: {{ symbol }}.

Background context for {{ symbol }}:
{{ summary }}

Latest news headlines for {{ symbol }}:
{{ headlines }}

User's question: {{ question }}
";

/// Assistant text recorded when a turn fails
pub fn backend_error_reply(reason: &str) -> String {
    format!("Sorry, I ran into a backend error: {reason}")
}

/// Renders the grounded-question prompt
///
/// Exactly four values reach the template: the active symbol, the business
/// summary, the headline block and the user's question verbatim.
pub struct PromptComposer {
    env: Environment<'static>,
    max_summary_chars: usize,
}

impl PromptComposer {
    pub fn new(max_summary_chars: usize) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;
        Ok(Self {
            env,
            max_summary_chars,
        })
    }

    pub fn compose(&self, context: &GroundingContext, question: &str) -> Result<String> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        let prompt = template.render(context! {
            symbol => context.symbol(),
            summary => truncate_chars(context.summary(), self.max_summary_chars),
            headlines => context.headline_block(),
            question => question,
        })?;
        Ok(prompt)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
