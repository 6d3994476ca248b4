//! Grounded conversation manager

use super::context::GroundingContext;
use super::model::{ModelClient, ModelOutcome};
use super::transcript::{ChatMessage, ChatRole, Transcript};
use crate::api::MarketDataProvider;
use crate::config::AnalystConfig;
use crate::error::Result;
use crate::prompts::{GREETING, PromptComposer, SYSTEM_PROMPT, backend_error_reply};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Stage of a single chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnState {
    Idle,
    UserAppended,
    ContextFetching,
    PromptComposed,
    ModelInvoked,
    Answered,
    Errored,
}

/// What the presentation layer should do with its transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    Replace(Transcript),
    NoUpdate,
}

struct Turn<'a> {
    symbol: &'a str,
    state: TurnState,
}

impl Turn<'_> {
    fn advance(&mut self, next: TurnState) {
        debug!(symbol = self.symbol, from = ?self.state, to = ?next, "Turn transition");
        self.state = next;
    }
}

/// Answers questions about the active symbol using live market context
///
/// Owns no transcript of its own: every call borrows a snapshot and hands
/// back a new one, so callers never see their copy change underneath them.
pub struct ConversationManager {
    market: Arc<dyn MarketDataProvider>,
    model: ModelClient,
    composer: PromptComposer,
    max_headlines: usize,
    request_timeout: Duration,
}

impl ConversationManager {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        model: ModelClient,
        config: &AnalystConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            market,
            model: model.with_instructions(SYSTEM_PROMPT),
            composer: PromptComposer::new(config.max_summary_chars)?,
            max_headlines: config.max_headlines,
            request_timeout: config.request_timeout,
        })
    }

    /// Transcript holding only the greeting
    pub fn initial_greeting() -> Transcript {
        Transcript::new().appended([ChatMessage::assistant(GREETING)])
    }

    /// Presentation callback: react to a (possibly absent) new message
    pub async fn on_chat_event(
        &self,
        message: Option<ChatMessage>,
        prior: &Transcript,
        symbol: &str,
    ) -> ChatUpdate {
        match message {
            Some(message) if !message.is_blank() => {
                ChatUpdate::Replace(self.handle_turn(message, prior, symbol).await)
            }
            _ if prior.is_empty() => ChatUpdate::Replace(Self::initial_greeting()),
            _ => ChatUpdate::NoUpdate,
        }
    }

    /// Run one chat turn about `symbol`
    ///
    /// The returned transcript is `prior` plus the user message and exactly
    /// one assistant reply. Failures become an apologetic reply instead of
    /// an error. A blank or non-user message yields an unchanged copy of
    /// `prior`.
    #[instrument(skip(self, message, prior), fields(history = prior.len()))]
    pub async fn handle_turn(&self, message: ChatMessage, prior: &Transcript, symbol: &str) -> Transcript {
        if message.role != ChatRole::User {
            debug!(symbol, role = ?message.role, "Ignoring non-user message");
            return prior.clone();
        }
        if message.is_blank() {
            debug!(symbol, "Ignoring blank message");
            return prior.clone();
        }

        let mut turn = Turn {
            symbol,
            state: TurnState::Idle,
        };
        let question = message.content.clone();
        let with_user = prior.appended([message]);
        turn.advance(TurnState::UserAppended);

        let reply = match self.answer(&question, &mut turn).await {
            ModelOutcome::Answered(text) => {
                turn.advance(TurnState::Answered);
                ChatMessage::assistant(text)
            }
            ModelOutcome::Errored(reason) => {
                turn.advance(TurnState::Errored);
                ChatMessage::assistant(backend_error_reply(&reason))
            }
        };
        turn.advance(TurnState::Idle);

        let transcript = with_user.appended([reply]);
        info!(symbol, messages = transcript.len(), "Turn complete");
        transcript
    }

    async fn answer(&self, question: &str, turn: &mut Turn<'_>) -> ModelOutcome {
        turn.advance(TurnState::ContextFetching);
        let context = match GroundingContext::fetch(
            self.market.as_ref(),
            turn.symbol,
            self.max_headlines,
            self.request_timeout,
        )
        .await
        {
            Ok(context) => context,
            Err(e) => return ModelOutcome::Errored(e.to_string()),
        };

        let prompt = match self.composer.compose(&context, question) {
            Ok(prompt) => prompt,
            Err(e) => return ModelOutcome::Errored(e.to_string()),
        };
        turn.advance(TurnState::PromptComposed);

        turn.advance(TurnState::ModelInvoked);
        self.model.invoke(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Headline, MockMarketDataProvider};
    use crate::conversation::context::{NO_NEWS, NO_SUMMARY};
    use crate::error::AnalystError;
    use analyst_llm::{
        CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason, TokenUsage,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed text and remembers every prompt it saw
    struct FakeModel {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
        systems: Mutex<Vec<Option<String>>>,
    }

    impl FakeModel {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
                systems: Mutex::new(Vec::new()),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason.to_string()),
                prompts: Mutex::new(Vec::new()),
                systems: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for FakeModel {
        async fn complete(&self, request: CompletionRequest) -> analyst_llm::Result<CompletionResponse> {
            let prompt = request.messages.iter().map(Message::text).collect::<Vec<_>>().join("\n");
            self.prompts.lock().unwrap().push(prompt);
            self.systems.lock().unwrap().push(request.system.clone());
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                }),
                Err(reason) => Err(LLMError::RequestFailed(reason.clone())),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn healthy_market(summary: Option<&str>, news: usize) -> Arc<MockMarketDataProvider> {
        let summary = summary.map(str::to_string);
        let mut market = MockMarketDataProvider::new();
        market
            .expect_get_profile()
            .returning(move |_| Ok(summary.clone()));
        market.expect_get_news().returning(move |_| {
            Ok((1..=news).map(|i| Headline::new(format!("Story {i}"))).collect())
        });
        Arc::new(market)
    }

    fn build_manager(market: Arc<MockMarketDataProvider>, model: Arc<FakeModel>) -> ConversationManager {
        let config = AnalystConfig::default();
        ConversationManager::new(market, ModelClient::new(model, &config), &config).unwrap()
    }

    #[test]
    fn test_initial_greeting() {
        let transcript = ConversationManager::initial_greeting();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, ChatRole::Assistant);
        assert_eq!(transcript[0].content, GREETING);
    }

    #[tokio::test]
    async fn test_outlook_question_on_empty_transcript() {
        let model = FakeModel::answering("Outlook is steady.");
        let manager = build_manager(healthy_market(Some("Apple makes phones."), 2), model.clone());
        let question = ChatMessage::user("What's the outlook?");

        let transcript = manager
            .handle_turn(question.clone(), &Transcript::new(), "AAPL")
            .await;

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0], question);
        assert_eq!(transcript[1].role, ChatRole::Assistant);
        assert_eq!(transcript[1].content, "Outlook is steady.");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("AAPL"));
        assert!(prompts[0].contains("Apple makes phones."));
        assert!(prompts[0].contains("- Story 1\n- Story 2"));
        assert!(prompts[0].contains("What's the outlook?"));
    }

    #[tokio::test]
    async fn test_persona_is_sent_as_system_prompt() {
        let model = FakeModel::answering("ok");
        let manager = build_manager(healthy_market(None, 0), model.clone());
        manager
            .handle_turn(ChatMessage::user("Outlook?"), &Transcript::new(), "AAPL")
            .await;

        let systems = model.systems.lock().unwrap().clone();
        assert_eq!(systems, vec![Some(SYSTEM_PROMPT.to_string())]);
        assert!(!model.prompts()[0].contains(SYSTEM_PROMPT));
    }

    #[tokio::test]
    async fn test_turn_grows_by_two_and_leaves_prior_alone() {
        let manager = build_manager(healthy_market(None, 0), FakeModel::answering("ok"));
        let prior = ConversationManager::initial_greeting();
        let snapshot = prior.clone();

        let next = manager
            .handle_turn(ChatMessage::user("Is it cheap?"), &prior, "MSFT")
            .await;

        assert_eq!(prior, snapshot);
        assert_eq!(next.len(), prior.len() + 2);
        assert_eq!(next[0], prior[0]);
        assert_eq!(next[1].content, "Is it cheap?");
        assert_eq!(next[2].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_model_failure_becomes_error_reply() {
        let manager = build_manager(healthy_market(Some("x"), 1), FakeModel::failing("quota exhausted"));
        let prior = ConversationManager::initial_greeting();

        let next = manager
            .handle_turn(ChatMessage::user("Buy?"), &prior, "NVDA")
            .await;

        assert_eq!(next.len(), 3);
        assert_eq!(next[2].role, ChatRole::Assistant);
        assert!(next[2].content.starts_with("Sorry, I ran into a backend error: "));
        assert!(next[2].content.contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_context_failure_skips_model() {
        let mut market = MockMarketDataProvider::new();
        market
            .expect_get_profile()
            .returning(|_| Err(AnalystError::upstream("yahoo", "crumb rejected")));
        market.expect_get_news().returning(|_| Ok(vec![]));
        let model = FakeModel::answering("never used");
        let manager = build_manager(Arc::new(market), model.clone());

        let next = manager
            .handle_turn(ChatMessage::user("Why?"), &Transcript::new(), "AMD")
            .await;

        assert_eq!(next.len(), 2);
        assert!(next[1].content.contains("crumb rejected"));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_placeholders_and_headline_limit_reach_prompt() {
        let model = FakeModel::answering("fine");
        let manager = build_manager(healthy_market(None, 6), model.clone());
        manager
            .handle_turn(ChatMessage::user("News?"), &Transcript::new(), "F")
            .await;

        let prompts = model.prompts();
        let prompt = &prompts[0];
        assert!(prompt.contains(NO_SUMMARY));
        assert!(prompt.contains("- Story 3"));
        assert!(!prompt.contains("Story 4"));

        let model = FakeModel::answering("fine");
        let manager = build_manager(healthy_market(Some("Cars."), 0), model.clone());
        manager
            .handle_turn(ChatMessage::user("News?"), &Transcript::new(), "F")
            .await;
        assert!(model.prompts()[0].contains(NO_NEWS));
    }

    #[tokio::test]
    async fn test_blank_message_returns_copy() {
        let model = FakeModel::answering("unused");
        let manager = build_manager(healthy_market(None, 0), model.clone());
        let prior = ConversationManager::initial_greeting();

        let next = manager.handle_turn(ChatMessage::user("   "), &prior, "AAPL").await;
        assert_eq!(next, prior);
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_assistant_message_is_not_a_turn() {
        let model = FakeModel::answering("unused");
        let manager = build_manager(healthy_market(None, 0), model.clone());
        let prior = ConversationManager::initial_greeting();

        let next = manager
            .handle_turn(ChatMessage::assistant("Buy everything"), &prior, "AAPL")
            .await;
        assert_eq!(next, prior);
        assert!(model.prompts().is_empty());

        let update = manager
            .on_chat_event(Some(ChatMessage::assistant("Buy everything")), &prior, "AAPL")
            .await;
        assert_eq!(update, ChatUpdate::Replace(prior));
    }

    #[test]
    fn test_turn_states_advance_in_order() {
        let mut turn = Turn {
            symbol: "AAPL",
            state: TurnState::Idle,
        };
        turn.advance(TurnState::UserAppended);
        assert_eq!(turn.state, TurnState::UserAppended);
        turn.advance(TurnState::Answered);
        assert_eq!(turn.state, TurnState::Answered);
    }

    #[tokio::test]
    async fn test_on_chat_event_gate() {
        let manager = build_manager(healthy_market(None, 0), FakeModel::answering("hi"));

        let update = manager.on_chat_event(None, &Transcript::new(), "AAPL").await;
        assert_eq!(update, ChatUpdate::Replace(ConversationManager::initial_greeting()));

        let greeted = ConversationManager::initial_greeting();
        let update = manager.on_chat_event(None, &greeted, "AAPL").await;
        assert_eq!(update, ChatUpdate::NoUpdate);

        let update = manager
            .on_chat_event(Some(ChatMessage::user("Hello")), &greeted, "AAPL")
            .await;
        match update {
            ChatUpdate::Replace(next) => assert_eq!(next.len(), 3),
            ChatUpdate::NoUpdate => panic!("expected a new transcript"),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AnalystConfig::default();
        config.max_headlines = 0;
        let model = ModelClient::new(FakeModel::answering("x"), &AnalystConfig::default());
        let result = ConversationManager::new(healthy_market(None, 0), model, &config);
        assert!(matches!(result, Err(AnalystError::ConfigError(_))));
    }
}
