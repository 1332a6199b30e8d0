use std::sync::Arc;
use std::time::{Duration, Instant};

use raksha_core::{
    ChatTurn, Classifier, GenerationError, LocalMatch, ResponseCategory, Responder, TextGenerator,
};
use raksha_observability::AppMetrics;
use raksha_remote::gemini::DEFAULT_CHAT_TIMEOUT;
use serde::Serialize;
use tracing::{info, instrument, warn};

pub mod generator;
pub mod navigation;

pub use generator::{Directions, Generator};
pub use navigation::{NavigationAgent, NavigationError};

pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response. Please try again!";
pub const UNAVAILABLE_REPLY: &str = "Sorry, I encountered an error. Please try again! 😔";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Local,
    Remote,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub source: ReplySource,
    pub local_match: Option<LocalMatch>,
    pub category: Option<ResponseCategory>,
}

/// Chat history for one session. Turns are only ever appended.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// A conversation opened with the assistant's welcome message.
    pub fn started_by(responder: &Responder) -> Self {
        Self {
            turns: vec![ChatTurn::from_bot(responder.welcome_message())],
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ChatTurn {
        self.push(ChatTurn::from_user(text))
    }

    pub fn push_bot(&mut self, text: impl Into<String>) -> &ChatTurn {
        self.push(ChatTurn::from_bot(text))
    }

    fn push(&mut self, turn: ChatTurn) -> &ChatTurn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Text shown to the user when the remote service could not answer.
pub fn failure_text(error: &GenerationError) -> String {
    match error {
        GenerationError::Timeout | GenerationError::Transport(_) => {
            format!("I'm having trouble connecting. Error: {error}")
        }
        GenerationError::Status { code } => {
            format!("API Error (Code: {code}). Please check your API key and try again.")
        }
        GenerationError::Empty => EMPTY_REPLY.to_string(),
        GenerationError::Unavailable => UNAVAILABLE_REPLY.to_string(),
    }
}

#[derive(Clone)]
pub struct ChatAgent<G>
where
    G: TextGenerator,
{
    classifier: Classifier,
    responder: Responder,
    generator: Arc<G>,
    metrics: Arc<AppMetrics>,
    timeout: Duration,
}

impl<G> ChatAgent<G>
where
    G: TextGenerator,
{
    pub fn new(responder: Responder, generator: Arc<G>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            classifier: Classifier::default(),
            responder,
            generator,
            metrics,
            timeout: DEFAULT_CHAT_TIMEOUT,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn start_conversation(&self) -> Conversation {
        Conversation::started_by(&self.responder)
    }

    /// Answers one message without touching any history.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn reply(&self, text: &str) -> ChatReply {
        let started = Instant::now();
        self.metrics.inc_request();

        let reply = match self.classifier.classify(text) {
            Some(stage) => {
                self.metrics.inc_local_answer();
                ChatReply {
                    text: self.responder.respond(text),
                    source: ReplySource::Local,
                    local_match: Some(stage),
                    category: Some(self.responder.categorize(text)),
                }
            }
            None => self.ask_remote(text).await,
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            source = ?reply.source,
            local_match = ?reply.local_match,
            category = reply.category.map(|c| c.as_code()).unwrap_or("remote"),
            "chat handled"
        );
        reply
    }

    /// Records the user message, answers it, and records the answer.
    pub async fn handle(&self, conversation: &mut Conversation, text: &str) -> ChatReply {
        conversation.push_user(text);
        let reply = self.reply(text).await;
        conversation.push_bot(reply.text.clone());
        reply
    }

    async fn ask_remote(&self, text: &str) -> ChatReply {
        let outcome = match tokio::time::timeout(self.timeout, self.generator.generate(text)).await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout),
        };

        match outcome {
            Ok(answer) => {
                self.metrics.inc_remote_answer();
                ChatReply {
                    text: answer,
                    source: ReplySource::Remote,
                    local_match: None,
                    category: None,
                }
            }
            Err(error) => {
                self.metrics.inc_remote_failure();
                warn!(error = %error, "remote generation failed");
                ChatReply {
                    text: failure_text(&error),
                    source: ReplySource::Failure,
                    local_match: None,
                    category: None,
                }
            }
        }
    }
}
