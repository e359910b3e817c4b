// Chat module
// Message types, the language-model seam, transcripts and the simple bots

pub mod prompt;
pub mod tools;
pub mod tutor;


use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::Result;
use crate::provider::ProviderError;

pub use prompt::PromptTemplate;
pub use tools::{ModelTurn, ToolCall, ToolCallingModel, ToolDefinition};
pub use tutor::Tutor;

/// Role of a message sent to the language model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in a model request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A hosted language model that turns a message list into a reply
pub trait ChatModel {
    fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, ProviderError>;

    /// Send a single filled prompt as one user message
    fn complete_prompt(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        self.complete(&[ChatMessage::user(prompt)])
    }
}

impl<T: ChatModel + ?Sized> ChatModel for &T {
    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, ProviderError> {
        (**self).complete(messages)
    }
}

/// Who said a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Ordered user/assistant turns of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed exchange
    #[inline]
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            text: question.into(),
        });
        self.turns.push(Turn {
            role: Role::Assistant,
            text: answer.into(),
        });
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The turns as model messages
    #[inline]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| match turn.role {
                Role::User => ChatMessage::user(turn.text.clone()),
                Role::Assistant => ChatMessage::assistant(turn.text.clone()),
            })
            .collect()
    }
}

/// One-shot Q&A bot: no retrieval, no history
#[inline]
pub fn answer_question<M: ChatModel>(model: &M, question: &str) -> Result<String> {
    let prompt = PromptTemplate::qa().fill(&[("question", question)])?;
    info!("Answering one-shot question ({} chars)", question.len());
    Ok(model.complete_prompt(&prompt)?)
}
