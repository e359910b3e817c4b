#[cfg(test)]
mod tests;

use tracing::debug;

use super::{ChatMessage, ChatModel, Transcript};
use crate::Result;

/// Multi-turn conversational bot with a fixed system persona
#[derive(Debug)]
pub struct Tutor<M> {
    model: M,
    persona: String,
    transcript: Transcript,
}

impl<M: ChatModel> Tutor<M> {
    #[inline]
    pub fn new(model: M, persona: impl Into<String>) -> Self {
        Self {
            model,
            persona: persona.into(),
            transcript: Transcript::new(),
        }
    }

    /// Send one user message with the whole conversation so far
    #[inline]
    pub fn send(&mut self, message: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 2);
        messages.push(ChatMessage::system(self.persona.clone()));
        messages.extend(self.transcript.to_messages());
        messages.push(ChatMessage::user(message));

        debug!("Sending tutor turn with {} messages", messages.len());
        let reply = self.model.complete(&messages)?;

        self.transcript.push_exchange(message, reply.clone());
        Ok(reply)
    }

    /// Forget the conversation; the persona stays
    #[inline]
    pub fn reset(&mut self) {
        self.transcript.clear();
    }

    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[inline]
    pub fn persona(&self) -> &str {
        &self.persona
    }
}
