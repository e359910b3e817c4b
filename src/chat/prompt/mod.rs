
use std::borrow::Cow;

use crate::{ChatError, Result};

const PDF_ANSWER: &str = "Answer the question as detailed as possible from the provided context.
Include the page number if available.
If the answer is not present in the PDF, say so clearly.

Context: {context}
Question: {input}
Answer:";

const QA: &str = "You are a helpful assistant. Answer the following question: {question}";

const NOTE_TAKER: &str = "You are a personal Note Taker bot. Please answer the following
Question: {input}
based on this context: {context}.
If the topic has not been covered in the context, then do not add the extra topic.";

/// Math tutor persona used by the conversational bot
pub const TUTOR_PERSONA: &str =
    "You are a helpful Math assistant. Be friendly and conversational.";

/// System prompt for the mail agent
pub const MAIL_ASSISTANT: &str =
    "You are an AI Gmail assistant that can draft and send emails. \
Use the send_email tool when the user asks you to send a message.";

/// A prompt with `{name}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: Cow<'static, str>,
}

impl PromptTemplate {
    #[inline]
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Retrieval answer template for uploaded PDFs. Variables: `context`, `input`.
    #[inline]
    pub const fn pdf_answer() -> Self {
        Self {
            template: Cow::Borrowed(PDF_ANSWER),
        }
    }

    /// One-shot question template. Variables: `question`.
    #[inline]
    pub const fn qa() -> Self {
        Self {
            template: Cow::Borrowed(QA),
        }
    }

    /// Retrieval answer template for notes. Variables: `context`, `input`.
    #[inline]
    pub const fn note_taker() -> Self {
        Self {
            template: Cow::Borrowed(NOTE_TAKER),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Names of the placeholders in the order they appear
    #[inline]
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.template.as_ref();
        while let Some((name, after)) = next_placeholder(rest) {
            if let Some(name) = name {
                names.push(name);
            }
            rest = after;
        }
        names
    }

    /// Substitute every placeholder. Unknown placeholders are an error;
    /// braces that do not enclose an identifier are kept as written.
    #[inline]
    pub fn fill(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut output = String::with_capacity(self.template.len());
        let mut rest = self.template.as_ref();

        while let Some(open) = rest.find('{') {
            let (literal, from_brace) = rest.split_at(open);
            output.push_str(literal);

            match placeholder_at(from_brace) {
                Some((name, len)) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            ChatError::Template(format!("missing value for {{{}}}", name))
                        })?;
                    output.push_str(value);
                    rest = from_brace.get(len..).unwrap_or_default();
                }
                None => {
                    output.push('{');
                    rest = from_brace.get(1..).unwrap_or_default();
                }
            }
        }

        output.push_str(rest);
        Ok(output)
    }
}

/// If `text` starts with `{identifier}`, the identifier and the placeholder length
fn placeholder_at(text: &str) -> Option<(&str, usize)> {
    let inner = text.strip_prefix('{')?;
    let close = inner.find('}')?;
    let name = inner.get(..close)?;
    let is_identifier = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_identifier.then_some((name, close + 2))
}

/// Advance past the next `{`, reporting the placeholder name when it is one
fn next_placeholder(text: &str) -> Option<(Option<&str>, &str)> {
    let open = text.find('{')?;
    let from_brace = text.get(open..)?;
    match placeholder_at(from_brace) {
        Some((name, len)) => Some((Some(name), from_brace.get(len..)?)),
        None => Some((None, from_brace.get(1..)?)),
    }
}
