// Mail agent
// Turns a plain-language instruction into an email via one tool call, then sends it through Gmail

#[cfg(test)]
mod tests;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::chat::{ChatMessage, ModelTurn, ToolCallingModel, ToolDefinition};
use crate::config::MailConfig;
use crate::provider::{ProviderError, build_agent, parse_base_url};
use crate::{ChatError, Result};

pub const SEND_EMAIL_TOOL: &str = "send_email";

/// The only tool offered to the model
#[inline]
pub fn send_email_tool() -> ToolDefinition {
    ToolDefinition::function(
        SEND_EMAIL_TOOL,
        "Send a plain-text email from the user's Gmail account",
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient email address" },
                "subject": { "type": "string", "description": "Subject line" },
                "body": { "type": "string", "description": "Plain-text message body" }
            },
            "required": ["to", "subject", "body"]
        }),
    )
}

/// A message the model asked to send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    /// Reject drafts that would produce a malformed or injected header
    #[inline]
    pub fn validate(&self) -> Result<()> {
        let to = self.to.trim();
        if to.is_empty() || !to.contains('@') || to.contains(char::is_whitespace) {
            return Err(ChatError::Mail(format!("invalid recipient {:?}", self.to)));
        }
        if self.subject.contains(['\r', '\n']) {
            return Err(ChatError::Mail("subject cannot span lines".to_string()));
        }
        Ok(())
    }

    /// RFC 2822 message text; non-ASCII subjects are RFC 2047 encoded
    #[inline]
    pub fn to_rfc2822(&self) -> String {
        let subject = if self.subject.is_ascii() {
            self.subject.clone()
        } else {
            format!("=?UTF-8?B?{}?=", STANDARD.encode(self.subject.as_bytes()))
        };
        let body = self.body.replace("\r\n", "\n").replace('\n', "\r\n");

        format!(
            "To: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{}",
            self.to.trim(),
            subject,
            body
        )
    }
}

/// Gmail's answer to a successful send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GmailClient {
    api_base: Url,
    token: String,
    agent: ureq::Agent,
}

impl GmailClient {
    /// Create a client, reading the access token from the environment
    #[inline]
    pub fn new(config: &MailConfig) -> std::result::Result<Self, ProviderError> {
        let token = config.token()?;
        Self::with_token(config, token)
    }

    #[inline]
    pub fn with_token(
        config: &MailConfig,
        token: impl Into<String>,
    ) -> std::result::Result<Self, ProviderError> {
        Ok(Self {
            api_base: parse_base_url(&config.api_base)?,
            token: token.into(),
            agent: build_agent(Some(Duration::from_secs(config.request_timeout_secs))),
        })
    }

    /// Send one draft as the authenticated user
    #[inline]
    pub fn send(&self, draft: &EmailDraft) -> std::result::Result<SentMessage, ProviderError> {
        let url = self
            .api_base
            .join("users/me/messages/send")
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid endpoint: {}", e)))?;
        let body = json!({ "raw": URL_SAFE.encode(draft.to_rfc2822().as_bytes()) });

        debug!("POST {}", url);
        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send(&body.to_string())
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                error!("Gmail send failed: {}", e);
                ProviderError::from(e)
            })?;

        serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", url.path(), e)))
    }

    /// Send every draft in order, stopping at the first failure
    #[inline]
    pub fn send_all(&self, drafts: &[EmailDraft]) -> Result<Vec<SentMessage>> {
        drafts
            .iter()
            .map(|draft| {
                let sent = self.send(draft)?;
                info!("Sent email to {} (id {})", draft.to, sent.id);
                Ok(sent)
            })
            .collect()
    }
}

/// What the model decided to do with an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailPlan {
    /// The model answered in text instead of sending anything
    Reply(String),
    Send(Vec<EmailDraft>),
}

/// Single-purpose agent: one model request offering `send_email`, then the
/// requested sends. No further model turns.
#[derive(Debug)]
pub struct MailAgent<M> {
    model: M,
    system_prompt: String,
}

impl<M: ToolCallingModel> MailAgent<M> {
    #[inline]
    pub fn new(model: M, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
        }
    }

    /// Ask the model how to carry out the instruction
    #[inline]
    pub fn plan(&self, instruction: &str) -> Result<MailPlan> {
        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(instruction),
        ];

        match self
            .model
            .complete_with_tools(&messages, &[send_email_tool()])?
        {
            ModelTurn::Reply(text) => Ok(MailPlan::Reply(text)),
            ModelTurn::ToolCalls(calls) => {
                let drafts = calls
                    .iter()
                    .map(|call| {
                        if call.name != SEND_EMAIL_TOOL {
                            warn!("Model requested unknown tool {}", call.name);
                            return Err(ChatError::Provider(ProviderError::InvalidResponse(
                                format!("unknown tool {}", call.name),
                            )));
                        }
                        let draft: EmailDraft = call.parse_arguments()?;
                        draft.validate()?;
                        Ok(draft)
                    })
                    .collect::<Result<Vec<_>>>()?;
                info!("Model drafted {} emails", drafts.len());
                Ok(MailPlan::Send(drafts))
            }
        }
    }
}
