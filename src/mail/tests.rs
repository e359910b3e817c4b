use std::cell::RefCell;

use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_partial_json, header, method, path},
};

use super::*;
use crate::chat::ToolCall;
use crate::config::ProviderConfig;
use crate::provider::OpenAiClient;

/// Returns a fixed turn and records the tools it was offered
struct ScriptedModel {
    turn: ModelTurn,
    offered: RefCell<Vec<String>>,
}

impl ScriptedModel {
    fn new(turn: ModelTurn) -> Self {
        Self {
            turn,
            offered: RefCell::new(Vec::new()),
        }
    }
}

impl ToolCallingModel for ScriptedModel {
    fn complete_with_tools(
        &self,
        _messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> std::result::Result<ModelTurn, ProviderError> {
        self.offered
            .borrow_mut()
            .extend(tools.iter().map(|t| t.name().to_string()));
        Ok(self.turn.clone())
    }
}

fn send_call(arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: "call_1".to_string(),
        name: SEND_EMAIL_TOOL.to_string(),
        arguments: arguments.to_string(),
    }
}

fn draft() -> EmailDraft {
    EmailDraft {
        to: "friend@example.com".to_string(),
        subject: "Thank you for the meeting".to_string(),
        body: "Hi,\nit was great catching up.".to_string(),
    }
}

fn gmail_for(server: &MockServer) -> GmailClient {
    let config = MailConfig {
        api_base: format!("{}/gmail/v1", server.uri()),
        ..MailConfig::default()
    };
    GmailClient::with_token(&config, "ya29.test").expect("client should build")
}

#[test]
fn message_text_uses_crlf_headers() {
    assert_eq!(
        draft().to_rfc2822(),
        "To: friend@example.com\r\nSubject: Thank you for the meeting\r\nMIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\n\r\nHi,\r\nit was great catching up."
    );
}

#[test]
fn non_ascii_subject_is_encoded() {
    let email = EmailDraft {
        subject: "Café".to_string(),
        ..draft()
    };

    assert!(email.to_rfc2822().contains("Subject: =?UTF-8?B?Q2Fmw6k=?=\r\n"));
}

#[test]
fn draft_validation() {
    assert!(draft().validate().is_ok());

    let no_at = EmailDraft {
        to: "friend".to_string(),
        ..draft()
    };
    assert!(matches!(no_at.validate(), Err(ChatError::Mail(_))));

    let injected = EmailDraft {
        subject: "Hello\r\nBcc: someone@example.com".to_string(),
        ..draft()
    };
    assert!(matches!(injected.validate(), Err(ChatError::Mail(_))));
}

#[test]
fn plan_offers_only_send_email() {
    let model = ScriptedModel::new(ModelTurn::ToolCalls(vec![send_call(json!({
        "to": "friend@example.com",
        "subject": "Thank you for the meeting",
        "body": "Hi,\nit was great catching up."
    }))]));
    let agent = MailAgent::new(&model, "assistant");

    let plan = agent.plan("Thank my friend for the meeting").expect("should plan");

    assert_eq!(plan, MailPlan::Send(vec![draft()]));
    assert_eq!(*model.offered.borrow(), vec![SEND_EMAIL_TOOL.to_string()]);
}

#[test]
fn text_reply_sends_nothing() {
    let model = ScriptedModel::new(ModelTurn::Reply("Who is the recipient?".to_string()));
    let agent = MailAgent::new(&model, "assistant");

    let plan = agent.plan("Send an email").expect("should plan");

    assert_eq!(plan, MailPlan::Reply("Who is the recipient?".to_string()));
}

#[test]
fn unknown_tool_is_rejected() {
    let model = ScriptedModel::new(ModelTurn::ToolCalls(vec![ToolCall {
        id: "call_1".to_string(),
        name: "delete_inbox".to_string(),
        arguments: "{}".to_string(),
    }]));
    let agent = MailAgent::new(&model, "assistant");

    let result = agent.plan("Clean up");

    assert!(matches!(
        result,
        Err(ChatError::Provider(ProviderError::InvalidResponse(ref msg))) if msg.contains("delete_inbox")
    ));
}

#[test]
fn missing_arguments_are_rejected() {
    let model = ScriptedModel::new(ModelTurn::ToolCalls(vec![send_call(json!({
        "to": "friend@example.com"
    }))]));
    let agent = MailAgent::new(&model, "assistant");

    assert!(matches!(
        agent.plan("Send it"),
        Err(ChatError::Provider(ProviderError::InvalidResponse(_)))
    ));
}

#[tokio::test]
async fn gmail_send_posts_raw_message() {
    let server = MockServer::start().await;
    let raw = URL_SAFE.encode(draft().to_rfc2822().as_bytes());
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .and(header("Authorization", "Bearer ya29.test"))
        .and(body_json(json!({ "raw": raw })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "18c1",
            "threadId": "18c0",
            "labelIds": ["SENT"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gmail = gmail_for(&server);
    let sent = tokio::task::spawn_blocking(move || gmail.send(&draft()))
        .await
        .expect("blocking task should finish")
        .expect("send should succeed");

    assert_eq!(
        sent,
        SentMessage {
            id: "18c1".to_string(),
            thread_id: Some("18c0".to_string()),
        }
    );
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let gmail = gmail_for(&server);
    let result = tokio::task::spawn_blocking(move || gmail.send_all(&[draft()]))
        .await
        .expect("blocking task should finish");

    assert!(matches!(
        result,
        Err(ChatError::Provider(ProviderError::Unauthorized(401)))
    ));
}

#[tokio::test]
async fn instruction_to_sent_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [ { "type": "function", "function": { "name": "send_email" } } ],
            "messages": [
                { "role": "system", "content": "assistant" },
                { "role": "user", "content": "Thank friend@example.com for the meeting" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "send_email",
                            "arguments": json!({
                                "to": "friend@example.com",
                                "subject": "Thank you for the meeting",
                                "body": "Hi,\nit was great catching up."
                            }).to_string()
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m1" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ProviderConfig {
        base_url: format!("{}/v1", server.uri()),
        ..ProviderConfig::default()
    };
    let client = OpenAiClient::with_api_key(&provider, "sk-test").expect("client should build");
    let gmail = gmail_for(&server);

    let sent = tokio::task::spawn_blocking(move || {
        let agent = MailAgent::new(client, "assistant");
        match agent.plan("Thank friend@example.com for the meeting")? {
            MailPlan::Send(drafts) => gmail.send_all(&drafts),
            MailPlan::Reply(text) => Err(ChatError::Mail(text)),
        }
    })
    .await
    .expect("blocking task should finish")
    .expect("email should be sent");

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, "m1");
    assert_eq!(sent[0].thread_id, None);
}
