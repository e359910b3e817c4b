use std::cell::RefCell;

use super::*;
use crate::chat::{MessageRole, Role};
use crate::provider::ProviderError;

/// Records every request and answers with the number of messages it saw
#[derive(Default)]
struct RecordingModel {
    requests: RefCell<Vec<Vec<ChatMessage>>>,
}

impl ChatModel for RecordingModel {
    fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, ProviderError> {
        self.requests.borrow_mut().push(messages.to_vec());
        Ok(format!("seen {}", messages.len()))
    }
}

struct FailingModel;

impl ChatModel for FailingModel {
    fn complete(&self, _messages: &[ChatMessage]) -> std::result::Result<String, ProviderError> {
        Err(ProviderError::RateLimited)
    }
}

#[test]
fn history_is_sent_every_turn() {
    let model = RecordingModel::default();
    let mut tutor = Tutor::new(&model, "persona");

    assert_eq!(tutor.send("What is 2+2?").expect("first turn"), "seen 2");
    assert_eq!(tutor.send("And times 3?").expect("second turn"), "seen 4");

    let requests = model.requests.borrow();
    let second = &requests[1];
    assert_eq!(second[0], ChatMessage::system("persona"));
    assert_eq!(second[1], ChatMessage::user("What is 2+2?"));
    assert_eq!(second[2], ChatMessage::assistant("seen 2"));
    assert_eq!(second[3].role, MessageRole::User);

    let roles: Vec<Role> = tutor.transcript().turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[test]
fn reset_keeps_persona() {
    let model = RecordingModel::default();
    let mut tutor = Tutor::new(&model, "persona");
    tutor.send("hello").expect("turn");

    tutor.reset();
    assert!(tutor.transcript().is_empty());

    tutor.send("again").expect("turn after reset");
    let requests = model.requests.borrow();
    assert_eq!(
        requests[1],
        vec![ChatMessage::system("persona"), ChatMessage::user("again")]
    );
}

#[test]
fn failed_turn_leaves_transcript_unchanged() {
    let mut tutor = Tutor::new(FailingModel, "persona");

    let result = tutor.send("hello");

    assert!(matches!(
        result,
        Err(crate::ChatError::Provider(ProviderError::RateLimited))
    ));
    assert!(tutor.transcript().is_empty());
}
