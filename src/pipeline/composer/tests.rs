use std::cell::RefCell;

use super::*;
use crate::chat::ChatMessage;
use crate::provider::ProviderError;

fn passage(text: &str, distance: f32) -> RankedPassage {
    RankedPassage {
        text: text.to_string(),
        source: "doc.pdf".to_string(),
        chunk_index: 0,
        distance,
    }
}

#[derive(Default)]
struct CapturingModel {
    prompts: RefCell<Vec<String>>,
}

impl ChatModel for CapturingModel {
    fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, ProviderError> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.borrow_mut().push(prompt);
        Ok("  Paris.  ".to_string())
    }
}

#[test]
fn passages_are_joined_by_blank_lines() {
    let template = PromptTemplate::new("C: {context} Q: {input}");
    let passages = [passage("first", 0.1), passage("second", 0.2)];

    let prompt = compose_prompt(&template, &passages, "why?").expect("should fill");

    assert_eq!(prompt, "C: first\n\nsecond Q: why?");
}

#[test]
fn no_passages_gives_empty_context() {
    let template = PromptTemplate::new("[{context}] {input}");

    let prompt = compose_prompt(&template, &[], "anything").expect("should fill");

    assert_eq!(prompt, "[] anything");
}

#[test]
fn answer_is_returned_verbatim() {
    let model = CapturingModel::default();
    let template = PromptTemplate::pdf_answer();
    let composer = AnswerComposer::new(&model, &template);

    let answer = composer
        .answer(&[passage("The capital of France is Paris.", 0.0)], "Capital?")
        .expect("should answer");

    assert_eq!(answer, "  Paris.  ");
    let prompts = model.prompts.borrow();
    assert!(prompts[0].contains("The capital of France is Paris."));
    assert!(prompts[0].contains("Capital?"));
}

#[test]
fn template_without_context_is_rejected() {
    let model = CapturingModel::default();
    let template = PromptTemplate::new("{question}");
    let composer = AnswerComposer::new(&model, &template);

    let result = composer.answer(&[], "hi");

    assert!(matches!(result, Err(crate::ChatError::Template(_))));
    assert!(model.prompts.borrow().is_empty());
}
