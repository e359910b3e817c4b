#[cfg(test)]
mod tests;

use itertools::Itertools;
use tracing::debug;

use super::RankedPassage;
use crate::Result;
use crate::chat::{ChatModel, PromptTemplate};

/// Fill `template` with the passages as `{context}` and the question as `{input}`
#[inline]
pub fn compose_prompt(
    template: &PromptTemplate,
    passages: &[RankedPassage],
    question: &str,
) -> Result<String> {
    let context = passages.iter().map(|p| p.text.as_str()).join("\n\n");
    template.fill(&[("context", context.as_str()), ("input", question)])
}

/// Turns retrieved passages and a question into the model's answer
pub struct AnswerComposer<'a, M> {
    model: &'a M,
    template: &'a PromptTemplate,
}

impl<'a, M: ChatModel> AnswerComposer<'a, M> {
    #[inline]
    pub const fn new(model: &'a M, template: &'a PromptTemplate) -> Self {
        Self { model, template }
    }

    #[inline]
    pub fn answer(&self, passages: &[RankedPassage], question: &str) -> Result<String> {
        let prompt = compose_prompt(self.template, passages, question)?;
        debug!(
            "Sending prompt of {} chars built from {} passages",
            prompt.chars().count(),
            passages.len()
        );
        Ok(self.model.complete_prompt(&prompt)?)
    }
}
