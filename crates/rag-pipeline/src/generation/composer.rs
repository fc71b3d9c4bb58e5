//! Grounded answer composition

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::{Answer, RetrievalResult};

use super::prompt::PromptBuilder;

/// Turns retrieved fragments into a prompt, calls the generator once and
/// attributes the answer to every fragment placed in context.
#[derive(Debug, Clone, Default)]
pub struct AnswerComposer;

impl AnswerComposer {
    pub fn new() -> Self {
        Self
    }

    pub async fn compose(
        &self,
        question: &str,
        results: &[RetrievalResult],
        llm: &dyn LlmProvider,
    ) -> Result<Answer> {
        if results.is_empty() {
            tracing::info!("No fragments above threshold, skipping generation");
            return Ok(Answer::no_information());
        }

        let context = PromptBuilder::build_context(results);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);

        tracing::debug!(
            "Generating with {} fragments ({} prompt chars) via {}",
            results.len(),
            prompt.len(),
            llm.model()
        );

        // Failures propagate unchanged; retry policy belongs to the provider
        let text = llm.generate(&prompt).await?;

        Ok(Answer {
            text: text.trim().to_string(),
            sources: results
                .iter()
                .map(|r| r.source_filename().to_string())
                .collect(),
            context_used: results.len(),
        })
    }
}
