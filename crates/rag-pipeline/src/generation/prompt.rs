//! Prompt templates for grounded answering

use crate::types::RetrievalResult;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Label a single fragment with its position and source filename
    pub fn format_fragment(position: usize, result: &RetrievalResult) -> String {
        format!(
            "[{}] Document: {}\n{}",
            position,
            result.source_filename(),
            result.fragment_text.trim()
        )
    }

    /// Join labeled fragments in the order given
    pub fn build_context(results: &[RetrievalResult]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(i, r)| Self::format_fragment(i + 1, r))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full RAG prompt
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a helpful assistant that answers questions using only the provided documents.

INSTRUCTIONS:
1. Answer the question using only information from the context below
2. Do not use outside knowledge or make assumptions beyond the context
3. Mention which document supports each part of your answer
4. If the answer cannot be found in the context, say so clearly

CONTEXT FROM DOCUMENTS:
{context}

QUESTION: {question}

ANSWER:"#,
            context = context,
            question = question.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentId, EntryMetadata};
    use std::collections::BTreeMap;

    fn result(file: &str, text: &str) -> RetrievalResult {
        RetrievalResult {
            fragment_text: text.to_string(),
            metadata: EntryMetadata {
                document_id: DocumentId::new("1"),
                source_filename: file.to_string(),
                extra: BTreeMap::new(),
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_context_keeps_order_and_labels() {
        let context = PromptBuilder::build_context(&[
            result("policy.pdf", "Refunds take 5 days."),
            result("faq.txt", "Contact support by email."),
        ]);

        let first = context.find("[1] Document: policy.pdf").unwrap();
        let second = context.find("[2] Document: faq.txt").unwrap();
        assert!(first < second);
        assert!(context.contains("Refunds take 5 days."));
    }

    #[test]
    fn test_prompt_requires_grounding() {
        let prompt = PromptBuilder::build_rag_prompt("What is the refund window?", "ctx");
        assert!(prompt.contains("only information from the context"));
        assert!(prompt.contains("cannot be found in the context"));
        assert!(prompt.contains("QUESTION: What is the refund window?"));
    }
}
