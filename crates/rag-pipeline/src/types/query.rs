//! Query request types

use serde::{Deserialize, Serialize};

use super::document::DocumentId;

/// Query request for the RAG pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of fragments to retrieve; the configured default when absent
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Override of the configured similarity threshold
    #[serde(default)]
    pub min_score: Option<f32>,

    /// Restrict retrieval to these documents
    #[serde(default)]
    pub document_filter: Option<Vec<DocumentId>>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
            min_score: None,
            document_filter: None,
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the similarity threshold
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Filter by document IDs
    pub fn with_documents(mut self, doc_ids: Vec<DocumentId>) -> Self {
        self.document_filter = Some(doc_ids);
        self
    }
}
