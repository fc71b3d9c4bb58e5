//! Response types for retrieval, answers and document management

use serde::{Deserialize, Serialize};

use super::document::{DocumentId, EntryMetadata, FileType};

/// A fragment returned by similarity search; computed per query, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Fragment text
    pub fragment_text: String,
    /// Entry metadata (always carries `document_id` and `source_filename`)
    pub metadata: EntryMetadata,
    /// Cosine similarity in [-1, 1], higher is more similar
    pub score: f32,
}

impl RetrievalResult {
    /// Filename the fragment came from
    pub fn source_filename(&self) -> &str {
        &self.metadata.source_filename
    }

    /// Owning document
    pub fn document_id(&self) -> &DocumentId {
        &self.metadata.document_id
    }
}

/// Grounded answer with source attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    #[serde(rename = "answer")]
    pub text: String,
    /// Source filenames of the fragments placed in context, in context order
    pub sources: Vec<String>,
    /// Number of fragments placed in context
    pub context_used: usize,
}

impl Answer {
    /// Answer returned when retrieval found nothing above the threshold
    pub const NO_INFORMATION: &'static str =
        "No relevant information found in the uploaded documents.";

    /// Canned answer for an empty retrieval
    pub fn no_information() -> Self {
        Self {
            text: Self::NO_INFORMATION.to_string(),
            sources: Vec::new(),
            context_used: 0,
        }
    }
}

/// Response from document upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub document_id: DocumentId,
    pub filename: String,
    pub pages: usize,
    pub chunks: usize,
}

/// Summary of a registered document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub filename: String,
    pub file_type: FileType,
    pub pages: usize,
    pub chunks: usize,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub processed: bool,
    pub file_size_kb: f64,
}

/// Response for document listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub total_documents: usize,
    pub documents: Vec<DocumentSummary>,
}

/// Response for document deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub document_id: DocumentId,
    pub deleted_chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_wire_format() {
        let answer = Answer {
            text: "The policy allows 30 days.".to_string(),
            sources: vec!["policy.pdf".to_string(), "policy.pdf".to_string()],
            context_used: 2,
        };

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["answer"], "The policy allows 30 days.");
        assert_eq!(json["sources"].as_array().unwrap().len(), 2);
        assert_eq!(json["context_used"], 2);
    }

    #[test]
    fn test_no_information() {
        let answer = Answer::no_information();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.context_used, 0);
    }
}
