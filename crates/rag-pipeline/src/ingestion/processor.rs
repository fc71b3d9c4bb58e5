//! Ingestion orchestration: extraction and fragment building

use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::error::Result;
use crate::types::{DocumentId, Fragment};

use super::chunker::TextChunker;
use super::parser::{ExtractedText, FileParser};

/// Result of ingesting one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub document_id: DocumentId,
    /// Fragments written to the index
    pub chunk_count: usize,
}

/// Parses files and turns their text into ordered fragments
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    chunker: TextChunker,
    parser: FileParser,
}

impl IngestPipeline {
    pub fn new(chunker: TextChunker, parser: FileParser) -> Self {
        Self { chunker, parser }
    }

    /// Create from configuration; fails on invalid chunk settings
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self::new(
            TextChunker::from_config(&config.chunking)?,
            FileParser::new(config.documents.max_pages_per_document),
        ))
    }

    /// Extract text from an uploaded file, enforcing type and page limits
    pub fn parse_file(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        self.parser.extract_bytes(filename, data)
    }

    /// Chunk text into fragments indexed 0..N-1
    pub fn fragments(
        &self,
        document_id: &DocumentId,
        source_filename: &str,
        text: &str,
    ) -> Vec<Fragment> {
        self.chunker
            .split_spans(text)
            .into_iter()
            .map(|span| {
                Fragment::new(document_id.clone(), span.index, source_filename, span.text)
            })
            .collect()
    }
}
