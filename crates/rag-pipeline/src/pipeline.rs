//! The pipeline context: chunking, embedding, indexing, retrieval and answering

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result, ResultExt};
use crate::generation::AnswerComposer;
use crate::ingestion::{IngestOutcome, IngestPipeline};
use crate::providers::{
    embed_batch_checked, embedder_from_config, EmbeddingProvider, LlmProvider, OllamaLlm,
};
use crate::retrieval::index::run_blocking;
use crate::retrieval::{Retriever, VectorIndex};
use crate::types::{
    Answer, DocumentId, IndexEntry, MetadataValue, QueryRequest, RetrievalResult,
};

/// Owns every collaborator a request needs; cheap to clone and share
#[derive(Clone)]
pub struct RagPipeline {
    ingest: Arc<IngestPipeline>,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    retriever: Retriever,
    composer: AnswerComposer,
    similarity_threshold: f32,
    default_top_k: usize,
}

impl RagPipeline {
    /// Assemble a pipeline from explicit parts
    ///
    /// The index and the embedder must agree on the vector dimension.
    pub fn new(
        ingest: IngestPipeline,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        composer: AnswerComposer,
        similarity_threshold: f32,
    ) -> Result<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }

        let retriever = Retriever::new(Arc::clone(&embedder), Arc::clone(&index));

        Ok(Self {
            ingest: Arc::new(ingest),
            index,
            embedder,
            llm,
            retriever,
            composer,
            similarity_threshold,
            default_top_k: 5,
        })
    }

    /// Build the providers and index named in the configuration
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let ingest = IngestPipeline::from_config(config)?;
        let embedder = embedder_from_config(config)?;
        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::new(&config.llm)?);

        let index = if config.vector_index.in_memory {
            VectorIndex::in_memory(config.embeddings.dimensions)?
        } else {
            VectorIndex::open(&config.vector_index.storage_path, config.embeddings.dimensions)
                .context("opening vector index")?
        };

        tracing::info!(
            "Pipeline ready: {} entries across {} documents, generation model {}",
            index.len(),
            index.document_count(),
            llm.model()
        );

        Ok(Self::new(
            ingest,
            Arc::new(index),
            embedder,
            llm,
            AnswerComposer::new(),
            config.retrieval.similarity_threshold,
        )?
        .with_default_top_k(config.retrieval.top_k))
    }

    /// Number of fragments retrieved when a request does not say
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn ingestion(&self) -> &IngestPipeline {
        &self.ingest
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Chunk, embed and index a document's text as one unit
    ///
    /// Either every fragment is written or none is.
    pub async fn ingest_text(
        &self,
        document_id: &DocumentId,
        source_filename: &str,
        text: &str,
        extra_metadata: BTreeMap<String, MetadataValue>,
    ) -> Result<IngestOutcome> {
        let fragments = self.ingest.fragments(document_id, source_filename, text);
        if fragments.is_empty() {
            tracing::warn!("Document {} has no text to index", document_id);
            return Ok(IngestOutcome {
                document_id: document_id.clone(),
                chunk_count: 0,
            });
        }

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = embed_batch_checked(self.embedder.as_ref(), &texts)
            .await
            .with_context(|| {
                format!("embedding {} chunks of document {}", texts.len(), document_id)
            })?;

        let entries: Vec<IndexEntry> = fragments
            .into_iter()
            .zip(vectors)
            .map(|(fragment, vector)| IndexEntry::new(fragment, vector, extra_metadata.clone()))
            .collect();

        let chunk_count = run_blocking(&self.index, move |index| index.upsert(entries))
            .await
            .with_context(|| format!("indexing document {}", document_id))?;

        tracing::info!(
            "Ingested document {} ({}): {} chunks",
            document_id,
            source_filename,
            chunk_count
        );

        Ok(IngestOutcome {
            document_id: document_id.clone(),
            chunk_count,
        })
    }

    /// Retrieve fragments for a question without generating
    pub async fn retrieve(&self, request: &QueryRequest) -> Result<Vec<RetrievalResult>> {
        let min_score = request.min_score.unwrap_or(self.similarity_threshold);
        self.retriever
            .retrieve_filtered(
                &request.question,
                request.top_k.unwrap_or(self.default_top_k),
                min_score,
                request.document_filter.clone(),
            )
            .await
    }

    /// Answer a question from the indexed documents
    pub async fn query(&self, question: &str, top_k: usize) -> Result<Answer> {
        self.answer(&QueryRequest::new(question).with_top_k(top_k)).await
    }

    /// Answer a full query request
    pub async fn answer(&self, request: &QueryRequest) -> Result<Answer> {
        if request.question.trim().is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }
        if request.top_k == Some(0) {
            return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
        }

        let results = self.retrieve(request).await?;
        tracing::info!(
            "Question matched {} fragments: {:?}",
            results.len(),
            request.question
        );

        self.composer
            .compose(&request.question, &results, self.llm.as_ref())
            .await
    }

    /// Remove every fragment of a document; returns how many were removed
    pub async fn delete_document(&self, document_id: &DocumentId) -> Result<usize> {
        let id = document_id.clone();
        run_blocking(&self.index, move |index| index.delete_by_document(&id)).await
    }
}
