//! Provider abstractions for embeddings and LLM
//!
//! Trait-based so the pipeline can run against a local Ollama server or
//! fully offline with the hashing embedder.

pub mod embedding;
pub mod hash;
pub mod llm;
pub mod ollama;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::Result;

pub use embedding::{embed_batch_checked, embed_checked, EmbeddingProvider};
pub use hash::HashEmbedder;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};

/// Build the configured embedding provider
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.embeddings,
            config.llm.max_retries,
        )?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)?),
    };

    tracing::info!(
        "Embedding provider: {} ({} dimensions)",
        embedder.name(),
        embedder.dimensions()
    );
    Ok(embedder)
}
