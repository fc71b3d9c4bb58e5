//! RAG Pipeline server binary
//!
//! Run with: cargo run -p rag-pipeline --bin rag-pipeline-server [config.toml]
//!
//! The config path may also be given through `RAG_CONFIG`.

use rag_pipeline::{config::RagConfig, RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_pipeline=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RAG_CONFIG").ok())
        .map(PathBuf::from);

    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding backend: {:?}", config.embeddings.backend);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap ({:?})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
        config.chunking.strategy
    );
    tracing::info!(
        "  - Retrieval: top_k {}, threshold {}",
        config.retrieval.top_k,
        config.retrieval.similarity_threshold
    );

    let server = RagServer::new(config)?;

    if !llm_reachable(&server).await {
        tracing::warn!("Generation model is not reachable; queries with matches will fail");
        tracing::warn!("Start Ollama with `ollama serve` and pull the configured models");
    }

    tracing::info!("API: http://{}/api/v1", server.address());
    server.start().await?;

    Ok(())
}

async fn llm_reachable(server: &RagServer) -> bool {
    server
        .state()
        .pipeline()
        .llm()
        .health_check()
        .await
        .unwrap_or(false)
}
