//! # rag-pipeline
//!
//! Retrieval-augmented question answering over uploaded documents.
//!
//! ## Features
//!
//! - **Chunking**: overlapping windows, fixed or boundary-aware
//! - **Embeddings**: Ollama HTTP models or an offline hashing embedder
//! - **Vector index**: exact cosine search, idempotent upserts, durable JSON snapshots
//! - **Answers**: prompts grounded in retrieved context, with ordered source attribution
//! - **Server**: axum API for upload, query, listing and deletion
//!
//! ## Example
//!
//! ```rust,no_run
//! use rag_pipeline::{config::RagConfig, RagPipeline};
//! use rag_pipeline::types::DocumentId;
//! use std::collections::BTreeMap;
//!
//! # async fn run() -> rag_pipeline::Result<()> {
//! let pipeline = RagPipeline::from_config(&RagConfig::load(None)?)?;
//! let id = DocumentId::new("1");
//! pipeline
//!     .ingest_text(&id, "handbook.txt", "Vacation accrues monthly.", BTreeMap::new())
//!     .await?;
//! let answer = pipeline.query("How does vacation accrue?", 5).await?;
//! println!("{} (sources: {:?})", answer.text, answer.sources);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RagConfig;
pub use error::{Error, ErrorKind, Result};
pub use pipeline::RagPipeline;
pub use server::RagServer;
