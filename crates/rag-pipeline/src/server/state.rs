//! Application state for the RAG server

use dashmap::DashSet;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::pipeline::RagPipeline;
use crate::registry::DocumentRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Chunking, embedding, index and generation
    pipeline: RagPipeline,
    /// Upload bookkeeping
    registry: DocumentRegistry,
    /// Filenames with an upload in progress
    uploads_in_flight: DashSet<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let pipeline = RagPipeline::from_config(&config)?;

        let registry = DocumentRegistry::open(
            &config.documents.registry_path,
            config.documents.max_documents,
        )?;
        tracing::info!("Document registry initialized ({} documents)", registry.len());

        std::fs::create_dir_all(&config.documents.upload_dir)?;

        Ok(Self::from_parts(config, pipeline, registry))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: RagConfig,
        pipeline: RagPipeline,
        registry: DocumentRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                registry,
                uploads_in_flight: DashSet::new(),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.inner.registry
    }

    /// Reserve `filename` for the duration of an upload
    ///
    /// A second concurrent upload of the same filename is a duplicate.
    pub fn claim_upload(&self, filename: &str) -> Result<UploadClaim> {
        if !self.inner.uploads_in_flight.insert(filename.to_string()) {
            return Err(Error::DuplicateDocument(filename.to_string()));
        }
        Ok(UploadClaim {
            state: self.clone(),
            filename: filename.to_string(),
        })
    }
}

/// Releases an upload reservation when dropped
pub struct UploadClaim {
    state: AppState,
    filename: String,
}

impl Drop for UploadClaim {
    fn drop(&mut self) {
        self.state.inner.uploads_in_flight.remove(&self.filename);
    }
}
