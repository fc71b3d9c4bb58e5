//! API routes for the RAG server

pub mod documents;
pub mod query;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion, with a larger body limit for file uploads
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/query", post(query::query_documents))
        // Document management
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/health", get(health_check))
}

/// GET /api/v1/health
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let pipeline = state.pipeline();
    let embedder_ok = pipeline.embedder().health_check().await.unwrap_or(false);
    let llm_ok = pipeline.llm().health_check().await.unwrap_or(false);

    Json(json!({
        "status": "healthy",
        "service": "RAG Pipeline API",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": state.registry().len(),
        "indexed_chunks": pipeline.index().len(),
        "embedder": { "name": pipeline.embedder().name(), "available": embedder_ok },
        "llm": { "model": pipeline.llm().model(), "available": llm_ok },
    }))
}
