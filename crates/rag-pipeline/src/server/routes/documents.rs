//! Document management endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DeleteResponse, DocumentId, DocumentListResponse, DocumentSummary};

/// GET /api/v1/documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents: Vec<DocumentSummary> = state
        .registry()
        .list()
        .iter()
        .map(|record| record.summary())
        .collect();

    Ok(Json(DocumentListResponse {
        total_documents: documents.len(),
        documents,
    }))
}

/// GET /api/v1/documents/:id - Get a specific document
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentSummary>> {
    let id = DocumentId::new(id);
    let record = state
        .registry()
        .get(&id)
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

    Ok(Json(record.summary()))
}

/// DELETE /api/v1/documents/:id - Delete a document, its stored file and its index entries
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = DocumentId::new(id);
    if state.registry().get(&id).is_none() {
        return Err(Error::DocumentNotFound(id.to_string()));
    }

    let deleted_chunks = state.pipeline().delete_document(&id).await?;
    let record = state.registry().remove(&id)?;

    if record.file_path.exists() {
        if let Err(e) = tokio::fs::remove_file(&record.file_path).await {
            tracing::warn!("Could not remove {}: {}", record.file_path.display(), e);
        }
    }

    tracing::info!(
        "Deleted document '{}' and {} chunks",
        record.filename,
        deleted_chunks
    );

    Ok(Json(DeleteResponse {
        message: "Document deleted successfully".to_string(),
        document_id: id,
        deleted_chunks,
    }))
}
