//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::registry::DocumentRecord;
use crate::server::state::AppState;
use crate::types::{FileType, MetadataValue, UploadResponse};

/// POST /api/v1/upload - Upload, extract, chunk and index one document
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let (filename, data) = read_file_field(&mut multipart).await?;

    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let file_type = FileType::from_filename(&filename).ok_or_else(|| {
        Error::UnsupportedFileType(format!("{} (supported: PDF, DOCX, DOC, TXT)", filename))
    })?;

    let _claim = state.claim_upload(&filename)?;
    state.registry().check_can_add(&filename)?;

    let stored_filename = format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), filename);
    let file_path = state.config().documents.upload_dir.join(&stored_filename);
    tokio::fs::create_dir_all(&state.config().documents.upload_dir).await?;
    tokio::fs::write(&file_path, &data).await?;

    let processed = process_upload(
        &state,
        &filename,
        stored_filename,
        file_path.clone(),
        file_type,
        data,
    )
    .await;

    match processed {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!("Upload of {} failed, removing stored file: {}", filename, e);
            if let Err(rm) = tokio::fs::remove_file(&file_path).await {
                tracing::warn!("Could not remove {}: {}", file_path.display(), rm);
            }
            Err(e)
        }
    }
}

async fn process_upload(
    state: &AppState,
    filename: &str,
    stored_filename: String,
    file_path: PathBuf,
    file_type: FileType,
    data: Vec<u8>,
) -> Result<UploadResponse> {
    let pipeline = state.pipeline();
    let file_size = data.len() as u64;

    let ingest = pipeline.ingestion().clone();
    let parse_name = filename.to_string();
    let extracted = tokio::task::spawn_blocking(move || ingest.parse_file(&parse_name, &data))
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
    state.registry().check_content(&extracted.content_hash)?;

    let document_id = state.registry().allocate_id()?;

    let mut extra = BTreeMap::new();
    extra.insert("file_type".to_string(), MetadataValue::from(file_type.extension()));
    extra.insert(
        "page_count".to_string(),
        MetadataValue::Int(extracted.page_count as i64),
    );

    let outcome = pipeline
        .ingest_text(&document_id, filename, &extracted.text, extra)
        .await?;

    let record = DocumentRecord {
        id: document_id.clone(),
        filename: filename.to_string(),
        stored_filename,
        file_path,
        file_type,
        page_count: extracted.page_count,
        chunk_count: outcome.chunk_count,
        file_size,
        uploaded_at: Utc::now(),
        processed: true,
        content_hash: extracted.content_hash,
    };

    if let Err(e) = state.registry().insert(record) {
        // Keep the index consistent with the registry
        pipeline.delete_document(&document_id).await?;
        return Err(e);
    }

    Ok(UploadResponse {
        message: "Document uploaded and processed successfully".to_string(),
        document_id,
        filename: filename.to_string(),
        pages: extracted.page_count,
        chunks: outcome.chunk_count,
    })
}

/// Pull the first multipart field that carries a filename
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        // Never trust client paths
        let filename = Path::new(&raw_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidRequest(format!("Invalid filename: {}", raw_name)))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read file: {}", e)))?;

        return Ok((filename, data.to_vec()));
    }

    Err(Error::InvalidRequest("No file field in upload".to_string()))
}
