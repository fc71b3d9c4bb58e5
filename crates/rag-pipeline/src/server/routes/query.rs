//! Query endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{Answer, QueryRequest};

/// POST /api/v1/query - Answer a question from the uploaded documents
pub async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\" (top_k={:?})", request.question, request.top_k);

    let answer = state.pipeline().answer(&request).await?;

    tracing::info!(
        "Answered with {} fragments in {}ms",
        answer.context_used,
        start.elapsed().as_millis()
    );

    Ok(Json(answer))
}
