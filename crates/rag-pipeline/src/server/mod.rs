//! HTTP server for the RAG pipeline

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new RAG server
    pub fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create from prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(|| async { "OK" }))
            .nest(
                "/api/v1",
                routes::api_routes(self.config.server.max_upload_size),
            )
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::AnswerComposer;
    use crate::ingestion::IngestPipeline;
    use crate::pipeline::RagPipeline;
    use crate::registry::DocumentRegistry;
    use crate::retrieval::VectorIndex;
    use crate::testing::{KeywordEmbedder, ScriptedLlm};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "rag-test-boundary";

    fn test_router(upload_dir: &std::path::Path, max_documents: usize) -> Router {
        let mut config = RagConfig::default();
        config.documents.upload_dir = upload_dir.to_path_buf();
        config.documents.max_documents = max_documents;

        let keywords = ["refund", "shipping", "warranty"];
        let pipeline = RagPipeline::new(
            IngestPipeline::from_config(&config).unwrap(),
            Arc::new(VectorIndex::in_memory(keywords.len()).unwrap()),
            Arc::new(KeywordEmbedder::new(&keywords)),
            Arc::new(ScriptedLlm::replying("Refunds take 5 days.")),
            AnswerComposer::default(),
            0.7,
        )
        .unwrap();
        let registry = DocumentRegistry::in_memory(max_documents);

        RagServer::with_state(AppState::from_parts(config, pipeline, registry)).build_router()
    }

    fn upload_request(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content
        );
        Request::post("/api/v1/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn query_request(question: &str) -> Request<Body> {
        Request::post("/api/v1/query")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "question": question, "top_k": 5 }).to_string(),
            ))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path(), 20);

        let health = Request::get("/api/v1/health").body(Body::empty()).unwrap();
        let (status, body) = send(&router, health).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["documents"], 0);
    }

    #[tokio::test]
    async fn test_upload_query_delete_flow() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path(), 20);

        let upload = upload_request("policy.txt", "Our refund window is 30 days.");
        let (status, body) = send(&router, upload).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["filename"], "policy.txt");
        assert_eq!(body["chunks"], 1);
        assert_eq!(body["pages"], 1);
        let id = body["document_id"].as_str().unwrap().to_string();

        let (status, body) = send(&router, query_request("How do refunds work?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Refunds take 5 days.");
        assert_eq!(body["sources"], serde_json::json!(["policy.txt"]));
        assert_eq!(body["context_used"], 1);

        let list = Request::get("/api/v1/documents").body(Body::empty()).unwrap();
        let (status, body) = send(&router, list).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_documents"], 1);

        let delete = Request::delete(format!("/api/v1/documents/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_chunks"], 1);

        let (_, body) = send(&router, query_request("How do refunds work?")).await;
        assert_eq!(body["context_used"], 0);
        assert_eq!(body["answer"], crate::types::Answer::NO_INFORMATION);

        // Stored copy is gone
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path(), 2);

        let (status, body) = send(&router, upload_request("sheet.xlsx", "a,b")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "unsupported_type");

        let (status, _) = send(&router, upload_request("a.txt", "refund")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, upload_request("a.txt", "shipping")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "duplicate_document");

        // Same text under another name
        let (status, body) = send(&router, upload_request("b.txt", "refund")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "duplicate_document");

        let (status, _) = send(&router, upload_request("c.txt", "warranty")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, upload_request("d.txt", "shipping")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "document_limit");

        // Only the two accepted uploads were kept
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_document() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path(), 20);

        let delete = Request::delete("/api/v1/documents/999").body(Body::empty()).unwrap();
        let (status, body) = send(&router, delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }
}
