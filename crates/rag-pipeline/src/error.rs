//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, used for propagation policy and HTTP mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal at startup or construction (bad chunk settings, dimension mismatch)
    Configuration,
    /// Caller's fault; the request was rejected before any index mutation
    Validation,
    /// An external collaborator (embedding service, generation model) failed
    Dependency,
    /// The referenced document does not exist
    NotFound,
    /// Anything else (I/O, serialization, index persistence)
    Internal,
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vector dimension differs from the configured index dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Document exceeds the configured page limit
    #[error("Document has {pages} pages, exceeding the maximum of {max_pages}")]
    DocumentTooLarge { pages: usize, max_pages: usize },

    /// A document with the same original filename is already registered
    #[error("Document already uploaded: {0}")]
    DuplicateDocument(String),

    /// Registry is full
    #[error("Maximum document limit ({0}) reached")]
    DocumentLimitReached(usize),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Generation capability failed
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// An error annotated with the operation that produced it
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationUnavailable(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Wrap this error with a description of the failing operation
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::Config(_) | Error::DimensionMismatch { .. } => ErrorKind::Configuration,
            Error::UnsupportedFileType(_)
            | Error::DocumentTooLarge { .. }
            | Error::DuplicateDocument(_)
            | Error::DocumentLimitReached(_)
            | Error::InvalidRequest(_) => ErrorKind::Validation,
            Error::Embedding(_) | Error::GenerationUnavailable(_) => ErrorKind::Dependency,
            Error::DocumentNotFound(_) => ErrorKind::NotFound,
            Error::FileParse { .. }
            | Error::VectorIndex(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_)
            | Error::Context { .. } => ErrorKind::Internal,
        }
    }
}

/// Extension for attaching context to fallible results
pub trait ResultExt<T> {
    /// Annotate the error (if any) with the failing operation
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Lazily annotate the error (if any)
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let error_type = match self.root() {
            Error::Config(_) => "config_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::UnsupportedFileType(_) => "unsupported_type",
            Error::DocumentTooLarge { .. } => "document_too_large",
            Error::DuplicateDocument(_) => "duplicate_document",
            Error::DocumentLimitReached(_) => "document_limit",
            Error::InvalidRequest(_) => "invalid_request",
            Error::FileParse { .. } => "parse_error",
            Error::Embedding(_) => "embedding_error",
            Error::GenerationUnavailable(_) => "llm_error",
            Error::VectorIndex(_) => "vector_index_error",
            Error::DocumentNotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) | Error::Context { .. } => "internal_error",
        };

        let status = match self.kind() {
            ErrorKind::Configuration | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Dependency => match self.root() {
                Error::GenerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_looks_through_context() {
        let err = Error::embedding("connection refused")
            .context("embedding 3 chunks for document 42");

        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(matches!(err.root(), Error::Embedding(_)));
        assert!(err.to_string().contains("document 42"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_taxonomy() {
        assert_eq!(
            Error::DimensionMismatch { expected: 384, actual: 768 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::DocumentTooLarge { pages: 1200, max_pages: 1000 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::DuplicateDocument("a.pdf".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::generation("timeout").kind(), ErrorKind::Dependency);
        assert_eq!(Error::DocumentNotFound("7".into()).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_status_mapping() {
        let response = Error::UnsupportedFileType("xls".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::generation("model offline")
            .context("answering question")
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = Error::DocumentNotFound("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
