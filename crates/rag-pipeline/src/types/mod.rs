//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{
    DocumentId, EntryMetadata, FileType, Fragment, FragmentKey, IndexEntry, MetadataValue,
};
pub use query::QueryRequest;
pub use response::{
    Answer, DeleteResponse, DocumentListResponse, DocumentSummary, RetrievalResult, UploadResponse,
};
