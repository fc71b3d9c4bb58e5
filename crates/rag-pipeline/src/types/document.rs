//! Document, fragment and index-entry types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque key correlating fragments to a source document.
///
/// The registry issues sequential integers; the pipeline only compares and
/// stores the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document id from any string-like key
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Legacy Word document (.doc), read with the DOCX reader
    Doc,
    /// Plain text file
    Txt,
}

impl FileType {
    /// Detect file type from extension; `None` for anything unsupported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Detect file type from a filename's last extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Canonical extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Unique identity of a fragment within an index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentKey {
    pub document_id: DocumentId,
    pub chunk_index: u32,
}

/// A contiguous piece of a source document; the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Text content
    pub text: String,
    /// Owning document
    pub document_id: DocumentId,
    /// Position of the fragment within its document (0..N-1)
    pub chunk_index: u32,
    /// Original filename, used for source attribution
    pub source_filename: String,
}

impl Fragment {
    /// Create a new fragment
    pub fn new(
        document_id: DocumentId,
        chunk_index: u32,
        source_filename: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            document_id,
            chunk_index,
            source_filename: source_filename.into(),
        }
    }

    /// `(document_id, chunk_index)` identity
    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            document_id: self.document_id.clone(),
            chunk_index: self.chunk_index,
        }
    }
}

/// Scalar metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for MetadataValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Entry metadata: two required keys plus an open, caller-supplied extension map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub document_id: DocumentId,
    pub source_filename: String,
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl EntryMetadata {
    /// Look up any key, including the required ones
    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        match key {
            "document_id" => Some(MetadataValue::Text(self.document_id.to_string())),
            "source_filename" => Some(MetadataValue::Text(self.source_filename.clone())),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// A fragment, its vector and its metadata, as stored in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub fragment: Fragment,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Build an entry; required metadata keys are derived from the fragment
    /// and `chunk_index` is recorded alongside caller-supplied keys.
    pub fn new(
        fragment: Fragment,
        vector: Vec<f32>,
        mut extra: BTreeMap<String, MetadataValue>,
    ) -> Self {
        extra.remove("document_id");
        extra.remove("source_filename");
        extra.insert("chunk_index".to_string(), fragment.chunk_index.into());

        let metadata = EntryMetadata {
            document_id: fragment.document_id.clone(),
            source_filename: fragment.source_filename.clone(),
            extra,
        };

        Self {
            fragment,
            vector,
            metadata,
        }
    }

    /// Identity of the wrapped fragment
    pub fn key(&self) -> FragmentKey {
        self.fragment.key()
    }
}
