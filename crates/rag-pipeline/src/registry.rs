//! Registry of uploaded documents
//!
//! Issues document ids, enforces the document limit and uniqueness of both
//! filename and extracted content, and keeps upload bookkeeping in a JSON
//! file. The index never reads it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{DocumentId, DocumentSummary, FileType};

/// One uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    /// Filename as uploaded
    pub filename: String,
    /// Name of the stored copy inside the upload directory
    pub stored_filename: String,
    pub file_path: PathBuf,
    pub file_type: FileType,
    pub page_count: usize,
    pub chunk_count: usize,
    /// Size in bytes
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub processed: bool,
    /// SHA-256 of the extracted text; empty for records written before hashing
    #[serde(default)]
    pub content_hash: String,
}

impl DocumentRecord {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            file_type: self.file_type,
            pages: self.page_count,
            chunks: self.chunk_count,
            uploaded_at: self.uploaded_at,
            processed: self.processed,
            file_size_kb: (self.file_size as f64 / 1024.0 * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    next_id: i64,
    documents: Vec<DocumentRecord>,
}

/// Document registry with optional JSON persistence
#[derive(Debug)]
pub struct DocumentRegistry {
    path: Option<PathBuf>,
    max_documents: usize,
    data: RwLock<RegistryData>,
}

impl DocumentRegistry {
    /// Registry kept only in memory
    pub fn in_memory(max_documents: usize) -> Self {
        Self {
            path: None,
            max_documents,
            data: RwLock::new(RegistryData {
                next_id: 1,
                documents: Vec::new(),
            }),
        }
    }

    /// Load the registry at `path`, creating it on first write
    pub fn open(path: impl AsRef<Path>, max_documents: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut registry = Self::in_memory(max_documents);

        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let data: RegistryData = serde_json::from_str(&raw)?;
            tracing::info!(
                "Loaded document registry from {} ({} documents)",
                path.display(),
                data.documents.len()
            );
            *registry.data.get_mut() = data;
        } else if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        registry.path = Some(path);
        Ok(registry)
    }

    pub fn max_documents(&self) -> usize {
        self.max_documents
    }

    pub fn len(&self) -> usize {
        self.data.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail if another document could not be added under `filename`
    pub fn check_can_add(&self, filename: &str) -> Result<()> {
        Self::check(&self.data.read(), filename, self.max_documents)
    }

    /// Fail if a registered document already has this extracted text
    pub fn check_content(&self, content_hash: &str) -> Result<()> {
        Self::check_hash(&self.data.read(), content_hash)
    }

    fn check(data: &RegistryData, filename: &str, max_documents: usize) -> Result<()> {
        if data.documents.len() >= max_documents {
            return Err(Error::DocumentLimitReached(max_documents));
        }
        if data.documents.iter().any(|d| d.filename == filename) {
            return Err(Error::DuplicateDocument(filename.to_string()));
        }
        Ok(())
    }

    fn check_hash(data: &RegistryData, content_hash: &str) -> Result<()> {
        if content_hash.is_empty() {
            return Ok(());
        }
        match data.documents.iter().find(|d| d.content_hash == content_hash) {
            Some(existing) => Err(Error::DuplicateDocument(format!(
                "same content as {}",
                existing.filename
            ))),
            None => Ok(()),
        }
    }

    /// Hand out a fresh document id
    ///
    /// Ids are never reused, even if the upload that reserved one fails.
    pub fn allocate_id(&self) -> Result<DocumentId> {
        let mut data = self.data.write();
        let id = data.next_id;
        data.next_id += 1;
        self.persist(&data)?;
        Ok(DocumentId::from(id))
    }

    /// Record a processed document; limit and uniqueness are checked again
    pub fn insert(&self, record: DocumentRecord) -> Result<()> {
        let mut data = self.data.write();
        Self::check(&data, &record.filename, self.max_documents)?;
        Self::check_hash(&data, &record.content_hash)?;

        tracing::info!("Registered document {} ({})", record.id, record.filename);
        data.documents.push(record);

        if let Err(e) = self.persist(&data) {
            data.documents.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.data
            .read()
            .documents
            .iter()
            .find(|d| &d.id == id)
            .cloned()
    }

    /// All documents, newest upload first
    pub fn list(&self) -> Vec<DocumentRecord> {
        let mut documents = self.data.read().documents.clone();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        documents
    }

    /// Remove a document's record
    pub fn remove(&self, id: &DocumentId) -> Result<DocumentRecord> {
        let mut data = self.data.write();
        let position = data
            .documents
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        let record = data.documents.remove(position);
        if let Err(e) = self.persist(&data) {
            data.documents.insert(position, record);
            return Err(e);
        }
        Ok(record)
    }

    fn persist(&self, data: &RegistryData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, data)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ingestion::parser::hash_content;

    fn record(registry: &DocumentRegistry, filename: &str) -> DocumentRecord {
        DocumentRecord {
            id: registry.allocate_id().unwrap(),
            filename: filename.to_string(),
            stored_filename: format!("stored_{}", filename),
            file_path: PathBuf::from(format!("/tmp/stored_{}", filename)),
            file_type: FileType::from_filename(filename).unwrap(),
            page_count: 1,
            chunk_count: 3,
            file_size: 2048,
            uploaded_at: Utc::now(),
            processed: true,
            content_hash: hash_content(filename),
        }
    }

    #[test]
    fn test_duplicate_filename_rejected() {
        let registry = DocumentRegistry::in_memory(20);
        registry.insert(record(&registry, "policy.pdf")).unwrap();

        let err = registry.check_can_add("policy.pdf").unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(registry.insert(record(&registry, "policy.pdf")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_content_rejected() {
        let registry = DocumentRegistry::in_memory(20);
        registry.insert(record(&registry, "policy.pdf")).unwrap();

        let same_text = hash_content("policy.pdf");
        let err = registry.check_content(&same_text).unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(ref m) if m.contains("policy.pdf")));

        let mut renamed = record(&registry, "copy.pdf");
        renamed.content_hash = same_text;
        assert!(matches!(registry.insert(renamed), Err(Error::DuplicateDocument(_))));
        assert_eq!(registry.len(), 1);

        // Legacy records without a hash never collide
        assert!(registry.check_content("").is_ok());
    }

    #[test]
    fn test_document_limit() {
        let registry = DocumentRegistry::in_memory(2);
        registry.insert(record(&registry, "a.txt")).unwrap();
        registry.insert(record(&registry, "b.txt")).unwrap();

        assert!(matches!(
            registry.check_can_add("c.txt"),
            Err(Error::DocumentLimitReached(2))
        ));
    }

    #[test]
    fn test_ids_are_unique_and_sequential() {
        let registry = DocumentRegistry::in_memory(20);
        assert_eq!(registry.allocate_id().unwrap().as_str(), "1");
        assert_eq!(registry.allocate_id().unwrap().as_str(), "2");
    }

    #[test]
    fn test_remove_and_not_found() {
        let registry = DocumentRegistry::in_memory(20);
        let rec = record(&registry, "a.txt");
        let id = rec.id.clone();
        registry.insert(rec).unwrap();

        assert_eq!(registry.remove(&id).unwrap().filename, "a.txt");
        assert!(registry.get(&id).is_none());
        let err = registry.remove(&id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");

        {
            let registry = DocumentRegistry::open(&path, 20).unwrap();
            registry.insert(record(&registry, "a.txt")).unwrap();
        }

        let registry = DocumentRegistry::open(&path, 20).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].filename, "a.txt");
        // Ids continue after the last one handed out
        assert_eq!(registry.allocate_id().unwrap().as_str(), "2");
    }

    #[test]
    fn test_summary_size_in_kb() {
        let registry = DocumentRegistry::in_memory(20);
        let summary = record(&registry, "a.txt").summary();
        assert_eq!(summary.file_size_kb, 2.0);
        assert_eq!(summary.chunks, 3);
    }
}
