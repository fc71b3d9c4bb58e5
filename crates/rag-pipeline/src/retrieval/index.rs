//! Exact cosine-similarity vector index with JSON snapshot persistence
//!
//! Entries are keyed by `(document_id, chunk_index)`. Every mutation is
//! applied under one write lock and, for a persistent index, written to disk
//! through an atomic rename before the call returns. A failed write rolls the
//! in-memory state back so callers never observe a partial batch.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result, ResultExt};
use crate::types::{DocumentId, FragmentKey, IndexEntry, RetrievalResult};

const SNAPSHOT_VERSION: u32 = 1;

/// An entry plus the order in which its key was first inserted
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    seq: u64,
    #[serde(flatten)]
    entry: IndexEntry,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<FragmentKey, StoredEntry>,
    next_seq: u64,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    dimensions: usize,
    next_seq: u64,
    entries: Vec<StoredEntry>,
}

/// Vector index over fragment embeddings
#[derive(Debug)]
pub struct VectorIndex {
    dimensions: usize,
    storage_path: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an index that lives only in memory
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Config("index dimensions must be greater than 0".to_string()));
        }
        Ok(Self {
            dimensions,
            storage_path: None,
            state: RwLock::new(IndexState::default()),
        })
    }

    /// Open (or create) an index persisted at `path`
    ///
    /// An existing snapshot built for a different dimension is rejected.
    pub fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = Self::in_memory(dimensions)?;

        if path.exists() {
            let file = std::fs::File::open(&path)
                .map_err(Error::from)
                .with_context(|| format!("opening vector index {}", path.display()))?;
            let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))
                .map_err(Error::from)
                .with_context(|| format!("reading vector index {}", path.display()))?;

            if snapshot.version != SNAPSHOT_VERSION {
                return Err(Error::vector_index(format!(
                    "unsupported snapshot version {}",
                    snapshot.version
                )));
            }
            if snapshot.dimensions != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: snapshot.dimensions,
                });
            }

            let state = index.state.get_mut();
            state.next_seq = snapshot.next_seq;
            for stored in snapshot.entries {
                state.next_seq = state.next_seq.max(stored.seq + 1);
                state.entries.insert(stored.entry.key(), stored);
            }

            tracing::info!(
                "Loaded vector index from {} ({} entries)",
                path.display(),
                state.entries.len()
            );
        } else if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        index.storage_path = Some(path);
        Ok(index)
    }

    /// Fixed embedding dimension
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct documents with at least one entry
    pub fn document_count(&self) -> usize {
        self.documents().len()
    }

    /// Entry count per document
    pub fn documents(&self) -> BTreeMap<DocumentId, usize> {
        let state = self.state.read();
        let mut counts = BTreeMap::new();
        for key in state.entries.keys() {
            *counts.entry(key.document_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of entries stored for one document
    pub fn chunk_count(&self, document_id: &DocumentId) -> usize {
        self.state
            .read()
            .entries
            .keys()
            .filter(|k| &k.document_id == document_id)
            .count()
    }

    /// Insert or replace entries by key, all or nothing
    ///
    /// A replaced entry keeps its original insertion position.
    pub fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize> {
        for entry in &entries {
            self.check_vector(&entry.vector)?;
        }
        if entries.is_empty() {
            return Ok(0);
        }

        let count = entries.len();
        let mut state = self.state.write();
        let prev_next_seq = state.next_seq;
        let mut undo: Vec<(FragmentKey, Option<StoredEntry>)> = Vec::with_capacity(count);

        for entry in entries {
            let key = entry.key();
            let existing_seq = state.entries.get(&key).map(|e| e.seq);
            let seq = match existing_seq {
                Some(seq) => seq,
                None => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    seq
                }
            };
            let previous = state.entries.insert(key.clone(), StoredEntry { seq, entry });
            undo.push((key, previous));
        }

        if let Err(e) = self.persist(&state) {
            for (key, previous) in undo.into_iter().rev() {
                match previous {
                    Some(stored) => state.entries.insert(key, stored),
                    None => state.entries.remove(&key),
                };
            }
            state.next_seq = prev_next_seq;
            return Err(e.context(format!("persisting {} index entries", count)));
        }

        tracing::debug!("Upserted {} entries ({} total)", count, state.entries.len());
        Ok(count)
    }

    /// Remove every entry of a document; returns how many were removed
    pub fn delete_by_document(&self, document_id: &DocumentId) -> Result<usize> {
        let mut state = self.state.write();

        let keys: Vec<FragmentKey> = state
            .entries
            .keys()
            .filter(|k| &k.document_id == document_id)
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }

        let removed: Vec<(FragmentKey, StoredEntry)> = keys
            .into_iter()
            .filter_map(|k| state.entries.remove(&k).map(|e| (k, e)))
            .collect();

        if let Err(e) = self.persist(&state) {
            for (key, stored) in removed {
                state.entries.insert(key, stored);
            }
            return Err(e.context(format!("deleting entries of document {}", document_id)));
        }

        tracing::info!("Deleted {} entries of document {}", removed.len(), document_id);
        Ok(removed.len())
    }

    /// Top-`k` entries by cosine similarity, best first
    ///
    /// Equal scores keep insertion order. An empty index or `k == 0` yields
    /// an empty list without looking at the query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        self.search_filtered(query, k, None)
    }

    /// Like `search`, restricted to the given documents when a filter is set
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        documents: Option<&[DocumentId]>,
    ) -> Result<Vec<RetrievalResult>> {
        let state = self.state.read();
        if k == 0 || state.entries.is_empty() {
            return Ok(Vec::new());
        }
        self.check_vector(query)?;

        let query_norm = norm(query);

        let mut scored: Vec<(f32, &StoredEntry)> = state
            .entries
            .values()
            .filter(|stored| {
                documents.map_or(true, |docs| docs.contains(&stored.entry.fragment.document_id))
            })
            .map(|stored| (cosine(query, query_norm, &stored.entry.vector), stored))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| match sb.total_cmp(sa) {
            Ordering::Equal => a.seq.cmp(&b.seq),
            other => other,
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, stored)| RetrievalResult {
                fragment_text: stored.entry.fragment.text.clone(),
                metadata: stored.entry.metadata.clone(),
                score,
            })
            .collect())
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidRequest(
                "vector contains non-finite components".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the full state to a temp file beside the snapshot, then rename it into place
    fn persist(&self, state: &IndexState) -> Result<()> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };

        let mut entries: Vec<&StoredEntry> = state.entries.values().collect();
        entries.sort_by_key(|e| e.seq);

        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            version: u32,
            dimensions: usize,
            next_seq: u64,
            entries: Vec<&'a StoredEntry>,
        }

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(
                &mut writer,
                &SnapshotRef {
                    version: SNAPSHOT_VERSION,
                    dimensions: self.dimensions,
                    next_seq: state.next_seq,
                    entries,
                },
            )?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Run a blocking index operation off the async executor
pub async fn run_blocking<T, F>(index: &Arc<VectorIndex>, op: F) -> Result<T>
where
    F: FnOnce(&VectorIndex) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let index = Arc::clone(index);
    tokio::task::spawn_blocking(move || op(&index))
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

// Accumulated in f64 so large finite components cannot overflow
fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Cosine similarity; zero when either vector has zero norm or the score is not finite
fn cosine(query: &[f32], query_norm: f64, other: &[f32]) -> f32 {
    let other_norm = norm(other);
    if query_norm == 0.0 || other_norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = query
        .iter()
        .zip(other)
        .map(|(&a, &b)| f64::from(a) * f64::from(b))
        .sum();
    let score = (dot / (query_norm * other_norm)) as f32;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
