//! Question-to-fragments retrieval

use std::sync::Arc;

use crate::error::{Result, ResultExt};
use crate::providers::{embed_checked, EmbeddingProvider};
use crate::types::{DocumentId, RetrievalResult};

use super::index::{run_blocking, VectorIndex};

/// Embeds a question once and returns the fragments scoring at or above a threshold
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Up to `k` fragments with `score >= min_score`, best first
    ///
    /// An empty result means nothing relevant was found; it is not an error.
    pub async fn retrieve(
        &self,
        question: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievalResult>> {
        self.retrieve_filtered(question, k, min_score, None).await
    }

    /// Like `retrieve`, restricted to the given documents when a filter is set
    pub async fn retrieve_filtered(
        &self,
        question: &str,
        k: usize,
        min_score: f32,
        documents: Option<Vec<DocumentId>>,
    ) -> Result<Vec<RetrievalResult>> {
        let query = embed_checked(self.embedder.as_ref(), question)
            .await
            .context("embedding question")?;

        let hits = run_blocking(&self.index, move |index| {
            index.search_filtered(&query, k, documents.as_deref())
        })
        .await?;

        let found = hits.len();
        let results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|hit| hit.score >= min_score)
            .collect();

        tracing::debug!(
            "Retrieved {} fragments ({} below threshold {})",
            results.len(),
            found - results.len(),
            min_score
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::KeywordEmbedder;
    use crate::types::{Fragment, IndexEntry};
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;

    const KEYWORDS: [&str; 3] = ["refund", "shipping", "warranty"];

    fn setup() -> (Arc<KeywordEmbedder>, Arc<VectorIndex>, Retriever) {
        let embedder = Arc::new(KeywordEmbedder::new(&KEYWORDS));
        let index = Arc::new(VectorIndex::in_memory(KEYWORDS.len()).unwrap());
        let retriever = Retriever::new(embedder.clone(), index.clone());
        (embedder, index, retriever)
    }

    fn add(index: &VectorIndex, embedder: &KeywordEmbedder, doc: &str, i: u32, text: &str) {
        let fragment = Fragment::new(DocumentId::new(doc), i, format!("{}.txt", doc), text);
        let vector = embedder.vector_for(text);
        index
            .upsert(vec![IndexEntry::new(fragment, vector, BTreeMap::new())])
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_index() {
        let (_, _, retriever) = setup();
        let results = retriever.retrieve("anything", 5, 0.7).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_threshold_filters_and_keeps_order() {
        let (embedder, index, retriever) = setup();
        add(&index, &embedder, "a", 0, "refund within 5 days");
        add(&index, &embedder, "a", 1, "refund and shipping costs");
        add(&index, &embedder, "b", 0, "warranty lasts two years");

        let results = retriever.retrieve("refund policy", 5, 0.5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].fragment_text, "refund within 5 days");
        assert_eq!(results[1].fragment_text, "refund and shipping costs");
        assert!(results.iter().all(|r| r.score >= 0.5));
        assert!(results[0].score >= results[1].score);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_threshold_above_all_scores() {
        let (embedder, index, retriever) = setup();
        add(&index, &embedder, "a", 0, "shipping takes a week");

        let results = retriever.retrieve("refund policy", 5, 0.7).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_k_caps_results() {
        let (embedder, index, retriever) = setup();
        for i in 0..4 {
            add(&index, &embedder, "a", i, "refund");
        }

        let results = retriever.retrieve("refund", 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_document_filter() {
        let (embedder, index, retriever) = setup();
        add(&index, &embedder, "a", 0, "refund in a");
        add(&index, &embedder, "b", 0, "refund in b");

        let results = retriever
            .retrieve_filtered("refund", 5, 0.0, Some(vec![DocumentId::new("b")]))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id().as_str(), "b");
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let (embedder, index, retriever) = setup();
        add(&index, &embedder, "a", 0, "refund");
        embedder.fail.store(true, Ordering::SeqCst);

        let err = retriever.retrieve("refund", 5, 0.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
    }
}
