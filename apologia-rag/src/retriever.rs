//! Retrieval: embed the question, query the store, filter by score.

use std::sync::Arc;

use tracing::debug;

use crate::document::RetrievedMatch;
use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// Retrieves the stored chunks most similar to a question.
///
/// The question goes through the same [`EmbeddingClient`] as ingestion, so
/// queries and chunks share one preprocessing path. Matches scoring below
/// `score_threshold` are discarded rather than force-fed into the prompt as
/// false context; an empty result is a valid state, not an error.
pub struct Retriever {
    embedder: EmbeddingClient,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    score_threshold: f32,
}

impl Retriever {
    pub fn new(
        embedder: EmbeddingClient,
        store: Arc<dyn VectorStore>,
        top_k: usize,
        score_threshold: f32,
    ) -> Self {
        Self { embedder, store, top_k, score_threshold }
    }

    /// Retrieve up to `top_k` matches for `question`, optionally restricted
    /// to one source, ordered by descending score.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Provider`](crate::error::RagError::Provider) if
    /// the embedding or vector-store call fails after retries.
    pub async fn retrieve(
        &self,
        question: &str,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>> {
        let query_embedding = self.embedder.embed_one(question).await?;
        let matches = self.store.query(&query_embedding, self.top_k, source_filter).await?;

        let before = matches.len();
        let filtered: Vec<RetrievedMatch> =
            matches.into_iter().filter(|m| m.score >= self.score_threshold).collect();

        debug!(
            requested = self.top_k,
            returned = before,
            kept = filtered.len(),
            threshold = self.score_threshold,
            "retrieval complete"
        );
        Ok(filtered)
    }
}
