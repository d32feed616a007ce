//! Vector store trait: persist embedded chunks and answer similarity queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Chunk, RetrievedMatch};
use crate::error::Result;

/// Summary statistics for the store's configured index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of stored records.
    pub vector_count: usize,
    /// The index's vector dimension.
    pub dimension: usize,
}

/// A storage backend holding (vector, metadata) records for one configured
/// index, with nearest-neighbor queries.
///
/// A store instance is bound to a single index/namespace at construction;
/// the backend creates it on first use if absent. The core never implements
/// the similarity search itself — it relies on the backend ranking by
/// cosine (or dot-product) similarity, higher score = closer.
///
/// # Example
///
/// ```rust,ignore
/// use apologia_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&chunks).await?;
/// let matches = store.query(&query_embedding, 5, Some("apologetics-library")).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert chunks (embeddings must be set). Idempotent by chunk id:
    /// re-upserting an id replaces its vector and metadata.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Return up to `top_k` matches ordered by descending score, optionally
    /// restricted to records whose source equals `source_filter`.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>>;

    /// Delete records by id.
    async fn delete(&self, ids: &[&str]) -> Result<()>;

    /// Report record count and dimension for the configured index.
    async fn stats(&self) -> Result<IndexStats>;
}
