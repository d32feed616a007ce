//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] is a zero-dependency backend over a `HashMap`
//! behind a `tokio::sync::RwLock`, suitable for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, RetrievedMatch};
use crate::error::Result;
use crate::vectorstore::{IndexStats, VectorStore};

/// An in-memory [`VectorStore`] ranking by cosine similarity.
///
/// Records are keyed by chunk id, so upsert is idempotent for free.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, Chunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two vectors; 0.0 if either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let mut records = self.records.write().await;
        for chunk in chunks {
            records.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>> {
        let records = self.records.read().await;

        let mut scored: Vec<RetrievedMatch> = records
            .values()
            .filter(|chunk| source_filter.is_none_or(|s| chunk.source == s))
            .map(|chunk| RetrievedMatch {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                index: chunk.index,
                score: cosine_similarity(&chunk.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        let mut records = self.records.write().await;
        for id in ids {
            records.remove(*id);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let records = self.records.read().await;
        let dimension = records.values().next().map(|c| c.embedding.len()).unwrap_or(0);
        Ok(IndexStats { vector_count: records.len(), dimension })
    }
}
