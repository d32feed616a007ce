//! Embedding provider trait and the batching, retrying embedding client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// A provider that turns a batch of texts into fixed-dimension vectors.
///
/// Implementations wrap a specific hosted backend behind a single capability
/// method: one call, one request, order-preserving output. Batching and retry
/// live above this trait in [`EmbeddingClient`], so backends stay thin and
/// tests can substitute deterministic fakes.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one batch of texts in a single request.
    ///
    /// Must return exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The dimensionality of every vector this provider produces.
    fn dimensions(&self) -> usize;
}

/// Tuning for [`EmbeddingClient`] batching and retry.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of texts per provider request.
    pub max_batch_size: usize,
    /// Bounded retry for rate-limit and transient failures.
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            retry: RetryPolicy { max_attempts: 3, base_delay: Duration::from_secs(1) },
        }
    }
}

impl BatchConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `max_batch_size` or
    /// `retry.max_attempts` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(RagError::Config("max_batch_size must be greater than zero".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(RagError::Config("retry max_attempts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Embeds texts through an [`EmbeddingProvider`] with batching and bounded
/// retry.
///
/// Requests are grouped into batches of at most `max_batch_size` and issued
/// sequentially — the bottleneck is the provider's quota, not local compute.
/// Output order matches input order by construction: every batch writes its
/// vectors back into position-indexed slots, so a reordering bug cannot
/// silently corrupt the chunk-to-vector association.
///
/// A single query embedding is the one-item case of the same path, which
/// guarantees queries and chunks get identical preprocessing.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    config: BatchConfig,
}

impl EmbeddingClient {
    /// Create a client over `provider` with the given batching config.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the config fails validation.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    /// The provider's fixed embedding dimension.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed `texts`, returning one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Provider`] after retries are exhausted, or
    /// [`RagError::Config`] if the provider returns vectors of the wrong
    /// dimension — a dimension mismatch is a setup fault, not a transient one.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected_dim = self.provider.dimensions();
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        for (batch_no, batch_start) in (0..texts.len()).step_by(self.config.max_batch_size).enumerate() {
            let batch_end = (batch_start + self.config.max_batch_size).min(texts.len());
            let batch = &texts[batch_start..batch_end];

            debug!(batch_no, batch_size = batch.len(), "embedding batch");

            let vectors = self
                .config
                .retry
                .run("embed_batch", || self.provider.embed_batch(batch))
                .await?;

            if vectors.len() != batch.len() {
                return Err(RagError::provider(
                    "embedding",
                    format!(
                        "batch {batch_no} returned {} vectors for {} inputs",
                        vectors.len(),
                        batch.len()
                    ),
                ));
            }

            for (offset, vector) in vectors.into_iter().enumerate() {
                if vector.len() != expected_dim {
                    return Err(RagError::Config(format!(
                        "embedding dimension mismatch: expected {expected_dim}, got {} \
                         (batch {batch_no}, item {offset})",
                        vector.len()
                    )));
                }
                slots[batch_start + offset] = Some(vector);
            }
        }

        // Every slot is filled by construction; an empty one is a logic bug.
        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    RagError::provider("embedding", format!("no vector produced for input {i}"))
                })
            })
            .collect()
    }

    /// Embed a single query text — the degenerate one-item case of
    /// [`embed`](Self::embed), not a separate code path.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed(&texts).await?;
        vectors.pop().ok_or_else(|| {
            RagError::provider("embedding", "provider returned no vector for query")
        })
    }
}
