//! Pinecone vector store backend.
//!
//! Talks to the Pinecone REST API with `reqwest`: the control plane
//! (`api.pinecone.io`) resolves the configured index's data-plane host,
//! creating the index on first use if it is absent; the data plane serves
//! upsert, query, delete, and stats. Chunk metadata is stored as
//! `{text, source, chunk_index}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::document::{Chunk, RetrievedMatch};
use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;
use crate::vectorstore::{IndexStats, VectorStore};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Connection settings for a [`PineconeVectorStore`].
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    /// The index this store is bound to; created on first use if absent.
    pub index_name: String,
    /// Vector dimension used when the index must be created.
    pub dimension: usize,
    /// Serverless region for index creation.
    pub region: String,
}

impl PineconeConfig {
    /// Validate required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key or index name is empty,
    /// or the dimension is zero.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(RagError::Config("Pinecone API key must not be empty".to_string()));
        }
        if self.index_name.is_empty() {
            return Err(RagError::Config("Pinecone index name must not be empty".to_string()));
        }
        if self.dimension == 0 {
            return Err(RagError::Config("Pinecone index dimension must be nonzero".to_string()));
        }
        Ok(())
    }
}

/// A [`VectorStore`] backed by a single Pinecone index.
///
/// The data-plane host is resolved lazily on the first call and cached for
/// the life of the store. Data-plane calls go through a bounded retry with
/// backoff, so a rate-limited upsert surfaces as a [`RagError::Provider`]
/// only after retries are exhausted.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    config: PineconeConfig,
    host: tokio::sync::OnceCell<String>,
    retry: RetryPolicy,
}

impl PineconeVectorStore {
    /// Create a store bound to the configured index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: PineconeConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config, host: tokio::sync::OnceCell::new(), retry: RetryPolicy::default() })
    }

    fn map_transport(err: reqwest::Error) -> RagError {
        if err.is_timeout() || err.is_connect() {
            RagError::provider_retryable("pinecone", format!("request failed: {err}"))
        } else {
            RagError::provider("pinecone", format!("request failed: {err}"))
        }
    }

    async fn map_status(response: reqwest::Response) -> RagError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let retryable = status.as_u16() == 429 || status.is_server_error();
        RagError::Provider {
            provider: "pinecone".to_string(),
            message: format!("API returned {status}: {body}"),
            retryable,
        }
    }

    /// Resolve (and cache) the data-plane host, creating the index if needed.
    async fn data_plane_host(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| async {
                match self.describe_index().await? {
                    Some(description) => Ok(description.host_url()),
                    None => {
                        info!(index = %self.config.index_name, dimension = self.config.dimension,
                            "pinecone index absent, creating");
                        self.create_index().await?;
                        let description = self.describe_index().await?.ok_or_else(|| {
                            RagError::provider(
                                "pinecone",
                                format!("index '{}' missing after creation", self.config.index_name),
                            )
                        })?;
                        Ok(description.host_url())
                    }
                }
            })
            .await
            .map(String::as_str)
    }

    /// Describe the configured index; `None` if it does not exist.
    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let url = format!("{CONTROL_PLANE_URL}/indexes/{}", self.config.index_name);
        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.config.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::map_status(response).await);
        }

        let description: IndexDescription = response.json().await.map_err(|e| {
            RagError::provider("pinecone", format!("failed to parse index description: {e}"))
        })?;
        Ok(Some(description))
    }

    async fn create_index(&self) -> Result<()> {
        let body = json!({
            "name": self.config.index_name,
            "dimension": self.config.dimension,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": self.config.region } },
        });

        let response = self
            .client
            .post(format!("{CONTROL_PLANE_URL}/indexes"))
            .header("Api-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport)?;

        // 409: another caller created it between describe and create.
        if !response.status().is_success() && response.status().as_u16() != 409 {
            return Err(Self::map_status(response).await);
        }
        Ok(())
    }

    async fn data_plane_post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let host = self.data_plane_host().await?;
        let url = format!("{host}/{path}");

        self.retry
            .run(path, || async {
                let response = self
                    .client
                    .post(&url)
                    .header("Api-Key", &self.config.api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(Self::map_transport)?;

                if !response.status().is_success() {
                    return Err(Self::map_status(response).await);
                }
                response.json::<T>().await.map_err(|e| {
                    RagError::provider("pinecone", format!("failed to parse response: {e}"))
                })
            })
            .await
    }
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

impl IndexDescription {
    fn host_url(&self) -> String {
        if self.host.starts_with("http") {
            self.host.clone()
        } else {
            format!("https://{}", self.host)
        }
    }
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: serde_json::Value,
}

#[derive(Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount")]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(rename = "totalVectorCount", default)]
    total_vector_count: usize,
    #[serde(default)]
    dimension: usize,
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let vectors: Vec<UpsertVector<'_>> = chunks
            .iter()
            .map(|chunk| UpsertVector {
                id: &chunk.id,
                values: &chunk.embedding,
                metadata: json!({
                    "text": chunk.text,
                    "source": chunk.source,
                    "chunk_index": chunk.index,
                }),
            })
            .collect();

        let body = json!({ "vectors": vectors });
        let response: UpsertResponse = self.data_plane_post("vectors/upsert", &body).await?;

        debug!(index = %self.config.index_name, count = response.upserted_count, "upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>> {
        let mut body = json!({
            "vector": embedding,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(source) = source_filter {
            body["filter"] = json!({ "source": { "$eq": source } });
        }

        let response: QueryResponse = self.data_plane_post("query", &body).await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| RetrievedMatch {
                id: m.id,
                text: m.metadata["text"].as_str().unwrap_or_default().to_string(),
                source: m.metadata["source"].as_str().unwrap_or("unknown").to_string(),
                index: m.metadata["chunk_index"].as_u64().unwrap_or(0) as usize,
                score: m.score,
            })
            .collect())
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "ids": ids });
        let _: serde_json::Value = self.data_plane_post("vectors/delete", &body).await?;
        debug!(index = %self.config.index_name, count = ids.len(), "deleted vectors");
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let body = json!({});
        let response: StatsResponse = self.data_plane_post("describe_index_stats", &body).await?;
        Ok(IndexStats { vector_count: response.total_vector_count, dimension: response.dimension })
    }
}
