//! # apologia-server
//!
//! HTTP surface for the Apologia RAG chat service: an axum router exposing
//! `POST /chat`, `GET /usage`, and `GET /health`, with per-client usage
//! limits and the production wiring (OpenAI + Pinecone) behind it.
//!
//! The retrieval core lives in `apologia-rag`; this crate is glue — routing,
//! configuration, limits — and holds the only shared mutable state in the
//! service (the usage counters).

pub mod config;
pub mod routes;
pub mod usage;

use std::sync::Arc;

use apologia_rag::{
    AnswerGenerator, BatchConfig, ChatPipeline, EmbeddingClient, FixedSizeChunker,
    GenerationParams, IngestionPipeline, OpenAIChatModel, OpenAIEmbeddings, PineconeConfig,
    PineconeVectorStore, PromptAssembler, Result, Retriever,
};
use tracing::info;

pub use config::AppConfig;
pub use routes::{AppState, ChatRequest, ChatResponse, build_router};
pub use usage::{UsageLimiter, UsageLimits};

/// Production wiring: the embedding client and vector store shared by the
/// chat and ingestion pipelines.
///
/// # Errors
///
/// Returns [`apologia_rag::RagError::Config`] if any capability is
/// misconfigured (empty keys, inconsistent knobs).
pub fn build_backends(
    config: &AppConfig,
) -> Result<(EmbeddingClient, Arc<PineconeVectorStore>)> {
    let embedder = EmbeddingClient::new(
        Arc::new(OpenAIEmbeddings::new(&config.openai_api_key, &config.embedding_model)?),
        BatchConfig::default(),
    )?;

    let store = Arc::new(PineconeVectorStore::new(PineconeConfig {
        api_key: config.pinecone_api_key.clone(),
        index_name: config.pinecone_index_name.clone(),
        dimension: embedder.dimensions(),
        region: config.pinecone_region.clone(),
    })?);

    Ok((embedder, store))
}

/// Build the production [`ChatPipeline`] from configuration.
pub fn build_chat_pipeline(config: &AppConfig) -> Result<ChatPipeline> {
    let (embedder, store) = build_backends(config)?;

    let retriever =
        Retriever::new(embedder, store, config.rag.top_k, config.rag.score_threshold);
    let generator = AnswerGenerator::new(
        Arc::new(OpenAIChatModel::new(&config.openai_api_key, &config.model_name)?),
        GenerationParams {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            ..GenerationParams::default()
        },
    );

    Ok(ChatPipeline::new(retriever, PromptAssembler::default(), generator))
}

/// Build the production [`IngestionPipeline`] from configuration.
///
/// Also returns the store the pipeline writes to, so callers can inspect the
/// index afterwards without constructing a second backend.
pub fn build_ingestion_pipeline(
    config: &AppConfig,
) -> Result<(IngestionPipeline, Arc<PineconeVectorStore>)> {
    let (embedder, store) = build_backends(config)?;
    let chunker =
        Arc::new(FixedSizeChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?);
    Ok((IngestionPipeline::new(chunker, embedder, store.clone()), store))
}

/// Serve the chat API until the process is stopped.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState {
        chat: Arc::new(build_chat_pipeline(&config)?),
        limiter: Arc::new(UsageLimiter::new(UsageLimits::default())),
    };
    let router = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "apologia server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
