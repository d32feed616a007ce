//! # apologia-rag
//!
//! The retrieval-augmented generation core of the Apologia chat service:
//! chunking, embedding with batching and bounded retry, a vector-store
//! contract with in-memory and Pinecone backends, and the ingestion and chat
//! pipelines that tie them together.
//!
//! ## Overview
//!
//! Ingestion: documents → [`chunking::FixedSizeChunker`] →
//! [`embedding::EmbeddingClient`] → [`vectorstore::VectorStore::upsert`].
//!
//! Chat: question (+ history) → [`retriever::Retriever`] →
//! [`prompt::PromptAssembler`] → [`generate::AnswerGenerator`] →
//! `{answer, sources}`.
//!
//! Every hosted capability sits behind a narrow trait
//! ([`embedding::EmbeddingProvider`], [`vectorstore::VectorStore`],
//! [`generate::ChatModel`]) so tests substitute deterministic fakes and the
//! core never touches the network or the process environment.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use apologia_rag::{
//!     AnswerGenerator, BatchConfig, ChatPipeline, EmbeddingClient, FixedSizeChunker,
//!     GenerationParams, IngestionPipeline, InMemoryVectorStore, PromptAssembler,
//!     RagConfig, Retriever,
//! };
//!
//! let config = RagConfig::default();
//! let embedder = EmbeddingClient::new(provider, BatchConfig::default())?;
//! let store = Arc::new(InMemoryVectorStore::new());
//!
//! let ingestion = IngestionPipeline::new(
//!     Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
//!     embedder.clone(),
//!     store.clone(),
//! );
//! let report = ingestion.ingest(&documents, "apologetics-library", false).await;
//!
//! let chat = ChatPipeline::new(
//!     Retriever::new(embedder, store, config.top_k, config.score_threshold),
//!     PromptAssembler::default(),
//!     AnswerGenerator::new(model, GenerationParams::default()),
//! );
//! let outcome = chat.answer("What happened on the third day?", &[]).await?;
//! ```

pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod inmemory;
pub mod openai;
pub mod pinecone;
pub mod prompt;
pub mod retriever;
pub mod retry;
pub mod vectorstore;

pub use chat::{ChatOutcome, ChatPipeline, SourceRef};
pub use chunking::{Chunker, FixedSizeChunker};
pub use config::RagConfig;
pub use document::{
    ChatMessage, ChatRole, Chunk, ConversationTurn, Document, RetrievedMatch, Role,
};
pub use embedding::{BatchConfig, EmbeddingClient, EmbeddingProvider};
pub use error::{RagError, Result};
pub use generate::{AnswerGenerator, ChatModel, GenerationParams};
pub use ingest::{DocumentReport, DocumentStatus, IngestReport, IngestionPipeline};
pub use inmemory::InMemoryVectorStore;
pub use openai::{OpenAIChatModel, OpenAIEmbeddings};
pub use pinecone::{PineconeConfig, PineconeVectorStore};
pub use prompt::PromptAssembler;
pub use retriever::Retriever;
pub use retry::RetryPolicy;
pub use vectorstore::{IndexStats, VectorStore};
