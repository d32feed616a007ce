//! Data types for documents, chunks, retrieved matches, and conversation turns.

use serde::{Deserialize, Serialize};

/// A source document read during ingestion. Immutable once read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier for the document, e.g. a relative file path.
    pub id: String,
    /// The full text content of the document.
    pub text: String,
}

impl Document {
    /// Create a document from an id and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// A contiguous segment of a [`Document`], the unit of embedding and retrieval.
///
/// The `id` is deterministic (`{source}/{document_id}#{index}`) so that
/// re-ingesting the same document replaces its records instead of
/// accumulating duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier used as the upsert key.
    pub id: String,
    /// The text content of the chunk. Non-empty, never whitespace-only.
    pub text: String,
    /// The source label the chunk was ingested under.
    pub source: String,
    /// Ordinal position within the document's emitted chunk sequence.
    pub index: usize,
    /// The embedding vector. Empty until the pipeline attaches one.
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Build the deterministic record id for a chunk.
    pub fn record_id(source: &str, document_id: &str, index: usize) -> String {
        format!("{source}/{document_id}#{index}")
    }
}

/// A stored chunk's metadata annotated with a similarity score.
///
/// Transient: exists only for the duration of one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMatch {
    /// The stored record's id.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The source label the chunk was ingested under.
    pub source: String,
    /// The chunk's ordinal position within its document.
    pub index: usize,
    /// Similarity score; higher is more relevant.
    pub score: f32,
}

/// The speaker of a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One (role, text) pair of caller-supplied conversation history.
///
/// The core never persists history; the caller is the system of record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// The speaker of a [`ChatMessage`] in a generation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of an assembled generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.role {
            Role::User => ChatMessage::user(turn.text.clone()),
            Role::Assistant => ChatMessage::assistant(turn.text.clone()),
        }
    }
}
