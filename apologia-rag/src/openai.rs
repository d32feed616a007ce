//! OpenAI backends: the embeddings provider and the chat-completion model.
//!
//! Both call the REST API directly with `reqwest`. The embeddings adapter
//! implements [`EmbeddingProvider`]; batching and retry live above it in
//! [`EmbeddingClient`](crate::embedding::EmbeddingClient). The chat adapter
//! implements [`ChatModel`] with no retry loop of its own — unbounded retry
//! of a paid generation call amplifies cost.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::ChatMessage;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generate::{ChatModel, GenerationParams};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default embedding model and its dimension.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

fn check_api_key(api_key: &str) -> Result<()> {
    if api_key.is_empty() {
        return Err(RagError::Config("OpenAI API key must not be empty".to_string()));
    }
    Ok(())
}

/// Map a reqwest transport error, preserving retryability for timeouts and
/// connection failures.
fn transport_error(err: reqwest::Error) -> RagError {
    if err.is_timeout() || err.is_connect() {
        RagError::provider_retryable("openai", format!("request failed: {err}"))
    } else {
        RagError::provider("openai", format!("request failed: {err}"))
    }
}

/// Map a non-success HTTP status; 429 and 5xx are retryable.
async fn status_error(response: reqwest::Response) -> RagError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    let retryable = status.as_u16() == 429 || status.is_server_error();

    error!(provider = "openai", %status, retryable, "API error");
    RagError::Provider {
        provider: "openai".to_string(),
        message: format!("API returned {status}: {detail}"),
        retryable,
    }
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use apologia_rag::openai::OpenAIEmbeddings;
///
/// let provider = OpenAIEmbeddings::new("sk-...", "text-embedding-ada-002")?;
/// ```
pub struct OpenAIEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddings {
    /// Create a provider for `model` with the default (ada-002) dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        check_api_key(&api_key)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    /// Create a provider with the default model (`text-embedding-ada-002`).
    pub fn default_model(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, DEFAULT_EMBEDDING_MODEL)
    }

    /// Override the declared dimension (for models other than ada-002).
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    /// Position of this vector's input in the request batch. Sorting by it
    /// keeps the output order correct even if the API reorders items.
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "openai", batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            RagError::provider("openai", format!("failed to parse embeddings response: {e}"))
        })?;

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`ChatModel`] backed by the OpenAI chat-completions API.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAIChatModel {
    /// Create a chat model for `model` (e.g. `gpt-4o-mini`).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        check_api_key(&api_key)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_key, model: model.into() })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<String> {
        debug!(
            provider = "openai",
            model = %self.model,
            message_count = messages.len(),
            max_tokens = params.max_tokens,
            "requesting chat completion"
        );

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let response = self
            .client
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("chat completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(provider = "openai", %status, "chat completion API error");
            return Err(RagError::Generation(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            RagError::Generation(format!("failed to parse chat completion response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RagError::Generation("API returned no completion content".to_string()))
    }
}
