//! Environment-backed application configuration.
//!
//! Read ONCE at process start into an immutable [`AppConfig`]; core
//! components receive validated values through their constructors and never
//! touch the environment themselves.

use apologia_rag::{RagConfig, RagError, Result};

/// Immutable startup configuration for the whole service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // OpenAI
    pub openai_api_key: String,
    pub model_name: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    // Pinecone
    pub pinecone_api_key: String,
    pub pinecone_region: String,
    pub pinecone_index_name: String,

    // Retrieval core
    pub rag: RagConfig,

    // Server
    pub port: u16,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RagError::Config(format!("{name} not set in environment")))
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T> {
    let raw = var_or(name, default);
    raw.parse()
        .map_err(|_| RagError::Config(format!("{name} has invalid value '{raw}'")))
}

impl AppConfig {
    /// Build the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required key is missing, a value
    /// does not parse, or the retrieval knobs are inconsistent. Fatal at
    /// startup by design.
    pub fn from_env() -> Result<Self> {
        let rag = RagConfig::builder()
            .chunk_size(parsed_var("CHUNK_SIZE", "1000")?)
            .chunk_overlap(parsed_var("CHUNK_OVERLAP", "200")?)
            .top_k(parsed_var("TOP_K", "5")?)
            .score_threshold(parsed_var("SCORE_THRESHOLD", "0.0")?)
            .build()?;

        Ok(Self {
            openai_api_key: required_var("OPENAI_API_KEY")?,
            model_name: var_or("MODEL_NAME", "gpt-3.5-turbo"),
            embedding_model: var_or("EMBEDDING_MODEL", "text-embedding-ada-002"),
            max_tokens: parsed_var("MAX_TOKENS", "500")?,
            temperature: parsed_var("TEMPERATURE", "0.7")?,
            pinecone_api_key: required_var("PINECONE_API_KEY")?,
            pinecone_region: var_or("PINECONE_ENVIRONMENT", "us-east-1"),
            pinecone_index_name: var_or("PINECONE_INDEX_NAME", "christian-apologetics"),
            rag,
            port: parsed_var("PORT", "8000")?,
        })
    }
}
