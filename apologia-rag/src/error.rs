//! Error types for the `apologia-rag` crate.

use thiserror::Error;

/// Errors that can occur in the ingestion and chat pipelines.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error. Fatal at startup, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A hosted capability (embedding or vector store) failed, after
    /// exhausting retries where retries apply.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// The capability that produced the error (e.g. "openai", "pinecone").
        provider: String,
        /// A description of the failure. Never contains credentials.
        message: String,
        /// Whether the failure is transient (rate limit, transport, 5xx).
        retryable: bool,
    },

    /// The generation capability failed or returned empty content.
    #[error("Generation error: {0}")]
    Generation(String),
}

impl RagError {
    /// A non-retryable provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into(), retryable: false }
    }

    /// A retryable provider error (rate limit or transient failure).
    pub fn provider_retryable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into(), retryable: true }
    }

    /// Whether a bounded retry loop may re-attempt the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { retryable: true, .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_carry_retryability() {
        assert!(RagError::provider_retryable("openai", "429").is_retryable());
        assert!(!RagError::provider("openai", "401").is_retryable());
        assert!(!RagError::Config("bad overlap".into()).is_retryable());
    }

    #[test]
    fn display_names_the_provider() {
        let err = RagError::provider("pinecone", "index not found");
        assert_eq!(err.to_string(), "Provider error (pinecone): index not found");
    }
}
