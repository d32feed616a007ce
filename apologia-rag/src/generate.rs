//! Answer generation over a hosted chat-completion capability.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::ChatMessage;
use crate::error::{RagError, Result};

/// Generation parameters, applied uniformly to every call.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Soft word cap applied to the answer after generation.
    pub max_answer_words: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { max_tokens: 500, temperature: 0.7, max_answer_words: 300 }
    }
}

/// A hosted chat-completion capability: one method, one call.
///
/// No retry loop lives at this seam — unbounded retry of a paid generation
/// call amplifies cost; only the transport's own timeout applies.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for the ordered message list.
    async fn complete(&self, messages: &[ChatMessage], params: &GenerationParams)
    -> Result<String>;
}

/// Calls the [`ChatModel`] and polices the answer: a provider failure or an
/// empty completion surfaces as [`RagError::Generation`], never as a silent
/// empty answer, and the text is softly truncated to the word budget.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    params: GenerationParams,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, params: GenerationParams) -> Self {
        Self { model, params }
    }

    /// Generate the answer text for an assembled prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the capability fails or returns
    /// empty content.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let answer = self.model.complete(messages, &self.params).await?;
        if answer.trim().is_empty() {
            return Err(RagError::Generation("model returned empty content".to_string()));
        }

        let truncated = truncate_to_word_limit(&answer, self.params.max_answer_words);
        debug!(words = truncated.split_whitespace().count(), "generated answer");
        Ok(truncated)
    }
}

/// Truncate to at most `max_words`, preferring to end on a sentence boundary
/// when one falls within the last 40% of the budget.
fn truncate_to_word_limit(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }

    let truncated = words[..max_words].join(" ");
    if let Some(last_period) = truncated.rfind('.') {
        // Rough heuristic: a period past 60% of the kept text is close enough
        // to the budget to prefer a clean sentence ending.
        if last_period >= truncated.len() * 6 / 10 {
            return truncated[..=last_period].to_string();
        }
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedModel {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<String> {
            Err(RagError::Generation("capability unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn short_answers_pass_through_unchanged() {
        let generator = AnswerGenerator::new(
            Arc::new(ScriptedModel { reply: "He is risen.".to_string() }),
            GenerationParams::default(),
        );
        let answer = generator.generate(&[ChatMessage::user("q")]).await.unwrap();
        assert_eq!(answer, "He is risen.");
    }

    #[tokio::test]
    async fn empty_content_is_a_generation_error_not_an_empty_answer() {
        let generator = AnswerGenerator::new(
            Arc::new(ScriptedModel { reply: "   \n".to_string() }),
            GenerationParams::default(),
        );
        let result = generator.generate(&[ChatMessage::user("q")]).await;
        assert!(matches!(result, Err(RagError::Generation(_))));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let generator = AnswerGenerator::new(Arc::new(FailingModel), GenerationParams::default());
        assert!(generator.generate(&[ChatMessage::user("q")]).await.is_err());
    }

    #[test]
    fn truncation_respects_the_word_budget() {
        let text = (0..50).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let truncated = truncate_to_word_limit(&text, 10);
        assert_eq!(truncated.split_whitespace().count(), 10);
    }

    #[test]
    fn truncation_prefers_a_late_sentence_boundary() {
        let text = "One two three four five six seven eight nine. Ten eleven twelve thirteen \
                    fourteen fifteen sixteen";
        let truncated = truncate_to_word_limit(text, 10);
        assert!(truncated.ends_with("nine."));
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_to_word_limit("brief answer", 300), "brief answer");
    }
}
