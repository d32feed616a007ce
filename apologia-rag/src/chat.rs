//! Chat pipeline: retrieve → assemble → generate, with cited sources.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{ConversationTurn, RetrievedMatch};
use crate::error::Result;
use crate::generate::AnswerGenerator;
use crate::prompt::PromptAssembler;
use crate::retriever::Retriever;

/// Preview length for cited source text.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// A cited source returned alongside the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// The chunk text, previewed to 200 characters.
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// The result of one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub question: String,
}

/// Orchestrates one stateless chat turn.
///
/// Zero retrieval matches is a handled state, not a failure: the generator
/// still runs with an empty context block so out-of-corpus questions get an
/// (ungrounded) answer instead of an error. Provider and generation failures
/// abort the single request and surface typed.
pub struct ChatPipeline {
    retriever: Retriever,
    assembler: PromptAssembler,
    generator: AnswerGenerator,
}

impl ChatPipeline {
    pub fn new(retriever: Retriever, assembler: PromptAssembler, generator: AnswerGenerator) -> Self {
        Self { retriever, assembler, generator }
    }

    /// Answer `question` grounded in retrieved context, returning the answer
    /// plus deduplicated cited sources.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Provider`](crate::error::RagError::Provider) if
    /// embedding or the vector store fails, and
    /// [`RagError::Generation`](crate::error::RagError::Generation) if the
    /// generation capability fails or returns empty content.
    pub async fn answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<ChatOutcome> {
        let matches = self.retriever.retrieve(question, None).await?;
        info!(match_count = matches.len(), "retrieved grounding context");

        let messages = self.assembler.assemble(question, history, &matches);
        let answer = self.generator.generate(&messages).await?;

        Ok(ChatOutcome {
            answer,
            sources: cited_sources(&matches),
            question: question.to_string(),
        })
    }
}

/// Deduplicate matches by `(source, index)` and preview their text.
fn cited_sources(matches: &[RetrievedMatch]) -> Vec<SourceRef> {
    let mut seen: HashSet<(&str, usize)> = HashSet::new();
    matches
        .iter()
        .filter(|m| seen.insert((m.source.as_str(), m.index)))
        .map(|m| SourceRef { text: preview(&m.text), source: m.source.clone(), score: m.score })
        .collect()
}

fn preview(text: &str) -> String {
    if text.chars().count() <= SOURCE_PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SOURCE_PREVIEW_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_match(source: &str, index: usize, text: &str, score: f32) -> RetrievedMatch {
        RetrievedMatch {
            id: format!("{source}/doc#{index}"),
            text: text.to_string(),
            source: source.to_string(),
            index,
            score,
        }
    }

    #[test]
    fn sources_are_deduplicated_by_chunk_identity() {
        let matches = vec![
            a_match("lib", 0, "alpha", 0.9),
            a_match("lib", 0, "alpha", 0.8),
            a_match("lib", 1, "beta", 0.7),
        ];
        let sources = cited_sources(&matches);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn long_source_text_is_previewed() {
        let long = "x".repeat(500);
        let sources = cited_sources(&[a_match("lib", 0, &long, 0.9)]);
        assert_eq!(sources[0].text.chars().count(), SOURCE_PREVIEW_CHARS + 3);
        assert!(sources[0].text.ends_with("..."));
    }

    #[test]
    fn short_source_text_is_untouched() {
        let sources = cited_sources(&[a_match("lib", 0, "short", 0.9)]);
        assert_eq!(sources[0].text, "short");
    }
}
