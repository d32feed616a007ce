//! Prompt assembly: system instruction, grounding context, history, question.

use std::collections::HashSet;

use crate::document::{ChatMessage, ConversationTurn, RetrievedMatch};

/// Default persona directive. Supplied as static configuration, not computed.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a Christian apologetics assistant. \
Answer with the Bible as your primary authority, cite Scripture as Book Chapter:Verse, \
keep answers under 300 words, and ground every claim in the provided context when it is \
available. If the context does not cover the question, say so rather than fabricating.";

/// Fallback context when retrieval produced no matches.
const EMPTY_CONTEXT_NOTICE: &str = "No supporting passages were retrieved for this question. \
Answer from general knowledge and say when you are unsure.";

/// Builds the generation request from the question, caller-supplied history,
/// and retrieved matches.
///
/// The context block concatenates match texts in descending-score order, each
/// tagged with its source for later citation, and is appended to the system
/// message. Matches with the same `(source, index)` identity are deduplicated
/// first — overlapping chunks repeat content by design.
pub struct PromptAssembler {
    system_instruction: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_INSTRUCTION)
    }
}

impl PromptAssembler {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self { system_instruction: system_instruction.into() }
    }

    /// Assemble the ordered message list for the generation capability.
    pub fn assemble(
        &self,
        question: &str,
        history: &[ConversationTurn],
        matches: &[RetrievedMatch],
    ) -> Vec<ChatMessage> {
        let context = self.context_block(matches);
        let system = format!(
            "{}\n\nContext (use faithfully, but do not fabricate):\n{context}",
            self.system_instruction
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(question));
        messages
    }

    fn context_block(&self, matches: &[RetrievedMatch]) -> String {
        if matches.is_empty() {
            return EMPTY_CONTEXT_NOTICE.to_string();
        }

        let mut ordered: Vec<&RetrievedMatch> = matches.iter().collect();
        ordered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen: HashSet<(&str, usize)> = HashSet::new();
        let mut parts = Vec::new();
        for m in ordered {
            if seen.insert((m.source.as_str(), m.index)) {
                parts.push(format!("[{}] {}", m.source, m.text));
            }
        }
        parts.join("\n\n")
    }
}
