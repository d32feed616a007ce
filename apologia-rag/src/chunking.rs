//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], a
//! sliding-window splitter measured in characters with configurable overlap.
//! Overlap keeps boundary context: a sentence split at a window edge still
//! appears, whole, in the neighboring chunk.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text, source, and index but no
/// embeddings. Embeddings are attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into ordered chunks tagged with `source`.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document, source: &str) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with overlap.
///
/// Each window after the first begins `chunk_overlap` characters before the
/// end of the previous window; the final chunk may be shorter than
/// `chunk_size`. Whitespace-only windows are discarded — they add embedding
/// and retrieval cost with no signal.
///
/// # Example
///
/// ```rust,ignore
/// use apologia_rag::chunking::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document, "apologetics-library");
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size` — such a window would never advance.
    /// Validation happens here, before any chunking executes.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document, source: &str) -> Vec<Chunk> {
        let text = &document.text;
        if text.is_empty() {
            return Vec::new();
        }

        // Char-boundary byte offsets, so windows never split a code point.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let char_count = boundaries.len() - 1;

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        while start < char_count {
            let end = (start + self.chunk_size).min(char_count);
            let window = &text[boundaries[start]..boundaries[end]];

            if !window.trim().is_empty() {
                chunks.push(Chunk {
                    id: Chunk::record_id(source, &document.id, index),
                    text: window.to_string(),
                    source: source.to_string(),
                    index,
                    embedding: Vec::new(),
                });
                index += 1;
            }

            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> FixedSizeChunker {
        FixedSizeChunker::new(size, overlap).unwrap()
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let doc = Document::new("empty.txt", "");
        assert!(chunker(100, 10).chunk(&doc, "test").is_empty());
    }

    #[test]
    fn overlap_at_least_chunk_size_is_a_config_error() {
        assert!(matches!(FixedSizeChunker::new(100, 100), Err(RagError::Config(_))));
        assert!(matches!(FixedSizeChunker::new(100, 150), Err(RagError::Config(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::Config(_))));
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let doc = Document::new("short.txt", "Jesus rose on the third day.");
        let chunks = chunker(1000, 200).chunk(&doc, "test");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, doc.text);
        assert_eq!(chunks[0].source, "test");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].id, "test/short.txt#0");
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text: String = ('a'..='z').cycle().take(25).collect();
        let doc = Document::new("doc", text.clone());
        let chunks = chunker(10, 3).chunk(&doc, "test");

        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 10);
        }
        for pair in chunks.windows(2) {
            let tail: String =
                pair[0].text.chars().skip(pair[0].text.chars().count() - 3).collect();
            assert!(pair[1].text.starts_with(&tail));
        }
    }

    #[test]
    fn non_overlapping_portions_reconstruct_the_document() {
        let text = "In the beginning God created the heavens and the earth. \
                    And the earth was without form, and void.";
        let doc = Document::new("gen", text);
        let chunks = chunker(20, 5).chunk(&doc, "test");

        let mut reconstructed = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                reconstructed.push_str(&chunk.text);
            } else {
                let overlapped: String = chunk.text.chars().skip(5).collect();
                reconstructed.push_str(&overlapped);
            }
        }
        assert_eq!(reconstructed, text);
    }

    #[test]
    fn whitespace_only_windows_are_discarded() {
        let text = format!("alpha{}omega", " ".repeat(30));
        let doc = Document::new("doc", text);
        let chunks = chunker(10, 0).chunk(&doc, "test");

        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
        // Indices stay contiguous over the emitted sequence.
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn multibyte_text_never_splits_a_code_point() {
        let text = "καὶ τῇ ἡμέρᾳ τῇ τρίτῃ ἀνέστη — ☩ ".repeat(8);
        let doc = Document::new("greek", text);
        let chunks = chunker(7, 2).chunk(&doc, "test");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 7);
        }
    }
}
