//! Ingestion pipeline: chunk → embed → upsert, per document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::Chunker;
use crate::document::Document;
use crate::embedding::EmbeddingClient;
use crate::vectorstore::VectorStore;

/// Outcome for one document of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DocumentStatus {
    /// Chunks were embedded and upserted.
    Ingested,
    /// Chunks were embedded but the upsert was skipped (dry run).
    DryRun,
    /// The document failed; earlier documents' records are retained.
    Failed { error: String },
}

/// Per-document report entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub document_id: String,
    /// Chunks processed for this document (0 when it failed before chunk
    /// counts were known, or when the document produced no chunks).
    pub chunks: usize,
    pub status: DocumentStatus,
}

/// Report for a whole ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    /// True when upserts were skipped — distinguishable from a successful
    /// upsert, not merely silent.
    pub dry_run: bool,
    pub documents: Vec<DocumentReport>,
}

impl IngestReport {
    /// Total chunks processed across all documents.
    pub fn total_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks).sum()
    }

    /// The document reports that failed.
    pub fn failures(&self) -> Vec<&DocumentReport> {
        self.documents
            .iter()
            .filter(|d| matches!(d.status, DocumentStatus::Failed { .. }))
            .collect()
    }
}

/// Orchestrates Chunker → EmbeddingClient → VectorStore for a corpus.
///
/// Ingestion is append-only and restartable: a failure partway through a
/// corpus leaves earlier documents' records in place and is reported
/// per-document, so an operator can re-run only the failed subset. Chunk ids
/// are deterministic, so a re-run replaces records instead of duplicating.
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedder: EmbeddingClient,
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedder: EmbeddingClient,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { chunker, embedder, store }
    }

    /// Ingest `documents` under `source`. With `dry_run`, chunking and
    /// embedding still run (to validate cost and volume) but nothing is
    /// upserted.
    pub async fn ingest(
        &self,
        documents: &[Document],
        source: &str,
        dry_run: bool,
    ) -> IngestReport {
        let mut reports = Vec::with_capacity(documents.len());

        for document in documents {
            let report = self.ingest_one(document, source, dry_run).await;
            if let DocumentStatus::Failed { error } = &report.status {
                error!(document.id = %document.id, error, "document ingestion failed, continuing");
            }
            reports.push(report);
        }

        let report = IngestReport { source: source.to_string(), dry_run, documents: reports };
        info!(
            source,
            dry_run,
            documents = report.documents.len(),
            chunks = report.total_chunks(),
            failures = report.failures().len(),
            "ingestion run complete"
        );
        report
    }

    async fn ingest_one(&self, document: &Document, source: &str, dry_run: bool) -> DocumentReport {
        let mut chunks = self.chunker.chunk(document, source);
        let chunk_count = chunks.len();

        if chunks.is_empty() {
            info!(document.id = %document.id, "document produced no chunks");
            return DocumentReport {
                document_id: document.id.clone(),
                chunks: 0,
                status: if dry_run { DocumentStatus::DryRun } else { DocumentStatus::Ingested },
            };
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = match self.embedder.embed(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                return DocumentReport {
                    document_id: document.id.clone(),
                    chunks: chunk_count,
                    status: DocumentStatus::Failed { error: format!("embedding failed: {e}") },
                };
            }
        };

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        if dry_run {
            info!(document.id = %document.id, chunk_count, "dry run: skipping upsert");
            return DocumentReport {
                document_id: document.id.clone(),
                chunks: chunk_count,
                status: DocumentStatus::DryRun,
            };
        }

        if let Err(e) = self.store.upsert(&chunks).await {
            return DocumentReport {
                document_id: document.id.clone(),
                chunks: chunk_count,
                status: DocumentStatus::Failed { error: format!("upsert failed: {e}") },
            };
        }

        info!(document.id = %document.id, chunk_count, "ingested document");
        DocumentReport {
            document_id: document.id.clone(),
            chunks: chunk_count,
            status: DocumentStatus::Ingested,
        }
    }
}
