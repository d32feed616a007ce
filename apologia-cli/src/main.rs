//! `apologia` — launcher and ingestion tool for the Apologia RAG service.
//!
//! `apologia serve` runs the chat API; `apologia ingest` embeds a directory
//! of text documents into the configured vector index.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use apologia_server::AppConfig;
use apologia_rag::{Document, DocumentStatus};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// File extensions treated as ingestible text documents.
const TEXT_EXTENSIONS: [&str; 4] = ["txt", "md", "rst", "tex"];

#[derive(Parser)]
#[command(name = "apologia", about = "RAG chat service over an apologetics corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat API server.
    Serve,
    /// Chunk, embed, and upsert a directory of text documents.
    Ingest {
        /// Directory to scan recursively for text files.
        #[arg(long)]
        input_dir: PathBuf,
        /// Source label the documents are ingested under.
        #[arg(long)]
        source: String,
        /// Chunk and embed but skip the upsert (cost/volume validation).
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; deployment platforms inject the environment directly.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Serve => apologia_server::serve(config).await,
        Command::Ingest { input_dir, source, dry_run } => {
            ingest(&config, &input_dir, &source, dry_run).await
        }
    }
}

async fn ingest(
    config: &AppConfig,
    input_dir: &Path,
    source: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let documents = collect_documents(input_dir)?;
    if documents.is_empty() {
        bail!("no text documents found under {}", input_dir.display());
    }
    println!("Found {} text files to process", documents.len());

    let (pipeline, store) = apologia_server::build_ingestion_pipeline(config)?;
    let report = pipeline.ingest(&documents, source, dry_run).await;

    for doc in &report.documents {
        match &doc.status {
            DocumentStatus::Ingested => {
                println!("  {} — {} chunks", doc.document_id, doc.chunks);
            }
            DocumentStatus::DryRun => {
                println!("  {} — {} chunks (dry run, not uploaded)", doc.document_id, doc.chunks);
            }
            DocumentStatus::Failed { error } => {
                println!("  {} — FAILED: {error}", doc.document_id);
            }
        }
    }
    println!("Processed {} chunks from {} documents", report.total_chunks(), report.documents.len());

    if dry_run {
        println!("Dry run mode - documents not uploaded");
    } else {
        match apologia_rag::VectorStore::stats(store.as_ref()).await {
            Ok(stats) => println!(
                "Index now holds {} vectors (dimension {})",
                stats.vector_count, stats.dimension
            ),
            Err(e) => tracing::warn!(error = %e, "could not fetch index stats"),
        }
    }

    let failures = report.failures();
    if !failures.is_empty() {
        bail!("{} of {} documents failed; re-run with only those files", failures.len(), report.documents.len());
    }
    Ok(())
}

/// Recursively collect text documents, ids relative to `input_dir`, sorted
/// for deterministic chunk ids across runs.
fn collect_documents(input_dir: &Path) -> anyhow::Result<Vec<Document>> {
    if !input_dir.is_dir() {
        bail!("{} is not a directory", input_dir.display());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(input_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if !is_text {
            continue;
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let id = path
            .strip_prefix(input_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        documents.push(Document::new(id, text));
    }

    documents.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(documents)
}
