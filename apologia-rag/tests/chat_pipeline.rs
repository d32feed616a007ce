//! End-to-end pipeline tests over deterministic fakes: ingest a corpus into
//! the in-memory store, then chat against it. No network involved.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use apologia_rag::{
    AnswerGenerator, BatchConfig, ChatMessage, ChatModel, ChatPipeline, ConversationTurn,
    Document, EmbeddingClient, EmbeddingProvider, FixedSizeChunker, GenerationParams,
    IngestionPipeline, InMemoryVectorStore, PromptAssembler, RagError, Result, Retriever,
    VectorStore,
};
use async_trait::async_trait;

const DIM: usize = 32;

/// Deterministic bag-of-words embedder: each lowercase word adds weight at a
/// hashed dimension, then the vector is L2-normalized. Texts sharing words
/// get similar vectors, which is all retrieval needs here.
struct HashEmbedder;

fn hash_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        v[(hasher.finish() % DIM as u64) as usize] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embed(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Replies with a fixed answer; records nothing, fails never.
struct ScriptedModel;

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<String> {
        // Echo enough of the prompt to let tests assert on grounding.
        let system = &messages[0].content;
        if system.contains("No supporting passages") {
            Ok("I have no passages on that, but here is what I know.".to_string())
        } else {
            Ok("According to the cited passages, He rose on the third day.".to_string())
        }
    }
}

fn embedder() -> EmbeddingClient {
    EmbeddingClient::new(Arc::new(HashEmbedder), BatchConfig::default()).unwrap()
}

fn chat_over(store: Arc<InMemoryVectorStore>, score_threshold: f32) -> ChatPipeline {
    ChatPipeline::new(
        Retriever::new(embedder(), store, 5, score_threshold),
        PromptAssembler::default(),
        AnswerGenerator::new(Arc::new(ScriptedModel), GenerationParams::default()),
    )
}

async fn ingest_corpus(store: Arc<InMemoryVectorStore>, docs: &[Document], dry_run: bool) {
    let pipeline = IngestionPipeline::new(
        Arc::new(FixedSizeChunker::new(1000, 200).unwrap()),
        embedder(),
        store,
    );
    pipeline.ingest(docs, "test", dry_run).await;
}

#[tokio::test]
async fn single_sentence_corpus_grounds_the_answer() {
    let store = Arc::new(InMemoryVectorStore::new());
    let docs = vec![Document::new("resurrection.txt", "Jesus rose on the third day.")];
    ingest_corpus(store.clone(), &docs, false).await;

    let chat = chat_over(store, 0.0);
    let outcome = chat.answer("What happened on the third day?", &[]).await.unwrap();

    assert!(!outcome.answer.is_empty());
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].source, "test");
    assert!(outcome.sources[0].score > 0.0);
    assert_eq!(outcome.question, "What happened on the third day?");
}

#[tokio::test]
async fn impossible_threshold_still_answers_without_grounding() {
    let store = Arc::new(InMemoryVectorStore::new());
    let docs = vec![Document::new("resurrection.txt", "Jesus rose on the third day.")];
    ingest_corpus(store.clone(), &docs, false).await;

    // 1.1 is above any possible cosine score.
    let chat = chat_over(store, 1.1);
    let outcome = chat.answer("What happened on the third day?", &[]).await.unwrap();

    assert!(outcome.sources.is_empty());
    assert!(outcome.answer.contains("no passages"));
}

#[tokio::test]
async fn empty_store_still_answers() {
    let store = Arc::new(InMemoryVectorStore::new());
    let chat = chat_over(store, 0.0);
    let outcome = chat.answer("Out of corpus question?", &[]).await.unwrap();
    assert!(!outcome.answer.is_empty());
}

#[tokio::test]
async fn history_is_carried_through_to_the_prompt() {
    let store = Arc::new(InMemoryVectorStore::new());
    let chat = chat_over(store, 0.0);
    let history = vec![
        ConversationTurn::user("Who saw the empty tomb?"),
        ConversationTurn::assistant("The women who came at dawn."),
    ];
    // Stateless core: history is supplied by the caller every turn.
    let outcome = chat.answer("And after that?", &history).await.unwrap();
    assert_eq!(outcome.question, "And after that?");
}

#[tokio::test]
async fn dry_run_then_query_finds_nothing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let docs = vec![Document::new("resurrection.txt", "Jesus rose on the third day.")];
    ingest_corpus(store.clone(), &docs, true).await;

    let matches = store.query(&hash_embed("third day"), 5, None).await.unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn batched_and_one_at_a_time_embeddings_agree() {
    let client = embedder();
    let texts: Vec<String> = (0..250).map(|i| format!("word{i} alpha beta")).collect();

    // 250 items crosses the default 100-item batch boundary twice.
    let batched = client.embed(&texts).await.unwrap();
    for (i, text) in texts.iter().enumerate() {
        let single = client.embed_one(text).await.unwrap();
        assert_eq!(batched[i], single, "vector {i} differs between batched and single calls");
    }
}

/// A store whose queries always fail; upserts succeed.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn upsert(&self, _chunks: &[apologia_rag::Chunk]) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        _embedding: &[f32],
        _top_k: usize,
        _source_filter: Option<&str>,
    ) -> Result<Vec<apologia_rag::RetrievedMatch>> {
        Err(RagError::provider("fake-store", "query unavailable"))
    }

    async fn delete(&self, _ids: &[&str]) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<apologia_rag::IndexStats> {
        Ok(apologia_rag::IndexStats { vector_count: 0, dimension: DIM })
    }
}

#[tokio::test]
async fn a_store_failure_aborts_the_chat_request() {
    let chat = ChatPipeline::new(
        Retriever::new(embedder(), Arc::new(BrokenStore), 5, 0.0),
        PromptAssembler::default(),
        AnswerGenerator::new(Arc::new(ScriptedModel), GenerationParams::default()),
    );
    let result = chat.answer("Anything?", &[]).await;
    assert!(matches!(result, Err(RagError::Provider { .. })));
}
