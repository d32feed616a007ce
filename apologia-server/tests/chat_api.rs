//! Router tests over deterministic fakes — no network, no real providers.

use std::sync::Arc;

use apologia_rag::{
    AnswerGenerator, BatchConfig, ChatMessage, ChatModel, ChatPipeline, Chunk, EmbeddingClient,
    EmbeddingProvider, GenerationParams, InMemoryVectorStore, PromptAssembler, RagError, Result,
    Retriever, VectorStore,
};
use apologia_server::{AppState, UsageLimiter, UsageLimits, build_router};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct UnitEmbedder;

#[async_trait]
impl EmbeddingProvider for UnitEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

struct ScriptedModel;

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<String> {
        Ok("He rose on the third day.".to_string())
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
        Err(RagError::Generation("upstream unavailable".to_string()))
    }
}

async fn seeded_store() -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    store
        .upsert(&[Chunk {
            id: "test/resurrection.txt#0".to_string(),
            text: "Jesus rose on the third day.".to_string(),
            source: "test".to_string(),
            index: 0,
            embedding: vec![1.0, 0.0],
        }])
        .await
        .unwrap();
    store
}

async fn state_with(model: Arc<dyn ChatModel>, limits: UsageLimits) -> AppState {
    let embedder = EmbeddingClient::new(Arc::new(UnitEmbedder), BatchConfig::default()).unwrap();
    let chat = ChatPipeline::new(
        Retriever::new(embedder, seeded_store().await, 5, 0.0),
        PromptAssembler::default(),
        AnswerGenerator::new(model, GenerationParams::default()),
    );
    AppState { chat: Arc::new(chat), limiter: Arc::new(UsageLimiter::new(limits)) }
}

fn chat_request(question: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::from(
            json!({ "question": question, "conversation_history": [] }).to_string(),
        ))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_returns_answer_and_sources() {
    let state = state_with(Arc::new(ScriptedModel), UsageLimits::default()).await;
    let router = build_router(state);

    let response = router.oneshot(chat_request("What happened on the third day?")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["answer"], "He rose on the third day.");
    assert_eq!(body["question"], "What happened on the third day?");
    assert_eq!(body["sources"][0]["source"], "test");
}

#[tokio::test]
async fn exceeding_the_daily_limit_returns_429() {
    let state = state_with(Arc::new(ScriptedModel), UsageLimits { daily: 1, monthly: 100 }).await;
    let router = build_router(state);

    let first = router.clone().oneshot(chat_request("q1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router.oneshot(chat_request("q2")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert!(body["detail"].as_str().unwrap().contains("Daily limit"));
}

#[tokio::test]
async fn a_failed_generation_costs_no_budget_and_maps_to_502() {
    let state = state_with(Arc::new(FailingModel), UsageLimits { daily: 1, monthly: 100 }).await;
    let router = build_router(state.clone());

    let response = router.clone().oneshot(chat_request("q")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // The failed call did not consume the daily budget.
    let stats = state.limiter.stats("203.0.113.9").await;
    assert_eq!(stats.daily_used, 0);

    // With a daily budget of 1, a retry is admitted (502, not 429).
    let retry = router.oneshot(chat_request("q")).await.unwrap();
    assert_eq!(retry.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn usage_endpoint_reports_counters_and_limits() {
    let state = state_with(Arc::new(ScriptedModel), UsageLimits::default()).await;
    let router = build_router(state);

    router.clone().oneshot(chat_request("q")).await.unwrap();

    let request = Request::builder()
        .uri("/usage")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["usage_stats"]["daily_used"], 1);
    assert_eq!(body["limits"]["daily_limit"], 25);
}

#[tokio::test]
async fn health_reports_ok() {
    let state = state_with(Arc::new(ScriptedModel), UsageLimits::default()).await;
    let router = build_router(state);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}
