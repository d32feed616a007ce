//! HTTP routes: `POST /chat`, `GET /usage`, `GET /health`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use std::convert::Infallible;

use apologia_rag::{ChatPipeline, ConversationTurn, RagError, SourceRef};
use axum::Router;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::usage::UsageLimiter;

/// Shared state behind the router.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatPipeline>,
    pub limiter: Arc<UsageLimiter>,
}

/// Build the application router with middleware attached.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/usage", get(usage))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // Caller-facing deadline; a timed-out request drops its in-flight
        // provider calls with it.
        .layer(TimeoutLayer::new(Duration::from_secs(75)))
        .with_state(state)
}

/// The caller-facing chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

/// The caller-facing chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub question: String,
}

/// API error carrying an HTTP status and a `{"detail": ...}` body.
pub enum ApiError {
    RateLimited(String),
    Upstream(RagError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::RateLimited(reason) => (StatusCode::TOO_MANY_REQUESTS, reason),
            ApiError::Upstream(err) => {
                error!(error = %err, "chat request failed");
                let status = match &err {
                    RagError::Provider { .. } | RagError::Generation(_) => StatusCode::BAD_GATEWAY,
                    RagError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// The key a request's usage is accounted under: first X-Forwarded-For
/// entry, else the peer address, else "unknown" (router tests carry no
/// connect info).
pub struct ClientKey(pub String);

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(client_key(&parts.headers, peer.as_ref())))
    }
}

fn client_key(headers: &HeaderMap, peer: Option<&SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

async fn chat(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    state.limiter.reserve(&client).await.map_err(ApiError::RateLimited)?;

    let outcome = match state.chat.answer(&request.question, &request.conversation_history).await {
        Ok(outcome) => outcome,
        Err(err) => {
            // A failed upstream call costs nothing: return the reservation.
            state.limiter.refund(&client).await;
            return Err(ApiError::Upstream(err));
        }
    };

    Ok(Json(ChatResponse {
        answer: outcome.answer,
        sources: outcome.sources,
        question: outcome.question,
    }))
}

async fn usage(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Json<serde_json::Value> {
    let stats = state.limiter.stats(&client).await;

    Json(json!({
        "usage_stats": {
            "daily_used": stats.daily_used,
            "daily_remaining": stats.daily_remaining,
            "monthly_used": stats.monthly_used,
            "monthly_remaining": stats.monthly_remaining,
        },
        "limits": {
            "daily_limit": stats.daily_limit,
            "monthly_limit": stats.monthly_limit,
        },
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "chat" }))
}
