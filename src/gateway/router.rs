//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::Error;
use crate::chat::ChatService;
use crate::config::ServerConfig;
use crate::protocol::ChatRequest;

/// Shared application state
pub struct AppState {
    /// Chat dispatcher (owns the response cache)
    pub chat: Arc<ChatService>,
}

/// Create the router
pub fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/cache", delete(clear_cache_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(cors_layer(&server.cors_origins))
                .layer(DefaultBodyLimit::max(server.max_body_size)),
        )
        .with_state(state)
}

/// CORS for the browser front-end; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

/// Map an error to a JSON error response
fn error_response(err: &Error) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.chat.cache();
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": {
            "enabled": cache.is_enabled(),
            "entries": cache.len(),
        }
    }))
}

/// Chat handler (POST /api/chat)
async fn chat_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(&Error::InvalidRequest(format!("Invalid JSON: {e}"))),
    };

    let conversation = request.into_conversation();
    if conversation.is_empty() {
        return error_response(&Error::InvalidRequest(
            "conversation has no messages".to_string(),
        ));
    }

    let reply = state.chat.reply(&conversation).await;
    debug!(source = ?reply.source, "Chat reply");
    (StatusCode::OK, Json(reply)).into_response()
}

/// Cache statistics (GET /api/cache/stats)
async fn cache_stats_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.chat.cache().stats() {
        Some(stats) => Json(json!({ "enabled": true, "stats": stats })).into_response(),
        None => Json(json!({ "enabled": false })).into_response(),
    }
}

/// Cache reset (DELETE /api/cache)
async fn clear_cache_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let cache = state.chat.cache();
    let dropped = cache.len();
    cache.clear();
    info!(dropped, "Response cache cleared");
    StatusCode::NO_CONTENT
}
