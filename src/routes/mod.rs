//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (generation with streamed progress)
/// - REST API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/agents", get(http::http_agents))
        .route("/api/v1/validate", post(http::http_post_validate))
        .route("/api/v1/materials", get(http::http_get_materials).post(http::http_post_material))
        .route("/api/v1/quiz", post(http::http_post_quiz))
        .route("/api/v1/quiz/enhance", post(http::http_post_enhance))
        .route("/api/v1/quiz/adapt", post(http::http_post_adapt))
        .route("/api/v1/flashcards", post(http::http_post_flashcards))
        .route("/api/v1/flashcards/pronunciation", post(http::http_post_pronunciation))
        .route("/api/v1/flashcards/mnemonic", post(http::http_post_mnemonic))
        .route("/api/v1/exam", post(http::http_post_exam))
        .route("/api/v1/exam/analyze", post(http::http_post_analyze))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
