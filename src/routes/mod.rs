//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
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
/// - WebSocket presentation sessions at `/ws`
/// - REST-ish API under `/api/v1/...` (session id in `x-session-id` where needed)
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // AI-backed
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/lessons/generate", post(http::http_generate_lesson))
        .route("/api/v1/lessons/quality", post(http::http_validate_quality))
        .route("/api/v1/slides/image", post(http::http_generate_image))
        .route("/api/v1/slides/validate-image", post(http::http_validate_image))
        // Persistence
        .route(
            "/api/v1/lessons",
            get(http::http_list_lessons).post(http::http_save_lesson),
        )
        .route(
            "/api/v1/lessons/:id",
            get(http::http_get_lesson)
                .put(http::http_update_lesson)
                .delete(http::http_delete_lesson),
        )
        .route(
            "/api/v1/templates",
            get(http::http_list_templates).post(http::http_create_template),
        )
        .route("/api/v1/templates/:id", delete(http::http_delete_template))
        .route("/api/v1/ratings", post(http::http_rate_lesson))
        .route(
            "/api/v1/settings",
            get(http::http_get_settings).put(http::http_put_settings),
        )
        // State + CORS + HTTP tracing
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
        // Frontend fallback
        .fallback_service(static_service)
}
