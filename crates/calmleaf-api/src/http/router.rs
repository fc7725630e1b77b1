//! Axum router configuration with middleware.
//!
//! All API routes are under `/api/`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat
        .route("/chat", post(handlers::chat::stream_chat))
        .route("/chat/complete", post(handlers::chat::complete_chat))
        // Card
        .route("/generate_card", post(handlers::card::generate_card))
        // Client log ingestion
        .route("/log", post(handlers::log::log_frontend));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .route("/", get(welcome))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET / - Welcome message.
async fn welcome() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": "Welcome to the Calmleaf API",
    }))
}
