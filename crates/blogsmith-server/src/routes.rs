// ABOUTME: Route definitions for the blogsmith HTTP server.
// ABOUTME: Assembles the web UI, JSON API, and health routes into one Axum Router with tracing.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::app_state::SharedState;
use crate::{api, web};

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(web::index))
        .route("/web/sessions/{id}/generate", post(web::generate))
        .route("/web/sessions/{id}/result", get(web::result))
        .route("/web/sessions/{id}/events", get(web::events))
        .route("/web/sessions/{id}/download", get(web::download))
        .route("/health", get(health))
        .route("/api/crew", get(api::crew::get_crew))
        .route("/api/generate", post(api::crew::generate_blog))
        .route("/api/sessions", post(api::sessions::create_session))
        .route("/api/sessions/{id}/generate", post(api::sessions::start_generation))
        .route("/api/sessions/{id}/state", get(api::sessions::get_session_state))
        .route("/api/sessions/{id}/events/stream", get(api::stream::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve the router until the process is stopped.
pub async fn serve(state: SharedState, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "blogsmith listening");
    axum::serve(listener, router).await?;
    Ok(())
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
