// ABOUTME: HTTP server for blogsmith: htmx web UI, SSE progress streaming, and a JSON API.
// ABOUTME: Uses Axum with one session actor per browser page and a shared crew runner.

pub mod api;
pub mod app_state;
pub mod config;
pub mod routes;
pub mod run;
pub mod web;

pub use app_state::{AppState, SessionEntry, SharedState, spawn_session_sweeper};
pub use config::{ConfigError, ServerConfig};
pub use routes::{create_router, serve};
