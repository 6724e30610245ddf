// ABOUTME: API module containing the JSON HTTP handlers for blogsmith.
// ABOUTME: Organized into sub-modules for the crew, session runs, and event streaming.

pub mod crew;
pub mod sessions;
pub mod stream;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// JSON error body with the given status.
pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}
