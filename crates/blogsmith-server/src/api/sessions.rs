// ABOUTME: Session API handlers: create a session, start a background run, and read its state.
// ABOUTME: Mirrors the web UI flow for JSON clients.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blogsmith_core::{SessionError, SessionHandle, Topic};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::json_error;
use crate::app_state::SharedState;
use crate::run::start_run;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    pub topic: String,
}

pub(crate) async fn find_session(state: &SharedState, id: &str) -> Result<SessionHandle, Box<Response>> {
    let session_id = id
        .parse::<Ulid>()
        .map_err(|_| Box::new(json_error(StatusCode::BAD_REQUEST, "invalid session id")))?;
    state
        .session(&session_id)
        .await
        .ok_or_else(|| Box::new(json_error(StatusCode::NOT_FOUND, "session not found")))
}

/// POST /api/sessions - Create an empty session.
pub async fn create_session(State(state): State<SharedState>) -> Response {
    let handle = state.create_session().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: handle.session_id.to_string(),
        }),
    )
        .into_response()
}

/// POST /api/sessions/{id}/generate - Start a background run for the session.
pub async fn start_generation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StartRunRequest>,
) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };

    let topic = match Topic::new(&req.topic) {
        Ok(t) => t,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match start_run(handle, state.runner.clone(), topic.clone()).await {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "session_id": id, "topic": topic.as_str() })),
        )
            .into_response(),
        Err(e @ SessionError::AlreadyGenerating) => json_error(StatusCode::CONFLICT, e.to_string()),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/sessions/{id}/state - The session's current RunState.
pub async fn get_session_state(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let handle = match find_session(&state, &id).await {
        Ok(h) => h,
        Err(resp) => return *resp,
    };
    let run = handle.read_state().await.clone();
    Json(run).into_response()
}
