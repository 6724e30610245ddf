// ABOUTME: Crew API handlers: inspect the active crew and run it synchronously for a topic.
// ABOUTME: The synchronous endpoint suits scripts; the web UI uses session runs instead.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blogsmith_agent::{NoopObserver, TaskOutput};
use blogsmith_core::{CrewDefinition, Topic};
use serde::{Deserialize, Serialize};

use super::json_error;
use crate::app_state::SharedState;

/// Request body for a synchronous generation.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub topic: String,
    pub blog: String,
    pub tasks: Vec<TaskOutput>,
}

/// GET /api/crew - The crew definition runs are executed with.
pub async fn get_crew(State(state): State<SharedState>) -> Json<CrewDefinition> {
    Json(state.runner.crew().clone())
}

/// POST /api/generate - Run the crew to completion and return the blog.
pub async fn generate_blog(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    let topic = match Topic::new(&req.topic) {
        Ok(t) => t,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    tracing::info!(topic = %topic, "synchronous generation requested");
    match state.runner.generate(&topic, Arc::new(NoopObserver)).await {
        Ok(output) => Json(GenerateResponse {
            topic: topic.to_string(),
            blog: output.raw,
            tasks: output.tasks_output,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(topic = %topic, error = %e, "synchronous generation failed");
            json_error(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
