// ABOUTME: Events emitted by the session actor and broadcast to UI subscribers.
// ABOUTME: Each event carries a per-session sequence number and timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::step::StepEvent;

/// A single state change in a session, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: u64,
    pub session_id: Ulid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    RunStarted { topic: String },
    TaskStarted { task: String, agent: String },
    StepRecorded { step: StepEvent },
    RunFinished { blog: String },
    RunFailed { message: String },
}

impl EventPayload {
    /// Snake-case name used as the SSE event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::RunStarted { .. } => "run_started",
            EventPayload::TaskStarted { .. } => "task_started",
            EventPayload::StepRecorded { .. } => "step_recorded",
            EventPayload::RunFinished { .. } => "run_finished",
            EventPayload::RunFailed { .. } => "run_failed",
        }
    }

    /// True for events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventPayload::RunFinished { .. } | EventPayload::RunFailed { .. }
        )
    }
}
