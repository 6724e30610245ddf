// ABOUTME: Commands accepted by the session actor.
// ABOUTME: Each command is validated against the run state and converted into events.

use serde::{Deserialize, Serialize};

use crate::step::StepEvent;
use crate::topic::Topic;

/// A request to change a session's run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Begin a generation run. Rejected while a run is in progress.
    StartRun { topic: Topic },

    /// A pipeline task was handed to its agent.
    StartTask { task: String, agent: String },

    /// Record one interpreted agent step.
    RecordStep { step: StepEvent },

    /// The pipeline returned the final blog text.
    FinishRun { blog: String },

    /// The pipeline failed; the message is shown to the user.
    FailRun { message: String },
}
