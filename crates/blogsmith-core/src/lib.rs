// ABOUTME: Core domain library for blogsmith: crew definitions, step events, and session state.
// ABOUTME: Re-exports the types shared by the agent runtime and the web server.

pub mod actor;
pub mod artifact;
pub mod command;
pub mod crew;
pub mod event;
pub mod state;
pub mod step;
pub mod template;
pub mod topic;

pub use actor::{SessionError, SessionHandle, spawn};
pub use artifact::{BLOG_FILE_NAME, BLOG_MIME, BlogArtifact};
pub use command::Command;
pub use crew::{AgentDefinition, CrewDefinition, CrewError, Process, TaskDefinition, ToolKind};
pub use event::{Event, EventPayload};
pub use state::{RunPhase, RunState};
pub use step::{AgentAction, StepEvent, ToolStep, actions_payload, finish_payload};
pub use template::{Inputs, interpolate, topic_inputs};
pub use topic::{Topic, TopicError};
