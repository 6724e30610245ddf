// ABOUTME: Defines RunState, the per-session UI state (topic, generating flag, result).
// ABOUTME: The apply() method folds session events into the current state.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventPayload};
use crate::step::StepEvent;

/// Where a session is in its run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Generating,
}

/// The materialized state of one UI session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    pub topic: String,
    pub generating: bool,
    /// Text returned by the last successful run; empty until one finishes.
    pub blog: String,
    /// Message from the most recent failed run, cleared when a new run starts.
    pub error: Option<String>,
    /// Progress of the current (or most recent) run, in arrival order.
    pub steps: Vec<StepEvent>,
    pub current_task: Option<String>,
    pub current_agent: Option<String>,
    pub last_event_id: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RunPhase {
        if self.generating {
            RunPhase::Generating
        } else {
            RunPhase::Idle
        }
    }

    /// True once a run has produced a non-empty result.
    pub fn has_blog(&self) -> bool {
        !self.blog.is_empty()
    }

    pub fn apply(&mut self, event: &Event) {
        self.last_event_id = event.event_id;

        match &event.payload {
            EventPayload::RunStarted { topic } => {
                self.topic = topic.clone();
                self.generating = true;
                self.error = None;
                self.steps.clear();
                self.current_task = None;
                self.current_agent = None;
            }

            EventPayload::TaskStarted { task, agent } => {
                self.current_task = Some(task.clone());
                self.current_agent = Some(agent.clone());
            }

            EventPayload::StepRecorded { step } => {
                self.steps.push(step.clone());
            }

            EventPayload::RunFinished { blog } => {
                self.blog = blog.clone();
                self.generating = false;
                self.current_task = None;
                self.current_agent = None;
            }

            // The previous result, if any, stays downloadable.
            EventPayload::RunFailed { message } => {
                self.error = Some(message.clone());
                self.generating = false;
                self.current_task = None;
                self.current_agent = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ulid::Ulid;

    fn event(id: u64, payload: EventPayload) -> Event {
        Event {
            event_id: id,
            session_id: Ulid::new(),
            timestamp: Utc::now(),
            payload,
        }
    }

    #[test]
    fn new_state_is_idle_and_empty() {
        let state = RunState::new();
        assert_eq!(state.phase(), RunPhase::Idle);
        assert!(!state.has_blog());
        assert!(state.error.is_none());
        assert_eq!(state.topic, "");
    }

    #[test]
    fn full_run_lifecycle() {
        let mut state = RunState::new();

        state.apply(&event(1, EventPayload::RunStarted { topic: "Rust".into() }));
        assert_eq!(state.phase(), RunPhase::Generating);
        assert_eq!(state.topic, "Rust");

        state.apply(&event(
            2,
            EventPayload::TaskStarted {
                task: "outline".into(),
                agent: "Senior Content Strategist".into(),
            },
        ));
        assert_eq!(state.current_task.as_deref(), Some("outline"));
        assert_eq!(
            state.current_agent.as_deref(),
            Some("Senior Content Strategist")
        );

        state.apply(&event(
            3,
            EventPayload::StepRecorded {
                step: StepEvent::FinishResult {
                    agent: "Senior Content Strategist".into(),
                    output: "outline".into(),
                },
            },
        ));
        assert_eq!(state.steps.len(), 1);

        state.apply(&event(4, EventPayload::RunFinished { blog: "# Blog".into() }));
        assert_eq!(state.phase(), RunPhase::Idle);
        assert_eq!(state.blog, "# Blog");
        assert!(state.current_task.is_none());
        assert!(state.current_agent.is_none());
        assert_eq!(state.last_event_id, 4);
    }

    #[test]
    fn failure_keeps_previous_blog() {
        let mut state = RunState::new();
        state.apply(&event(1, EventPayload::RunStarted { topic: "A".into() }));
        state.apply(&event(2, EventPayload::RunFinished { blog: "first".into() }));

        state.apply(&event(3, EventPayload::RunStarted { topic: "B".into() }));
        assert!(state.steps.is_empty());
        state.apply(&event(4, EventPayload::RunFailed { message: "rate limited".into() }));

        assert_eq!(state.phase(), RunPhase::Idle);
        assert_eq!(state.blog, "first");
        assert_eq!(state.error.as_deref(), Some("rate limited"));
        assert_eq!(state.topic, "B");
    }

    #[test]
    fn new_run_clears_previous_error_and_steps() {
        let mut state = RunState::new();
        state.apply(&event(1, EventPayload::RunStarted { topic: "A".into() }));
        state.apply(&event(
            2,
            EventPayload::StepRecorded {
                step: StepEvent::RawPayload {
                    agent: "x".into(),
                    payload_type: "string".into(),
                    raw: "thinking".into(),
                },
            },
        ));
        state.apply(&event(3, EventPayload::RunFailed { message: "boom".into() }));
        state.apply(&event(4, EventPayload::RunStarted { topic: "A".into() }));

        assert!(state.error.is_none());
        assert!(state.steps.is_empty());
        assert!(state.generating);
    }
}
