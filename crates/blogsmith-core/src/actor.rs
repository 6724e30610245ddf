// ABOUTME: Async actor owning one UI session's RunState, fed by commands over tokio channels.
// ABOUTME: Provides SessionHandle for sending commands, subscribing to events, and reading state.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use ulid::Ulid;

use crate::command::Command;
use crate::event::{Event, EventPayload};
use crate::state::RunState;

/// Errors that can occur when processing commands in the actor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a blog is already being generated for this session")]
    AlreadyGenerating,

    #[error("no generation run is in progress")]
    NotGenerating,

    #[error("session channel closed")]
    ChannelClosed,
}

type CommandMessage = (Command, oneshot::Sender<Result<Vec<Event>, SessionError>>);

/// Public handle for interacting with a session actor. Cheap to clone; all
/// clones talk to the same actor task.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<CommandMessage>,
    event_tx: broadcast::Sender<Event>,
    state: Arc<RwLock<RunState>>,
    pub session_id: Ulid,
}

impl SessionHandle {
    /// Send a command to the actor and await the resulting events.
    pub async fn send_command(&self, cmd: Command) -> Result<Vec<Event>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send((cmd, tx))
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub async fn read_state(&self) -> tokio::sync::RwLockReadGuard<'_, RunState> {
        self.state.read().await
    }
}

/// Spawn a session actor and return its handle. Commands are processed one at
/// a time, so the generating check in StartRun cannot race with another start.
pub fn spawn(session_id: Ulid, initial_state: RunState) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<CommandMessage>(64);
    let (event_tx, _) = broadcast::channel::<Event>(256);
    let next_event_id = initial_state.last_event_id + 1;
    let state = Arc::new(RwLock::new(initial_state));

    let handle = SessionHandle {
        cmd_tx,
        event_tx: event_tx.clone(),
        state: Arc::clone(&state),
        session_id,
    };

    let actor = SessionActor {
        state,
        cmd_rx,
        event_tx,
        next_event_id,
        session_id,
    };

    tokio::spawn(actor.run());

    handle
}

struct SessionActor {
    state: Arc<RwLock<RunState>>,
    cmd_rx: mpsc::Receiver<CommandMessage>,
    event_tx: broadcast::Sender<Event>,
    next_event_id: u64,
    session_id: Ulid,
}

impl SessionActor {
    async fn run(mut self) {
        while let Some((cmd, reply_tx)) = self.cmd_rx.recv().await {
            let result = self.process_command(cmd).await;
            let _ = reply_tx.send(result);
        }
        tracing::debug!(session_id = %self.session_id, "session actor stopped");
    }

    async fn process_command(&mut self, cmd: Command) -> Result<Vec<Event>, SessionError> {
        let payload = {
            let state = self.state.read().await;
            command_to_payload(&state, cmd)?
        };

        let event = Event {
            event_id: self.next_event_id,
            session_id: self.session_id,
            timestamp: Utc::now(),
            payload,
        };
        self.next_event_id += 1;

        self.state.write().await.apply(&event);

        // No subscribers is fine.
        let _ = self.event_tx.send(event.clone());

        Ok(vec![event])
    }
}

/// Validate a command against the current state and produce its event payload.
fn command_to_payload(state: &RunState, cmd: Command) -> Result<EventPayload, SessionError> {
    match cmd {
        Command::StartRun { topic } => {
            if state.generating {
                return Err(SessionError::AlreadyGenerating);
            }
            Ok(EventPayload::RunStarted {
                topic: topic.to_string(),
            })
        }
        Command::StartTask { task, agent } => {
            require_generating(state)?;
            Ok(EventPayload::TaskStarted { task, agent })
        }
        Command::RecordStep { step } => {
            require_generating(state)?;
            Ok(EventPayload::StepRecorded { step })
        }
        Command::FinishRun { blog } => {
            require_generating(state)?;
            Ok(EventPayload::RunFinished { blog })
        }
        Command::FailRun { message } => {
            require_generating(state)?;
            Ok(EventPayload::RunFailed { message })
        }
    }
}

fn require_generating(state: &RunState) -> Result<(), SessionError> {
    if state.generating {
        Ok(())
    } else {
        Err(SessionError::NotGenerating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepEvent;
    use crate::topic::Topic;

    fn start(topic: &str) -> Command {
        Command::StartRun {
            topic: Topic::new(topic).unwrap(),
        }
    }

    #[tokio::test]
    async fn start_run_sets_generating() {
        let session_id = Ulid::new();
        let handle = spawn(session_id, RunState::new());

        let events = handle.send_command(start("Rust")).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, 1);
        assert_eq!(events[0].session_id, session_id);

        let state = handle.read_state().await;
        assert!(state.generating);
        assert_eq!(state.topic, "Rust");
    }

    #[tokio::test]
    async fn second_start_while_generating_is_rejected() {
        let handle = spawn(Ulid::new(), RunState::new());
        handle.send_command(start("A")).await.unwrap();

        let err = handle.send_command(start("B")).await.unwrap_err();
        assert_eq!(err, SessionError::AlreadyGenerating);

        // The running topic is untouched.
        assert_eq!(handle.read_state().await.topic, "A");
    }

    #[tokio::test]
    async fn progress_requires_a_running_generation() {
        let handle = spawn(Ulid::new(), RunState::new());

        let err = handle
            .send_command(Command::FinishRun { blog: "x".into() })
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NotGenerating);

        let err = handle
            .send_command(Command::RecordStep {
                step: StepEvent::FinishResult {
                    agent: "a".into(),
                    output: "o".into(),
                },
            })
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NotGenerating);
    }

    #[tokio::test]
    async fn finish_returns_to_idle_and_allows_next_run() {
        let handle = spawn(Ulid::new(), RunState::new());
        handle.send_command(start("A")).await.unwrap();
        handle
            .send_command(Command::FinishRun { blog: "# A".into() })
            .await
            .unwrap();

        {
            let state = handle.read_state().await;
            assert!(!state.generating);
            assert_eq!(state.blog, "# A");
        }

        handle.send_command(start("B")).await.unwrap();
        assert!(handle.read_state().await.generating);
    }

    #[tokio::test]
    async fn events_are_broadcast_in_order() {
        let handle = spawn(Ulid::new(), RunState::new());
        let mut rx = handle.subscribe();

        handle.send_command(start("A")).await.unwrap();
        handle
            .send_command(Command::StartTask {
                task: "outline".into(),
                agent: "Senior Content Strategist".into(),
            })
            .await
            .unwrap();
        handle
            .send_command(Command::FailRun {
                message: "boom".into(),
            })
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();

        assert!(matches!(first.payload, EventPayload::RunStarted { .. }));
        assert!(matches!(second.payload, EventPayload::TaskStarted { .. }));
        assert!(matches!(third.payload, EventPayload::RunFailed { .. }));
        assert_eq!(
            [first.event_id, second.event_id, third.event_id],
            [1, 2, 3]
        );
    }
}
