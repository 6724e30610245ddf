// ABOUTME: Starts a crew run for a session and feeds its progress into the session actor.
// ABOUTME: The run itself executes on a background tokio task; callers return immediately.

use std::sync::Arc;

use async_trait::async_trait;
use blogsmith_agent::{CrewRunner, StepObserver};
use blogsmith_core::{Command, SessionError, SessionHandle, StepEvent, TaskDefinition, Topic};
use serde_json::Value;

/// Forwards crew progress into a session as commands.
pub struct SessionObserver {
    handle: SessionHandle,
}

impl SessionObserver {
    pub fn new(handle: SessionHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl StepObserver for SessionObserver {
    async fn on_task_start(&self, task: &TaskDefinition) {
        let cmd = Command::StartTask {
            task: task.name.clone(),
            agent: task.agent.clone(),
        };
        if let Err(e) = self.handle.send_command(cmd).await {
            tracing::warn!(session_id = %self.handle.session_id, error = %e, "failed to record task start");
        }
    }

    async fn on_step(&self, agent: &str, payload: Value) {
        let step = StepEvent::classify(agent, &payload);
        if let Err(e) = self.handle.send_command(Command::RecordStep { step }).await {
            tracing::warn!(session_id = %self.handle.session_id, error = %e, "failed to record step");
        }
    }
}

/// Mark the session as generating and run the crew in the background.
///
/// Returns `AlreadyGenerating` without touching the running job if one is in flight.
pub async fn start_run(
    handle: SessionHandle,
    runner: Arc<CrewRunner>,
    topic: Topic,
) -> Result<tokio::task::JoinHandle<()>, SessionError> {
    handle
        .send_command(Command::StartRun {
            topic: topic.clone(),
        })
        .await?;

    let session_id = handle.session_id;
    tracing::info!(%session_id, topic = %topic, "blog generation started");

    Ok(tokio::spawn(async move {
        let observer = Arc::new(SessionObserver::new(handle.clone()));
        let cmd = match runner.generate(&topic, observer).await {
            Ok(output) => {
                tracing::info!(%session_id, chars = output.raw.len(), "blog generation finished");
                Command::FinishRun { blog: output.raw }
            }
            Err(e) => {
                tracing::error!(%session_id, error = %e, "blog generation failed");
                Command::FailRun {
                    message: e.to_string(),
                }
            }
        };
        if let Err(e) = handle.send_command(cmd).await {
            tracing::error!(%session_id, error = %e, "failed to record run result");
        }
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use blogsmith_agent::testing::{ScriptedLlmClient, StubEmbedder};
    use blogsmith_agent::{ChatResponse, LlmError, ToolEnvironment, ToolSettings};
    use blogsmith_core::{CrewDefinition, RunState, spawn};
    use ulid::Ulid;

    pub(crate) fn runner_with(client: ScriptedLlmClient) -> Arc<CrewRunner> {
        let tools = ToolEnvironment::new(
            ToolSettings::new("notes.md"),
            Arc::new(StubEmbedder::default()),
        );
        Arc::new(CrewRunner::new(CrewDefinition::blog_crew(), Arc::new(client), tools).unwrap())
    }

    #[tokio::test]
    async fn successful_run_stores_final_output() {
        let handle = spawn(Ulid::new(), RunState::new());
        let runner = runner_with(ScriptedLlmClient::new(vec![
            ChatResponse::text("outline"),
            ChatResponse::text("draft"),
            ChatResponse::text("# Final"),
        ]));

        let job = start_run(handle.clone(), runner, Topic::new("Stocks").unwrap())
            .await
            .unwrap();
        job.await.unwrap();

        let state = handle.read_state().await;
        assert!(!state.generating);
        assert_eq!(state.blog, "# Final");
        assert_eq!(state.topic, "Stocks");
        assert_eq!(state.steps.len(), 3);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_blog_and_records_error() {
        let mut initial = RunState::new();
        initial.blog = "old blog".to_string();
        let handle = spawn(Ulid::new(), initial);
        let runner = runner_with(ScriptedLlmClient::failing(LlmError::RateLimited));

        let job = start_run(handle.clone(), runner, Topic::new("Stocks").unwrap())
            .await
            .unwrap();
        job.await.unwrap();

        let state = handle.read_state().await;
        assert!(!state.generating);
        assert_eq!(state.blog, "old blog");
        assert!(state.error.as_deref().unwrap().contains("Rate limited"));
    }

    #[tokio::test]
    async fn second_start_while_generating_is_rejected() {
        let handle = spawn(Ulid::new(), RunState::new());
        handle
            .send_command(Command::StartRun {
                topic: Topic::new("First").unwrap(),
            })
            .await
            .unwrap();

        let runner = runner_with(ScriptedLlmClient::new(vec![]));
        let err = start_run(handle.clone(), runner, Topic::new("Second").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyGenerating);
        assert_eq!(handle.read_state().await.topic, "First");
    }
}
