// ABOUTME: StepObserver trait through which the crew runner reports progress while agents work.
// ABOUTME: Payloads are opaque JSON; consumers interpret them with StepEvent::classify.

use async_trait::async_trait;
use serde_json::Value;

use blogsmith_core::TaskDefinition;

/// Receives progress from a running crew.
#[async_trait]
pub trait StepObserver: Send + Sync {
    /// Called before an agent starts on a task.
    async fn on_task_start(&self, _task: &TaskDefinition) {}

    /// Called after every agent step with the raw step payload.
    async fn on_step(&self, agent: &str, payload: Value);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl StepObserver for NoopObserver {
    async fn on_step(&self, _agent: &str, _payload: Value) {}
}
