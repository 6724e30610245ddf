// ABOUTME: Delegation tools letting an agent hand work or a question to a coworker agent.
// ABOUTME: Coworkers run with their own tools only, so delegation never recurses.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Tool, required_str};
use crate::executor::AgentExecutor;
use crate::observer::StepObserver;

/// The agents a delegating agent may call on, plus where their steps are reported.
pub struct Coworkers {
    members: Vec<AgentExecutor>,
    observer: Arc<dyn StepObserver>,
}

impl Coworkers {
    pub fn new(members: Vec<AgentExecutor>, observer: Arc<dyn StepObserver>) -> Self {
        Self { members, observer }
    }

    pub fn roles(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.role()).collect()
    }

    /// Match a coworker by role, ignoring case and surrounding whitespace or quotes.
    pub fn find(&self, role: &str) -> Option<&AgentExecutor> {
        let wanted = role.trim().trim_matches('"').trim().to_lowercase();
        self.members
            .iter()
            .find(|m| m.role().trim().to_lowercase() == wanted)
    }

    async fn run(&self, coworker: &str, request: &str, context: &str) -> anyhow::Result<String> {
        let Some(member) = self.find(coworker) else {
            anyhow::bail!(
                "no coworker named '{}'. Available coworkers: {}",
                coworker,
                self.roles().join(", ")
            );
        };

        tracing::info!(coworker = member.role(), "delegating to coworker");
        let prompt = format!(
            "{}\n\nThis is the context you're working with:\n{}",
            request, context
        );
        let output = member.execute(&prompt, self.observer.as_ref()).await?;
        Ok(output)
    }
}

fn coworker_schema(request_field: &str, request_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "coworker": {
                "type": "string",
                "description": "The role of the coworker to ask"
            },
            request_field: {
                "type": "string",
                "description": request_description
            },
            "context": {
                "type": "string",
                "description": "All the context the coworker needs; they know nothing about your task"
            }
        },
        "required": ["coworker", request_field, "context"]
    })
}

/// Hand a piece of work to a coworker and return their result.
pub struct DelegateWorkTool {
    coworkers: Arc<Coworkers>,
    description: String,
}

impl DelegateWorkTool {
    pub fn new(coworkers: Arc<Coworkers>) -> Self {
        let description = format!(
            "Delegate a specific task to one of the following coworkers: {}. \
             Provide the task and all necessary context.",
            coworkers.roles().join(", ")
        );
        Self {
            coworkers,
            description,
        }
    }
}

#[async_trait]
impl Tool for DelegateWorkTool {
    fn name(&self) -> &str {
        "delegate_work"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        coworker_schema("task", "The task to delegate")
    }

    async fn execute(&self, params: Value) -> anyhow::Result<String> {
        let coworker = required_str(&params, "coworker")?;
        let task = required_str(&params, "task")?;
        let context = params.get("context").and_then(|c| c.as_str()).unwrap_or("");
        self.coworkers.run(coworker, task, context).await
    }
}

/// Ask a coworker a question and return their answer.
pub struct AskQuestionTool {
    coworkers: Arc<Coworkers>,
    description: String,
}

impl AskQuestionTool {
    pub fn new(coworkers: Arc<Coworkers>) -> Self {
        let description = format!(
            "Ask a specific question to one of the following coworkers: {}. \
             Provide the question and all necessary context.",
            coworkers.roles().join(", ")
        );
        Self {
            coworkers,
            description,
        }
    }
}

#[async_trait]
impl Tool for AskQuestionTool {
    fn name(&self) -> &str {
        "ask_question"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        coworker_schema("question", "The question to ask")
    }

    async fn execute(&self, params: Value) -> anyhow::Result<String> {
        let coworker = required_str(&params, "coworker")?;
        let question = required_str(&params, "question")?;
        let context = params.get("context").and_then(|c| c.as_str()).unwrap_or("");
        self.coworkers.run(coworker, question, context).await
    }
}
