// ABOUTME: AgentExecutor runs one agent on one task: a tool-calling loop against the LLM.
// ABOUTME: Every step is reported to the observer as an action list or a finish payload.

use std::sync::Arc;

use serde_json::Value;

use blogsmith_core::{AgentAction, AgentDefinition, actions_payload, finish_payload};

use crate::llm::{ChatMessage, ChatRequest, LlmClient, LlmError, ToolCall};
use crate::observer::StepObserver;
use crate::tools::ToolRegistry;

const EMPTY_ANSWER_NUDGE: &str =
    "Your last response was empty. Continue working on the task, or give your final answer.";
const FORCE_FINAL_ANSWER: &str = "You have used the maximum number of steps. \
     Now give your absolute best final answer to the task, using what you have gathered so far.";

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("agent '{role}' produced no final answer")]
    NoFinalAnswer { role: String },
}

/// One agent bound to an LLM client and its tools.
#[derive(Clone)]
pub struct AgentExecutor {
    agent: AgentDefinition,
    client: Arc<dyn LlmClient>,
    tools: ToolRegistry,
}

impl AgentExecutor {
    pub fn new(agent: AgentDefinition, client: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        Self {
            agent,
            client,
            tools,
        }
    }

    pub fn role(&self) -> &str {
        &self.agent.role
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.agent
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.agent.role, self.agent.backstory, self.agent.goal
        )
    }

    /// Run the agent on a fully rendered task prompt and return its final answer.
    pub async fn execute(
        &self,
        task_prompt: &str,
        observer: &dyn StepObserver,
    ) -> Result<String, AgentError> {
        let role = self.agent.role.as_str();
        let definitions = self.tools.definitions();
        let mut messages = vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(task_prompt),
        ];

        for iteration in 0..self.agent.max_iterations.max(1) {
            let request = ChatRequest {
                messages: messages.clone(),
                tools: definitions.clone(),
            };
            let response = self.client.chat(&request).await?;
            tracing::debug!(
                agent = role,
                iteration,
                tool_calls = response.tool_calls.len(),
                "agent step"
            );

            if response.tool_calls.is_empty() {
                let answer = response.text_content().trim().to_string();
                if answer.is_empty() {
                    messages.push(ChatMessage::assistant(""));
                    messages.push(ChatMessage::user(EMPTY_ANSWER_NUDGE));
                    continue;
                }
                observer
                    .on_step(role, finish_payload(&answer, &answer))
                    .await;
                return Ok(answer);
            }

            let thought = response.content.clone().unwrap_or_default();
            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            let mut pairs = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let observation = self.run_tool(call).await?;
                messages.push(ChatMessage::tool_result(&call.id, &observation));
                pairs.push((
                    AgentAction {
                        tool: call.name.clone(),
                        tool_input: call.arguments.clone(),
                        log: thought.clone(),
                    },
                    observation,
                ));
            }
            observer.on_step(role, actions_payload(&pairs)).await;
        }

        tracing::warn!(agent = role, "iteration limit reached, forcing final answer");
        messages.push(ChatMessage::user(FORCE_FINAL_ANSWER));
        let response = self
            .client
            .chat(&ChatRequest {
                messages,
                tools: Vec::new(),
            })
            .await?;
        let answer = response.text_content().trim().to_string();
        if answer.is_empty() {
            return Err(AgentError::NoFinalAnswer {
                role: role.to_string(),
            });
        }
        observer
            .on_step(role, finish_payload(&answer, &answer))
            .await;
        Ok(answer)
    }

    /// Execute a single tool call. Tool failures become observations so the model
    /// can recover; an LLM failure inside a delegated coworker aborts the agent.
    async fn run_tool(&self, call: &ToolCall) -> Result<String, AgentError> {
        let Some(tool) = self.tools.get(&call.name) else {
            return Ok(format!(
                "Tool error: '{}' is not a valid tool. Available tools: {}",
                call.name,
                self.tools.names().join(", ")
            ));
        };

        let params = match &call.arguments {
            Value::Object(_) => call.arguments.clone(),
            Value::Null => Value::Object(Default::default()),
            other => {
                return Ok(format!(
                    "Tool error: arguments for '{}' must be a JSON object, got: {}",
                    call.name, other
                ));
            }
        };

        match tool.execute(params).await {
            Ok(output) => Ok(output),
            Err(e) => match e.downcast::<AgentError>() {
                Ok(AgentError::Llm(llm)) => {
                    tracing::error!(tool = %call.name, error = %llm, "coworker LLM call failed");
                    Err(AgentError::Llm(llm))
                }
                Ok(other) => {
                    tracing::warn!(tool = %call.name, error = %other, "tool failed");
                    Ok(format!("Tool error: {}", other))
                }
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool failed");
                    Ok(format!("Tool error: {}", e))
                }
            },
        }
    }
}
