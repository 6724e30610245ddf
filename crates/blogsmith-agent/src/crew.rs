// ABOUTME: CrewRunner executes a CrewDefinition's tasks in order, threading outputs forward as context.
// ABOUTME: Builds per-agent tool registries, wiring delegation tools for agents that allow it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use blogsmith_core::{CrewDefinition, CrewError, Inputs, TaskDefinition, Topic, topic_inputs};

use crate::config::{LlmConfig, ToolSettings};
use crate::executor::{AgentError, AgentExecutor};
use crate::llm::LlmClient;
use crate::observer::StepObserver;
use crate::providers::OpenAiClient;
use crate::tools::{AskQuestionTool, Coworkers, DelegateWorkTool, ToolEnvironment};

const CONTEXT_DIVIDER: &str = "\n\n----------\n\n";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid crew: {0}")]
    Crew(#[from] CrewError),

    #[error("task '{task}' failed: {source}")]
    Agent {
        task: String,
        #[source]
        source: AgentError,
    },
}

/// What one task produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub raw: String,
}

/// Result of a full crew run. `raw` is the last task's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewOutput {
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

/// Render the user prompt for a task, including prior outputs as context.
pub fn task_prompt(task: &TaskDefinition, context: &[TaskOutput]) -> String {
    let mut prompt = format!(
        "{}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.description, task.expected_output
    );
    if !context.is_empty() {
        let joined = context
            .iter()
            .map(|o| o.raw.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_DIVIDER);
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(&joined);
    }
    prompt
}

/// Runs a validated crew against an LLM client.
pub struct CrewRunner {
    crew: CrewDefinition,
    client: Arc<dyn LlmClient>,
    tools: ToolEnvironment,
}

impl CrewRunner {
    pub fn new(
        crew: CrewDefinition,
        client: Arc<dyn LlmClient>,
        tools: ToolEnvironment,
    ) -> Result<Self, CrewError> {
        crew.validate()?;
        Ok(Self {
            crew,
            client,
            tools,
        })
    }

    /// Runner talking to an OpenAI-compatible endpoint, which also embeds the notes.
    pub fn from_config(
        llm: LlmConfig,
        settings: ToolSettings,
        crew: CrewDefinition,
    ) -> Result<Self, CrewError> {
        let client = Arc::new(OpenAiClient::new(llm));
        let tools = ToolEnvironment::new(settings, client.clone());
        Self::new(crew, client, tools)
    }

    pub fn crew(&self) -> &CrewDefinition {
        &self.crew
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Build one executor per agent role for an interpolated crew.
    fn executors(
        &self,
        crew: &CrewDefinition,
        observer: &Arc<dyn StepObserver>,
    ) -> HashMap<String, AgentExecutor> {
        let base: Vec<AgentExecutor> = crew
            .agents
            .iter()
            .map(|agent| {
                AgentExecutor::new(
                    agent.clone(),
                    self.client.clone(),
                    self.tools.registry_for(&agent.tools),
                )
            })
            .collect();

        base.iter()
            .map(|executor| {
                let agent = executor.definition();
                let mut registry = executor.tools().clone();
                if agent.allow_delegation {
                    let others: Vec<AgentExecutor> = base
                        .iter()
                        .filter(|other| other.role() != agent.role)
                        .cloned()
                        .collect();
                    if !others.is_empty() {
                        let coworkers = Arc::new(Coworkers::new(others, observer.clone()));
                        registry.register(Arc::new(DelegateWorkTool::new(coworkers.clone())));
                        registry.register(Arc::new(AskQuestionTool::new(coworkers)));
                    }
                }
                (
                    agent.role.clone(),
                    AgentExecutor::new(agent.clone(), self.client.clone(), registry),
                )
            })
            .collect()
    }

    /// Run every task in order with `inputs` substituted into the crew's prompts.
    pub async fn kickoff(
        &self,
        inputs: &Inputs,
        observer: Arc<dyn StepObserver>,
    ) -> Result<CrewOutput, PipelineError> {
        let crew = self.crew.interpolated(inputs);
        crew.validate()?;
        let executors = self.executors(&crew, &observer);

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(crew.tasks.len());
        for task in &crew.tasks {
            let executor = executors.get(&task.agent).ok_or_else(|| CrewError::UnknownAgent {
                task: task.name.clone(),
                agent: task.agent.clone(),
            })?;

            tracing::info!(task = %task.name, agent = %task.agent, "starting task");
            observer.on_task_start(task).await;

            let prompt = task_prompt(task, &outputs);
            let raw = executor
                .execute(&prompt, observer.as_ref())
                .await
                .map_err(|source| PipelineError::Agent {
                    task: task.name.clone(),
                    source,
                })?;

            tracing::info!(task = %task.name, chars = raw.len(), "task finished");
            outputs.push(TaskOutput {
                task: task.name.clone(),
                agent: task.agent.clone(),
                raw,
            });
        }

        let raw = outputs.last().map(|o| o.raw.clone()).unwrap_or_default();
        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
        })
    }

    /// Run the crew for a blog topic.
    pub async fn generate(
        &self,
        topic: &Topic,
        observer: Arc<dyn StepObserver>,
    ) -> Result<CrewOutput, PipelineError> {
        self.kickoff(&topic_inputs(topic.as_str()), observer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use crate::llm::{ChatResponse, LlmError, ToolCall};
    use crate::observer::NoopObserver;
    use crate::testing::{ScriptedLlmClient, StubEmbedder};

    #[derive(Default)]
    struct Recorder {
        tasks: Mutex<Vec<String>>,
        agents: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StepObserver for Recorder {
        async fn on_task_start(&self, task: &TaskDefinition) {
            self.tasks.lock().unwrap().push(task.name.clone());
        }

        async fn on_step(&self, agent: &str, _payload: Value) {
            self.agents.lock().unwrap().push(agent.to_string());
        }
    }

    fn runner(client: Arc<ScriptedLlmClient>) -> CrewRunner {
        let tools = ToolEnvironment::new(
            ToolSettings::new("notes.md"),
            Arc::new(StubEmbedder::default()),
        );
        CrewRunner::new(CrewDefinition::blog_crew(), client, tools).unwrap()
    }

    #[tokio::test]
    async fn runs_tasks_in_order_and_returns_last_output() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            ChatResponse::text("OUTLINE"),
            ChatResponse::text("DRAFT"),
            ChatResponse::text("FINAL BLOG"),
        ]));
        let recorder = Arc::new(Recorder::default());
        let topic = Topic::new("USA Stock Market").unwrap();

        let output = runner(client.clone())
            .generate(&topic, recorder.clone())
            .await
            .unwrap();

        assert_eq!(output.raw, "FINAL BLOG");
        let names: Vec<_> = output.tasks_output.iter().map(|t| t.task.as_str()).collect();
        assert_eq!(names, vec!["outline", "draft", "proofread"]);
        assert_eq!(
            *recorder.tasks.lock().unwrap(),
            vec!["outline", "draft", "proofread"]
        );
        assert_eq!(
            *recorder.agents.lock().unwrap(),
            vec!["Senior Content Strategist", "Tech Blogger", "Senior Blog Editor"]
        );

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        let draft_prompt = requests[1].messages[1].content.clone().unwrap();
        assert!(draft_prompt.contains("educate readers about USA Stock Market"));
        assert!(draft_prompt.contains("OUTLINE"));
        let edit_prompt = requests[2].messages[1].content.clone().unwrap();
        assert!(edit_prompt.contains("OUTLINE\n\n----------\n\nDRAFT"));
    }

    #[tokio::test]
    async fn delegating_agents_get_delegation_tools() {
        let client = Arc::new(ScriptedLlmClient::new(vec![]));
        runner(client.clone())
            .generate(&Topic::new("Bonds").unwrap(), Arc::new(NoopObserver))
            .await
            .unwrap();

        let requests = client.requests();
        let tool_names = |i: usize| -> Vec<String> {
            requests[i].tools.iter().map(|t| t.name.clone()).collect()
        };
        assert_eq!(
            tool_names(0),
            vec!["web_search", "scrape_website", "read_notes", "search_notes"]
        );
        assert_eq!(
            tool_names(1),
            vec!["read_notes", "search_notes", "delegate_work", "ask_question"]
        );
    }

    #[tokio::test]
    async fn delegated_work_runs_coworker() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            ChatResponse::text("OUTLINE"),
            ChatResponse::tool_calls(vec![ToolCall {
                id: "d1".to_string(),
                name: "ask_question".to_string(),
                arguments: json!({
                    "coworker": "Senior Content Strategist",
                    "question": "Which section first?",
                    "context": "Writing about bonds"
                }),
            }]),
            ChatResponse::text("Start with basics."),
            ChatResponse::text("DRAFT"),
            ChatResponse::text("FINAL"),
        ]));
        let recorder = Arc::new(Recorder::default());
        let output = runner(client.clone())
            .generate(&Topic::new("Bonds").unwrap(), recorder.clone())
            .await
            .unwrap();
        assert_eq!(output.raw, "FINAL");
        assert_eq!(output.tasks_output[1].raw, "DRAFT");

        let agents = recorder.agents.lock().unwrap().clone();
        assert_eq!(
            agents,
            vec![
                "Senior Content Strategist",
                "Senior Content Strategist",
                "Tech Blogger",
                "Tech Blogger",
                "Senior Blog Editor",
            ]
        );
    }

    #[tokio::test]
    async fn failure_names_the_task() {
        let client = Arc::new(ScriptedLlmClient::failing(LlmError::Unauthorized));
        let err = runner(client)
            .generate(&Topic::new("Bonds").unwrap(), Arc::new(NoopObserver))
            .await
            .unwrap_err();
        assert!(matches!(&err, PipelineError::Agent { task, .. } if task == "outline"));
        assert!(err.to_string().contains("outline"));
    }

    #[test]
    fn invalid_crew_is_rejected() {
        let mut crew = CrewDefinition::blog_crew();
        crew.tasks[0].agent = "Nobody".to_string();
        let tools = ToolEnvironment::new(
            ToolSettings::new("notes.md"),
            Arc::new(StubEmbedder::default()),
        );
        let result = CrewRunner::new(crew, Arc::new(ScriptedLlmClient::default()), tools);
        assert!(matches!(result, Err(CrewError::UnknownAgent { .. })));
    }

    #[test]
    fn first_task_prompt_has_no_context() {
        let crew = CrewDefinition::blog_crew();
        let prompt = task_prompt(&crew.tasks[0], &[]);
        assert!(prompt.contains("This is the expected criteria for your final answer: Markdown text of the outline"));
        assert!(!prompt.contains("context you're working with"));
    }
}
