// ABOUTME: Agent runtime for blogsmith: the LLM provider, tools, agent executor, and crew runner.
// ABOUTME: The server drives a CrewRunner and receives progress through a StepObserver.

pub mod config;
pub mod crew;
pub mod executor;
pub mod llm;
pub mod observer;
pub mod providers;
pub mod testing;
pub mod tools;

pub use config::{LlmConfig, ToolSettings};
pub use crew::{CrewOutput, CrewRunner, PipelineError, TaskOutput};
pub use executor::{AgentError, AgentExecutor};
pub use llm::{ChatMessage, ChatRequest, ChatResponse, Embedder, LlmClient, LlmError};
pub use observer::{NoopObserver, StepObserver};
pub use tools::{Tool, ToolEnvironment, ToolRegistry};
