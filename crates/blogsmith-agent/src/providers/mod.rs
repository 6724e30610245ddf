// ABOUTME: Provider module aggregating LLM adapters.
// ABOUTME: Only the OpenAI-compatible Chat Completions adapter is needed by the crew.

pub mod openai;

pub use openai::OpenAiClient;
