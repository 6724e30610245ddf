// ABOUTME: Explicit configuration for the LLM endpoint and the tools, passed to the crew runner.
// ABOUTME: Built once at startup and read-only afterwards; nothing here touches process env.

use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";

/// Connection settings for an OpenAI-compatible Chat Completions endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub model: String,
    pub api_key: String,
    pub embedding_model: String,
}

impl LlmConfig {
    /// Config with the default endpoint and models for the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// `api_base` without a trailing slash, ready for path joining.
    pub fn base_url(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}

// Hand-written so the key never lands in logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

/// Settings for the tools agents may be granted.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// The markdown notes document read by `read_notes` and `search_notes`.
    pub notes_path: PathBuf,
    /// Serper key for `web_search`; the tool reports itself unavailable without one.
    pub serper_api_key: Option<String>,
    pub serper_url: String,
}

impl ToolSettings {
    pub fn new(notes_path: impl Into<PathBuf>) -> Self {
        Self {
            notes_path: notes_path.into(),
            serper_api_key: None,
            serper_url: DEFAULT_SERPER_URL.to_string(),
        }
    }
}

impl fmt::Debug for ToolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSettings")
            .field("notes_path", &self.notes_path)
            .field("serper_api_key", &self.serper_api_key.as_ref().map(|_| "<redacted>"))
            .field("serper_url", &self.serper_url)
            .finish()
    }
}
