// ABOUTME: Tool trait, the per-agent ToolRegistry, and the shared ToolEnvironment that builds them.
// ABOUTME: Each ToolKind in a crew definition maps to one concrete tool implementation here.

pub mod delegate;
pub mod read_notes;
pub mod scrape;
pub mod search_notes;
pub mod web_search;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use blogsmith_core::ToolKind;

use crate::config::ToolSettings;
use crate::llm::{Embedder, ToolDefinition};

pub use delegate::{AskQuestionTool, Coworkers, DelegateWorkTool};
pub use read_notes::ReadNotesTool;
pub use scrape::ScrapeWebsiteTool;
pub use search_notes::{NotesIndex, SearchNotesTool};
pub use web_search::WebSearchTool;

/// A capability an agent can invoke by name with JSON parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the parameters object.
    fn schema(&self) -> Value;

    /// Run the tool. The returned text is handed back to the model as the observation.
    async fn execute(&self, params: Value) -> anyhow::Result<String>;
}

/// The ordered set of tools available to one agent.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Function definitions advertised to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema(),
            })
            .collect()
    }
}

/// Everything the concrete tools share: an HTTP client, settings, and the notes index.
#[derive(Clone)]
pub struct ToolEnvironment {
    http: reqwest::Client,
    settings: ToolSettings,
    notes_index: Arc<NotesIndex>,
}

impl ToolEnvironment {
    pub fn new(settings: ToolSettings, embedder: Arc<dyn Embedder>) -> Self {
        let notes_index = Arc::new(NotesIndex::new(settings.notes_path.clone(), embedder));
        Self {
            http: reqwest::Client::new(),
            settings,
            notes_index,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn tool(&self, kind: ToolKind) -> Arc<dyn Tool> {
        match kind {
            ToolKind::WebSearch => Arc::new(WebSearchTool::new(
                self.http.clone(),
                self.settings.serper_url.clone(),
                self.settings.serper_api_key.clone(),
            )),
            ToolKind::ScrapeWebsite => Arc::new(ScrapeWebsiteTool::new(self.http.clone())),
            ToolKind::ReadNotes => Arc::new(ReadNotesTool::new(self.settings.notes_path.clone())),
            ToolKind::SearchNotes => Arc::new(SearchNotesTool::new(self.notes_index.clone())),
        }
    }

    /// Registry holding one tool per kind, in the order given.
    pub fn registry_for(&self, kinds: &[ToolKind]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for kind in kinds {
            registry.register(self.tool(*kind));
        }
        registry
    }
}

/// Pull a required string parameter out of a tool's JSON arguments.
pub(crate) fn required_str<'a>(params: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing required parameter '{}'", key))
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubEmbedder;
    use serde_json::json;

    fn environment() -> ToolEnvironment {
        ToolEnvironment::new(
            ToolSettings::new("notes.md"),
            Arc::new(StubEmbedder::default()),
        )
    }

    #[test]
    fn registry_follows_requested_order() {
        let registry = environment().registry_for(&[
            ToolKind::WebSearch,
            ToolKind::ScrapeWebsite,
            ToolKind::ReadNotes,
            ToolKind::SearchNotes,
        ]);
        assert_eq!(
            registry.names(),
            vec!["web_search", "scrape_website", "read_notes", "search_notes"]
        );
        let defs = registry.definitions();
        assert_eq!(defs.len(), 4);
        assert!(defs.iter().all(|d| d.parameters["type"] == "object"));
    }

    #[test]
    fn registering_same_name_replaces() {
        let env = environment();
        let registry = env.registry_for(&[ToolKind::ReadNotes, ToolKind::ReadNotes]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("read_notes").is_some());
        assert!(registry.get("web_search").is_none());
    }

    #[test]
    fn required_str_rejects_missing_and_blank() {
        let params = json!({"query": "  bonds ", "empty": "  "});
        assert_eq!(required_str(&params, "query").unwrap(), "bonds");
        assert!(required_str(&params, "empty").is_err());
        assert!(required_str(&params, "absent").is_err());
    }

    #[test]
    fn truncate_chars_is_utf8_safe() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }
}
