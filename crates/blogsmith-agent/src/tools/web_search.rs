// ABOUTME: The web_search tool, querying the Serper Google search API.
// ABOUTME: Organic results are formatted as a numbered list of title, link, and snippet.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Tool, required_str};

const RESULT_COUNT: u32 = 10;

#[derive(Debug, Clone)]
pub struct WebSearchTool {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl WebSearchTool {
    pub fn new(http: reqwest::Client, url: String, api_key: Option<String>) -> Self {
        Self { http, url, api_key }
    }
}

/// Format a Serper response body for the model.
pub fn format_results(query: &str, body: &Value) -> String {
    let organic = body
        .get("organic")
        .and_then(|o| o.as_array())
        .cloned()
        .unwrap_or_default();

    if organic.is_empty() {
        return format!("No search results found for '{}'.", query);
    }

    let mut lines = vec![format!("Search results for '{}':", query)];
    for (i, item) in organic.iter().enumerate() {
        let field = |key: &str| {
            item.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        lines.push(String::new());
        lines.push(format!("{}. {}", i + 1, field("title")));
        lines.push(format!("   Link: {}", field("link")));
        let snippet = field("snippet");
        if !snippet.is_empty() {
            lines.push(format!("   Snippet: {}", snippet));
        }
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the internet for a query and return the top results with links and snippets."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search_query": {
                    "type": "string",
                    "description": "What to search the internet for"
                }
            },
            "required": ["search_query"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<String> {
        let query = required_str(&params, "search_query")?;
        let Some(api_key) = self.api_key.as_deref() else {
            anyhow::bail!("web search is unavailable: SERPER_API_KEY is not configured");
        };

        tracing::debug!(query, "running web search");
        let response = self
            .http
            .post(&self.url)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "num": RESULT_COUNT }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("search request failed with status {}", status);
        }

        let body: Value = response.json().await?;
        Ok(format_results(query, &body))
    }
}
