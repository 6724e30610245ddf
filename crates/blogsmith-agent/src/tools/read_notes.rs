// ABOUTME: The read_notes tool, returning the full text of the configured markdown notes file.
// ABOUTME: Read fresh on every call so edits to the notes are picked up between runs.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::Tool;

#[derive(Debug, Clone)]
pub struct ReadNotesTool {
    path: PathBuf,
}

impl ReadNotesTool {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Tool for ReadNotesTool {
    fn name(&self) -> &str {
        "read_notes"
    }

    fn description(&self) -> &str {
        "Read the full content of the notes document the blog post is based on."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _params: Value) -> anyhow::Result<String> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read notes at {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok("(the notes document is empty)".to_string());
        }
        Ok(content)
    }
}
