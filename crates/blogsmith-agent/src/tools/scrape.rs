// ABOUTME: The scrape_website tool: fetch a page over HTTP and convert its HTML to plain text.
// ABOUTME: Output is truncated so a single page cannot flood the model's context.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Tool, required_str, truncate_chars};

const MAX_PAGE_CHARS: usize = 8_000;
const TEXT_WIDTH: usize = 100;

#[derive(Debug, Clone)]
pub struct ScrapeWebsiteTool {
    http: reqwest::Client,
}

impl ScrapeWebsiteTool {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

/// Render HTML as readable text.
pub fn html_to_text(html: &str) -> anyhow::Result<String> {
    let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .map_err(|e| anyhow::anyhow!("failed to convert HTML: {}", e))?;
    Ok(text.trim().to_string())
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    fn name(&self) -> &str {
        "scrape_website"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its readable text content."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "website_url": {
                    "type": "string",
                    "description": "Absolute http(s) URL of the page to read"
                }
            },
            "required": ["website_url"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<String> {
        let url = required_str(&params, "website_url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("website_url must start with http:// or https://");
        }

        tracing::debug!(url, "scraping website");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("fetching {} returned {}", url, status);
        }
        let body = response.text().await?;
        let text = html_to_text(&body)?;
        if text.is_empty() {
            return Ok(format!("(no readable text found at {})", url));
        }
        Ok(truncate_chars(&text, MAX_PAGE_CHARS))
    }
}
