// ABOUTME: OpenAI-compatible adapter implementing LlmClient and Embedder over reqwest.
// ABOUTME: Translates ChatRequest into Chat Completions calls with function calling, and embeds notes.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::llm::{
    ChatMessage, ChatRequest, ChatResponse, Embedder, LlmClient, LlmError, Role, ToolCall,
    ToolDefinition,
};

const MAX_TOKENS: u32 = 4096;

/// Client for any endpoint speaking the OpenAI Chat Completions and Embeddings APIs.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Build the JSON request body for the Chat Completions API.
    pub fn build_request_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_json).collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(tool_to_json).collect());
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Parse a Chat Completions response body.
    pub fn parse_response(response_body: &Value) -> Result<ChatResponse, LlmError> {
        let choice = response_body
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LlmError::InvalidResponse("missing choices array in response".to_string()))?
            .first()
            .ok_or_else(|| LlmError::InvalidResponse("empty choices array".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| LlmError::InvalidResponse("missing message in choice".to_string()))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(String::from);

        let tool_calls = match message.get("tool_calls").and_then(|t| t.as_array()) {
            Some(calls) => calls
                .iter()
                .map(parse_tool_call)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(String::from);

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
        })
    }

    /// Parse an Embeddings API response, ordering vectors by their `index`.
    pub fn parse_embeddings(response_body: &Value) -> Result<Vec<Vec<f32>>, LlmError> {
        let data = response_body
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| LlmError::InvalidResponse("missing data array in embeddings response".to_string()))?;

        let mut indexed = Vec::with_capacity(data.len());
        for (position, item) in data.iter().enumerate() {
            let index = item
                .get("index")
                .and_then(|i| i.as_u64())
                .map(|i| i as usize)
                .unwrap_or(position);
            let vector = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| LlmError::InvalidResponse("embedding entry missing vector".to_string()))?
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| LlmError::InvalidResponse("non-numeric embedding value".to_string()))?;
            indexed.push((index, vector));
        }

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}/{}", self.config.base_url(), path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ProviderError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::Unauthorized);
        }

        if status.is_server_error() {
            return Err(LlmError::ProviderError(format!("Server error: {}", status)));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::ProviderError(format!(
                "API error {}: {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse JSON: {}", e)))
    }
}

fn message_to_json(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let mut value = json!({
        "role": role,
        "content": message.content,
    });

    if !message.tool_calls.is_empty() {
        value["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    let arguments = match &call.arguments {
                        Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": arguments }
                    })
                })
                .collect(),
        );
    }

    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = json!(id);
    }

    value
}

fn tool_to_json(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Parse a single tool_call entry. Arguments that are not valid JSON are kept
/// as a raw string so the executor can report the problem back to the model.
fn parse_tool_call(tool_call: &Value) -> Result<ToolCall, LlmError> {
    let id = tool_call
        .get("id")
        .and_then(|i| i.as_str())
        .unwrap_or_default()
        .to_string();

    let function = tool_call
        .get("function")
        .ok_or_else(|| LlmError::InvalidResponse("tool_call missing function".to_string()))?;

    let name = function
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| LlmError::InvalidResponse("function missing name".to_string()))?
        .to_string();

    let raw_arguments = function
        .get("arguments")
        .and_then(|a| a.as_str())
        .unwrap_or("{}");

    let arguments = serde_json::from_str(raw_arguments)
        .unwrap_or_else(|_| Value::String(raw_arguments.to_string()));

    Ok(ToolCall {
        id,
        name,
        arguments,
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = self.build_request_body(request);
        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );
        let response_body = self.post_json("chat/completions", &body).await?;
        Self::parse_response(&response_body)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.config.embedding_model,
            "input": inputs,
        });
        let response_body = self.post_json("embeddings", &body).await?;
        let vectors = Self::parse_embeddings(&response_body)?;
        if vectors.len() != inputs.len() {
            return Err(LlmError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}
