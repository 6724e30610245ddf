// ABOUTME: Step payloads reported by running agents and the classifier that interprets them.
// ABOUTME: Classifies opaque JSON payloads into FinishResult, ActionObservation, or RawPayload.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const UNKNOWN: &str = "Unknown";

/// A tool invocation the agent decided on during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: Value,
    /// The agent's reasoning text that accompanied the call.
    pub log: String,
}

/// Wire shape for a finished agent step: `{"return_values": {"output": ..}, "log": ..}`.
pub fn finish_payload(output: &str, log: &str) -> Value {
    json!({
        "return_values": { "output": output },
        "log": log,
    })
}

/// Wire shape for a tool-using step: a list of `[action, observation]` pairs.
pub fn actions_payload(pairs: &[(AgentAction, String)]) -> Value {
    Value::Array(
        pairs
            .iter()
            .map(|(action, observation)| {
                json!([
                    {
                        "tool": action.tool,
                        "tool_input": action.tool_input,
                        "log": action.log,
                    },
                    observation,
                ])
            })
            .collect(),
    )
}

/// One action/observation pair, flattened to display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStep {
    pub tool: String,
    pub tool_input: String,
    pub log: String,
    pub observation: String,
}

/// The interpreted form of a step payload, ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepEvent {
    /// The agent finished its task and produced this output.
    FinishResult { agent: String, output: String },

    /// The agent called one or more tools and saw these observations.
    ActionObservation { agent: String, steps: Vec<ToolStep> },

    /// Anything that did not match a known shape, shown verbatim.
    RawPayload {
        agent: String,
        payload_type: String,
        raw: String,
    },
}

impl StepEvent {
    /// Interpret a step payload. Never fails: unrecognized shapes become `RawPayload`.
    ///
    /// Strings are first tried as JSON, so a payload that arrives JSON-encoded is
    /// classified by its decoded shape.
    pub fn classify(agent: &str, payload: &Value) -> Self {
        let decoded;
        let payload = match payload {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(inner) => {
                    decoded = inner;
                    &decoded
                }
                Err(_) => payload,
            },
            other => other,
        };

        if let Some(output) = finish_output(payload) {
            return StepEvent::FinishResult {
                agent: agent.to_string(),
                output,
            };
        }

        if let Some(steps) = action_pairs(payload) {
            return StepEvent::ActionObservation {
                agent: agent.to_string(),
                steps,
            };
        }

        StepEvent::RawPayload {
            agent: agent.to_string(),
            payload_type: type_name(payload).to_string(),
            raw: match payload {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    pub fn agent(&self) -> &str {
        match self {
            StepEvent::FinishResult { agent, .. }
            | StepEvent::ActionObservation { agent, .. }
            | StepEvent::RawPayload { agent, .. } => agent,
        }
    }
}

fn finish_output(payload: &Value) -> Option<String> {
    let output = payload.get("return_values")?.get("output")?;
    Some(match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn action_pairs(payload: &Value) -> Option<Vec<ToolStep>> {
    let items = payload.as_array()?;
    if items.is_empty() {
        return None;
    }

    items
        .iter()
        .map(|item| {
            let pair = item.as_array()?;
            if pair.len() != 2 {
                return None;
            }
            let action = &pair[0];
            Some(ToolStep {
                tool: field_text(action, "tool"),
                tool_input: field_text(action, "tool_input"),
                log: field_text(action, "log"),
                observation: display_text(&pair[1]),
            })
        })
        .collect()
}

fn field_text(action: &Value, key: &str) -> String {
    match action.get(key) {
        Some(value) => display_text(value),
        None => UNKNOWN.to_string(),
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => UNKNOWN.to_string(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
