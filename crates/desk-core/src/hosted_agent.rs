//! Client for the hosted automation agent.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The conversation
//! is kept as raw JSON messages so tool results can be fed back verbatim; the
//! tool set comes from whatever tool server the caller connected to.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model deployment.
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

/// Default limit on model rounds that end in tool calls.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Instructions for the automation agent.
const INSTRUCTIONS: &str = "You are an automation assistant with two skills:
- Web UI automation: navigate sites, take screenshots, click, type and fill forms.
- REST API automation: issue HTTP calls, inspect responses and chain requests.

For every request:
1. Decide whether it needs UI automation, API automation, or both.
2. Plan the steps before acting.
3. Use the available tools instead of guessing.
4. Keep going until the request is fully resolved.
5. Finish with a short summary of what was automated and any problems.

Put your reasoning in a <thinking> section before the final answer.";

/// Errors talking to the hosted agent.
#[derive(Error, Debug)]
pub enum HostedAgentError {
    /// No API key configured.
    #[error("AGENT_API_KEY not set")]
    NoApiKey,

    /// Request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Endpoint answered with a non-success status.
    #[error("agent endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be interpreted.
    #[error("failed to parse response: {0}")]
    ParseError(String),
}

/// Connection settings for the hosted agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Chat-completions URL.
    pub endpoint: String,
    /// Model or deployment name.
    pub model: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Maximum model rounds that may end in tool calls.
    pub max_steps: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Call id to echo back with the result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Decoded arguments object.
    pub arguments: Value,
}

/// One assistant turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    /// Assistant text, if any.
    pub text: Option<String>,
    /// Raw tool-call records, in order.
    pub tool_calls: Vec<Value>,
    /// The assistant message as returned, for the conversation history.
    pub message: Value,
}

impl AgentReply {
    /// Whether the model is done (no tools requested).
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }

    /// Decode the tool-call records.
    ///
    /// Arguments arrive as a JSON string; an empty string means no arguments.
    pub fn calls(&self) -> Result<Vec<ToolCall>, HostedAgentError> {
        self.tool_calls
            .iter()
            .map(|raw| {
                let function = &raw["function"];
                let name = function["name"]
                    .as_str()
                    .ok_or_else(|| HostedAgentError::ParseError("tool call without name".to_string()))?;
                let arguments = match &function["arguments"] {
                    Value::String(s) if s.trim().is_empty() => json!({}),
                    Value::String(s) => serde_json::from_str(s).map_err(|e| {
                        HostedAgentError::ParseError(format!("arguments for {}: {}", name, e))
                    })?,
                    Value::Null => json!({}),
                    other => other.clone(),
                };
                Ok(ToolCall {
                    id: raw["id"].as_str().unwrap_or_default().to_string(),
                    name: name.to_string(),
                    arguments,
                })
            })
            .collect()
    }
}

/// Opening messages for one prompt.
pub fn initial_messages(prompt: &str) -> Vec<Value> {
    vec![
        json!({"role": "system", "content": INSTRUCTIONS}),
        json!({"role": "user", "content": prompt}),
    ]
}

/// Message carrying one tool result back to the model.
pub fn tool_result_message(call_id: &str, content: &str) -> Value {
    json!({"role": "tool", "tool_call_id": call_id, "content": content})
}

/// Describe a tool-server tool as a chat-completions function tool.
pub fn function_tool(name: &str, description: Option<&str>, input_schema: &Value) -> Value {
    let parameters = if input_schema.is_object() {
        input_schema.clone()
    } else {
        json!({"type": "object", "properties": {}})
    };
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description.unwrap_or_default(),
            "parameters": parameters,
        }
    })
}

/// Build the request body for the next turn.
pub fn request_body(model: &str, messages: &[Value], tools: &[Value]) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.to_vec());
    }
    body
}

/// Extract text and tool calls from a chat-completions response.
pub fn parse_reply(json: &Value) -> Result<AgentReply, HostedAgentError> {
    let message = json["choices"][0]
        .get("message")
        .ok_or_else(|| HostedAgentError::ParseError("No message in response".to_string()))?;

    let text = message["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    let tool_calls = message["tool_calls"].as_array().cloned().unwrap_or_default();

    Ok(AgentReply {
        text,
        tool_calls,
        message: message.clone(),
    })
}

/// Run one turn of the conversation against the hosted agent.
pub async fn complete(
    client: &reqwest::Client,
    settings: &AgentSettings,
    messages: &[Value],
    tools: &[Value],
) -> Result<AgentReply, HostedAgentError> {
    let api_key = settings.api_key.as_deref().ok_or(HostedAgentError::NoApiKey)?;

    debug!(
        endpoint = %settings.endpoint,
        model = %settings.model,
        messages = messages.len(),
        "sending turn to hosted agent"
    );

    let response = client
        .post(&settings.endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&request_body(&settings.model, messages, tools))
        .send()
        .await
        .map_err(|e| HostedAgentError::RequestFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(HostedAgentError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let json: Value = response
        .json()
        .await
        .map_err(|e| HostedAgentError::ParseError(e.to_string()))?;

    parse_reply(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let tools = vec![function_tool(
            "browser_navigate",
            Some("Navigate to a URL"),
            &json!({"type": "object", "properties": {"url": {"type": "string"}}}),
        )];
        let body = request_body("m", &initial_messages("open example.com"), &tools);

        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "open example.com");
        assert_eq!(body["tools"][0]["function"]["name"], "browser_navigate");
        assert_eq!(body["tools"][0]["function"]["parameters"]["properties"]["url"]["type"], "string");
    }

    #[test]
    fn test_request_body_without_tools() {
        let body = request_body("m", &initial_messages("hi"), &[]);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_function_tool_fills_missing_schema() {
        let tool = function_tool("browser_snapshot", None, &Value::Null);
        assert_eq!(tool["function"]["description"], "");
        assert_eq!(tool["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_parse_reply_text_only() {
        let json = json!({"choices": [{"message": {"role": "assistant", "content": "Done."}}]});
        let reply = parse_reply(&json).unwrap();
        assert_eq!(reply.text.as_deref(), Some("Done."));
        assert!(reply.is_final());
        assert_eq!(reply.message["role"], "assistant");
    }

    #[test]
    fn test_parse_reply_with_tool_calls() {
        let json = json!({"choices": [{"message": {
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "browser_click", "arguments": "{\"ref\":\"e3\"}"}
            }, {
                "id": "call_2",
                "type": "function",
                "function": {"name": "browser_snapshot", "arguments": ""}
            }]
        }}]});
        let reply = parse_reply(&json).unwrap();
        assert!(reply.text.is_none());
        assert!(!reply.is_final());

        let calls = reply.calls().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "browser_click");
        assert_eq!(calls[0].arguments, json!({"ref": "e3"}));
        assert_eq!(calls[1].arguments, json!({}));
    }

    #[test]
    fn test_calls_rejects_bad_arguments() {
        let reply = AgentReply {
            tool_calls: vec![json!({"id": "c", "function": {"name": "x", "arguments": "{not json"}})],
            ..Default::default()
        };
        assert!(matches!(reply.calls(), Err(HostedAgentError::ParseError(_))));
    }

    #[test]
    fn test_parse_reply_missing_message() {
        let json = json!({"error": {"message": "bad key"}});
        assert!(matches!(parse_reply(&json), Err(HostedAgentError::ParseError(_))));
    }

    #[test]
    fn test_tool_result_message() {
        let msg = tool_result_message("call_1", "navigated");
        assert_eq!(msg["role"], "tool");
        assert_eq!(msg["tool_call_id"], "call_1");
        assert_eq!(msg["content"], "navigated");
    }

    #[tokio::test]
    async fn test_complete_without_key() {
        let client = reqwest::Client::new();
        let result = complete(&client, &AgentSettings::default(), &initial_messages("hi"), &[]).await;
        assert!(matches!(result, Err(HostedAgentError::NoApiKey)));
    }
}
