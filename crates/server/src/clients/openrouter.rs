//! OpenRouter chat-completions client with function calling.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use babelfish_mcp::ToolSpec;

const REFERER: &str = "https://github.com/bobjansen/babelfish";
const TITLE: &str = "Babelfish CLI";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4000;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("OpenRouter returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model response contained no choices")]
    EmptyResponse,
}

/// One message of a chat-completions conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Tool { content, .. } => content.as_str(),
            Message::Assistant { content, .. } => content.as_deref().unwrap_or(""),
        }
    }

    pub fn tool_call_count(&self) -> usize {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as produced by the model
    #[serde(default)]
    pub arguments: String,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

fn function_kind() -> String {
    "function".to_string()
}

/// The first choice of a completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<ChoiceBody>,
}

#[derive(Deserialize)]
struct ChoiceBody {
    message: ReplyBody,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ReplyBody {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context_length: Option<u64>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

/// A chat model that can call tools.
pub trait ChatModel: Send + Sync + 'static {
    fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send;
}

/// MCP tool specs in OpenAI function-calling form.
pub fn openai_tools(specs: &[ToolSpec]) -> Vec<Value> {
    specs
        .iter()
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.input_schema,
                },
            })
        })
        .collect()
}

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self, ModelError> {
        let client = Client::builder()
            .user_agent("Babelfish/0.1")
            .timeout(Duration::from_secs(180))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ModelError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ModelError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// `GET /models`
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        let url = format!("{}/models", self.base_url);
        let resp = self.request(self.client.get(&url)).send().await?;
        let list: ModelList = Self::check(resp).await?.json().await?;
        Ok(list.data)
    }
}

impl ChatModel for OpenRouterClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<Completion, ModelError> {
        let mut payload = json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "stream": false,
        });
        if !tools.is_empty() {
            payload["tools"] = Value::from(tools.to_vec());
            payload["tool_choice"] = json!("auto");
        }

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model, messages = messages.len(), "Chat completion request");
        let resp = self
            .request(self.client.post(&url))
            .json(&payload)
            .send()
            .await?;
        let body: CompletionBody = Self::check(resp).await?.json().await?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(ModelError::EmptyResponse)?;
        Ok(Completion {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_tools_shape() {
        let tools = openai_tools(&babelfish_mcp::catalogue());
        assert_eq!(tools.len(), babelfish_mcp::catalogue().len());
        let first = &tools[0];
        assert_eq!(first["type"], "function");
        assert_eq!(first["function"]["name"], "analyze_position");
        assert_eq!(first["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_message_wire_format() {
        let msg = Message::Tool {
            tool_call_id: "call_1".into(),
            name: "analyze_position".into(),
            content: "ok".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "tool",
                "tool_call_id": "call_1",
                "name": "analyze_position",
                "content": "ok",
            })
        );

        let plain = Message::Assistant {
            content: Some("hi".into()),
            tool_calls: vec![],
        };
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"role": "assistant", "content": "hi"})
        );
    }

    #[test]
    fn test_tool_call_defaults() {
        let call: ToolCall =
            serde_json::from_value(json!({"function": {"name": "visualize_board"}})).unwrap();
        assert_eq!(call.id, "unknown");
        assert_eq!(call.kind, "function");
        assert_eq!(call.function.arguments, "");
    }

    #[test]
    fn test_completion_body_parsing() {
        let body: CompletionBody = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "analyze_position", "arguments": "{\"fen\":\"x\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        let choice = &body.choices[0];
        assert!(choice.message.content.is_none());
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(choice.message.tool_calls.as_ref().unwrap()[0].id, "call_9");
    }
}
