//! Tool-calling loop between a chat model and the chess tools.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use babelfish_mcp::ToolRouter;
use chess_analysis::Engine;

use crate::clients::openrouter::{openai_tools, ChatModel, Message, ModelError, ToolCall};

pub const CHAT_MAX_ITERATIONS: usize = 5;
pub const WEB_MAX_ITERATIONS: usize = 16;
/// Tool results longer than this are replaced by a notice before reaching the model
pub const MAX_RESULT_CHARS: usize = 8000;
pub const DEBUG_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(prompt: &str) -> Self {
        Self {
            messages: vec![Message::System {
                content: prompt.to_string(),
            }],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Forget the exchange but keep the system prompt.
    pub fn reset(&mut self) {
        self.messages
            .retain(|m| matches!(m, Message::System { .. }));
    }

    /// Messages excluding the system prompt.
    pub fn history(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| !matches!(m, Message::System { .. }))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebugEvent {
    UserRequest {
        content: String,
    },
    IterationStart {
        iteration: usize,
    },
    AiResponse {
        content: String,
        finish_reason: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    ToolCall {
        tool_name: String,
        arguments: Value,
        tool_call_id: String,
    },
    ToolResult {
        tool_name: String,
        result: String,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugEntry {
    #[serde(flatten)]
    pub event: DebugEvent,
    /// Unix time in seconds
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DebugLog {
    entries: Vec<DebugEntry>,
}

impl DebugLog {
    pub fn push(&mut self, event: DebugEvent) {
        let timestamp = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        self.entries.push(DebugEntry { event, timestamp });
    }

    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Last non-empty assistant text produced during the turn
    pub reply: Option<String>,
    pub iterations: usize,
    /// The model still wanted tools when the iteration cap was hit
    pub exhausted: bool,
}

/// Truncate to `limit` characters, marking the cut with `...`.
pub fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

fn limit_result(tool_name: &str, text: String) -> String {
    let len = text.chars().count();
    if len <= MAX_RESULT_CHARS {
        return text;
    }
    warn!(tool = tool_name, chars = len, "Tool result too large, omitted");
    format!(
        "Result too large ({len} chars). The output of {tool_name} was omitted; ask for a narrower query."
    )
}

pub struct Agent<E, M> {
    router: ToolRouter<E>,
    model: Arc<M>,
    model_name: String,
    tools: Vec<Value>,
    max_iterations: usize,
}

impl<E: Engine, M: ChatModel> Agent<E, M> {
    pub fn new(
        router: ToolRouter<E>,
        model: Arc<M>,
        model_name: impl Into<String>,
        max_iterations: usize,
    ) -> Self {
        let tools = openai_tools(&router.tools());
        Self {
            router,
            model,
            model_name: model_name.into(),
            tools,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn set_model_name(&mut self, name: impl Into<String>) {
        self.model_name = name.into();
    }

    pub fn router(&self) -> &ToolRouter<E> {
        &self.router
    }

    /// Add `input` as a user message and let the model work until it stops
    /// asking for tools or the iteration cap is reached.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        log: &mut DebugLog,
    ) -> Result<TurnOutcome, ModelError> {
        conversation.push(Message::User {
            content: input.to_string(),
        });
        log.push(DebugEvent::UserRequest {
            content: input.to_string(),
        });

        let mut reply = None;
        let mut iterations = 0;
        let mut pending_tools = false;

        while iterations < self.max_iterations {
            iterations += 1;
            log.push(DebugEvent::IterationStart {
                iteration: iterations,
            });

            let completion = match self
                .model
                .complete(&self.model_name, conversation.messages(), &self.tools)
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    log.push(DebugEvent::Error {
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            let content = completion.content.clone().unwrap_or_default();
            log.push(DebugEvent::AiResponse {
                content: content.clone(),
                finish_reason: completion.finish_reason.clone(),
                tool_calls: completion.tool_calls.clone(),
            });
            if !content.trim().is_empty() {
                reply = Some(content);
            }

            let calls = completion.tool_calls;
            conversation.push(Message::Assistant {
                content: completion.content,
                tool_calls: calls.clone(),
            });

            pending_tools = !calls.is_empty();
            if !pending_tools {
                break;
            }

            for call in &calls {
                let result = self.execute(call, log).await;
                conversation.push(Message::Tool {
                    tool_call_id: call.id.clone(),
                    name: call.function.name.clone(),
                    content: result,
                });
            }
        }

        if pending_tools {
            warn!(
                max_iterations = self.max_iterations,
                "Iteration cap reached with tool calls outstanding"
            );
        }
        info!(iterations, model = %self.model_name, "Turn finished");

        Ok(TurnOutcome {
            reply,
            iterations,
            exhausted: pending_tools,
        })
    }

    async fn execute(&self, call: &ToolCall, log: &mut DebugLog) -> String {
        let name = call.function.name.as_str();
        let raw = call.function.arguments.trim();
        let parsed = if raw.is_empty() {
            Ok(Value::Object(Default::default()))
        } else {
            serde_json::from_str::<Value>(raw)
        };

        let arguments = match parsed {
            Ok(args) => args,
            Err(e) => {
                let error = format!("Tool execution error: invalid JSON arguments for {name}: {e}");
                warn!(tool = name, error = %e, "Bad tool arguments from model");
                log.push(DebugEvent::Error {
                    error: error.clone(),
                });
                return error;
            }
        };

        debug!(tool = name, id = %call.id, "Executing tool call");
        log.push(DebugEvent::ToolCall {
            tool_name: name.to_string(),
            arguments: arguments.clone(),
            tool_call_id: call.id.clone(),
        });

        let output = self.router.call(name, arguments).await;
        let text = limit_result(name, output.text);
        log.push(DebugEvent::ToolResult {
            tool_name: name.to_string(),
            result: preview(&text, DEBUG_PREVIEW_CHARS),
        });
        text
    }
}
