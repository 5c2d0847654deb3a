//! MCP server over newline-delimited JSON-RPC on stdin/stdout.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use chess_analysis::Engine;

use crate::protocol::{
    CallToolParams, InitializeParams, Request, Response, RpcError, DEFAULT_PROTOCOL_VERSION,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::router::ToolRouter;

pub const SERVER_NAME: &str = "babelfish";

pub struct McpServer<E> {
    router: ToolRouter<E>,
}

impl<E: Engine> McpServer<E> {
    pub fn new(router: ToolRouter<E>) -> Self {
        Self { router }
    }

    /// Handle one frame. Notifications produce no response.
    pub async fn handle_message(&self, line: &str) -> Option<Value> {
        let frame: Value = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Unparsable frame");
                return Some(reply(Response::failure(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                )));
            }
        };

        let Some(obj) = frame.as_object() else {
            return Some(reply(Response::failure(
                Value::Null,
                RpcError::new(INVALID_REQUEST, "Invalid Request: expected an object"),
            )));
        };
        // A frame without an id is a notification
        let id = obj.get("id").cloned();

        let request: Request = match serde_json::from_value(frame.clone()) {
            Ok(req) => req,
            Err(e) => {
                return Some(reply(Response::failure(
                    id.unwrap_or(Value::Null),
                    RpcError::new(INVALID_REQUEST, format!("Invalid Request: {e}")),
                )))
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(reply(Response::failure(
                id.unwrap_or(Value::Null),
                RpcError::new(INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\""),
            )));
        }

        let Some(id) = id else {
            debug!(method = %request.method, "Notification");
            return None;
        };

        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::failure(id, error),
        };
        Some(reply(response))
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "Request");
        match method {
            "initialize" => {
                let params: InitializeParams = if params.is_null() {
                    InitializeParams::default()
                } else {
                    serde_json::from_value(params)
                        .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?
                };
                let version = params
                    .protocol_version
                    .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string());
                info!(protocol_version = %version, "Client initialized");
                Ok(json!({
                    "protocolVersion": version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.router.tools() })),
            "tools/call" => {
                let params: CallToolParams = serde_json::from_value(params)
                    .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;
                let output = self.router.call(&params.name, params.arguments).await;
                Ok(json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "isError": output.is_error,
                }))
            }
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    /// Serve frames until the reader hits EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(line).await,
                Err(e) => {
                    warn!(error = %e, "Frame is not valid UTF-8");
                    Some(reply(Response::failure(
                        Value::Null,
                        RpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                    )))
                }
            };
            if let Some(response) = response {
                write_frame(&mut writer, &response).await?;
            }
        }
        info!("Input closed, shutting down");
        Ok(())
    }

    /// Serve on the process's stdin/stdout, then stop the engine.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        let result = self
            .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await;
        self.router.analyzer().shutdown().await;
        result
    }
}

async fn write_frame<W>(writer: &mut W, frame: &Value) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = serde_json::to_string(frame)?;
    out.push('\n');
    writer.write_all(out.as_bytes()).await?;
    writer.flush().await
}

fn reply(response: Response) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": null,
            "error": { "code": -32603, "message": format!("Internal error: {e}") },
        })
    })
}
