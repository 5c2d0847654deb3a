use axum::{body::Bytes, extract::Path, Extension, Json};
use serde_json::{json, Value};

use babelfish_mcp::{tools, ToolOutput};
use chess_analysis::Engine;

use crate::clients::openrouter::ChatModel;
use crate::error::AppError;
use crate::routes::WebState;

/// GET /api/tools
pub async fn list_tools<E: Engine, M: ChatModel>(
    Extension(state): Extension<WebState<E, M>>,
) -> Json<Value> {
    Json(json!({ "tools": state.router.tools() }))
}

/// POST /api/tools/{name}
///
/// Runs one tool directly, without the model. An empty body means no arguments.
pub async fn call_tool<E: Engine, M: ChatModel>(
    Extension(state): Extension<WebState<E, M>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolOutput>, AppError> {
    if tools::find(&name).is_none() {
        return Err(AppError::NotFound(format!("Unknown tool: {name}")));
    }

    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
    };

    Ok(Json(state.router.call(&name, args).await))
}
