//! Integration tests: the OpenRouter client against a local stand-in API.

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};

use babelfish::clients::openrouter::{
    openai_tools, ChatModel, Message, ModelError, OpenRouterClient,
};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(HeaderMap, Value)>>>);

async fn chat_completions(
    Extension(captured): Extension<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.0.lock().unwrap().push((headers, body));
    Json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": "visualize_board", "arguments": "{}" }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    }))
}

async fn models() -> Json<Value> {
    Json(json!({
        "data": [
            { "id": "openai/gpt-4o", "name": "GPT-4o", "context_length": 128000 },
            { "id": "someone/obscure" }
        ]
    }))
}

async fn rejected() -> (StatusCode, &'static str) {
    (StatusCode::UNAUTHORIZED, "bad key")
}

async fn spawn_api(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    format!("http://{addr}/api/v1")
}

#[tokio::test]
async fn complete_sends_headers_and_sampling_settings() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/api/v1/chat/completions", post(chat_completions))
        .layer(Extension(captured.clone()));
    let base = spawn_api(app).await;

    let client = OpenRouterClient::new("sk-test", &format!("{base}/")).unwrap();
    let messages = vec![Message::User {
        content: "Analyze this".into(),
    }];
    let tools = openai_tools(&babelfish_mcp::catalogue());
    let completion = client
        .complete("openai/gpt-4o", &messages, &tools)
        .await
        .unwrap();

    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].function.name, "visualize_board");
    assert_eq!(completion.finish_reason.as_deref(), Some("tool_calls"));

    let requests = captured.0.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert_eq!(headers["http-referer"], "https://github.com/bobjansen/babelfish");
    assert_eq!(headers["x-title"], "Babelfish CLI");

    assert_eq!(body["model"], "openai/gpt-4o");
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["max_tokens"], 4000);
    assert_eq!(body["stream"], false);
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"].as_array().unwrap().len(), tools.len());
    assert_eq!(body["messages"][0], json!({ "role": "user", "content": "Analyze this" }));
}

#[tokio::test]
async fn complete_without_tools_omits_tool_choice() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/api/v1/chat/completions", post(chat_completions))
        .layer(Extension(captured.clone()));
    let client = OpenRouterClient::new("sk-test", &spawn_api(app).await).unwrap();

    let messages = vec![Message::User {
        content: "hi".into(),
    }];
    client.complete("m", &messages, &[]).await.unwrap();

    let requests = captured.0.lock().unwrap().clone();
    let body = &requests[0].1;
    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
}

#[tokio::test]
async fn list_models_parses_the_catalogue() {
    let app = Router::new().route("/api/v1/models", get(models));
    let client = OpenRouterClient::new("sk-test", &spawn_api(app).await).unwrap();

    let models = client.list_models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "openai/gpt-4o");
    assert_eq!(models[0].context_length, Some(128000));
    assert_eq!(models[1].name, None);
}

#[tokio::test]
async fn error_status_keeps_code_and_body() {
    let app = Router::new()
        .route("/api/v1/chat/completions", post(rejected))
        .route("/api/v1/models", get(rejected));
    let client = OpenRouterClient::new("sk-bad", &spawn_api(app).await).unwrap();

    let messages = vec![Message::User {
        content: "hi".into(),
    }];
    let err = client.complete("m", &messages, &[]).await.unwrap_err();
    match err {
        ModelError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("Expected a status error, got {other:?}"),
    }

    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, ModelError::Status { status: 401, .. }));
}
