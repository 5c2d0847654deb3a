#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use babelfish::clients::openrouter::{
    ChatModel, Completion, FunctionCall, Message, ModelError, ToolCall,
};
use babelfish::routes::{self, WebState};
use babelfish_mcp::ToolRouter;
use chess_analysis::{AnalysisError, ChessAnalyzer, Engine, PvLine, Score, SearchResult};
use chess_core::parse_fen;
use chess_core::position::move_to_uci;
use chess_core::shakmaty::Position;

/// Deterministic engine: the first legal moves, scored 30, 20, 10... for the side to move.
#[derive(Default)]
pub struct FakeEngine;

impl Engine for FakeEngine {
    async fn search(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<SearchResult, AnalysisError> {
        let pos = parse_fen(fen)?;
        let lines: Vec<PvLine> = pos
            .legal_moves()
            .iter()
            .take(multipv as usize)
            .enumerate()
            .map(|(i, mv)| PvLine {
                multipv: i as u32 + 1,
                depth,
                score: Score::Cp(30 - 10 * i as i32),
                pv: vec![move_to_uci(mv)],
            })
            .collect();
        let best_move = lines.first().map(|l| l.pv[0].clone());
        Ok(SearchResult { lines, best_move })
    }
}

pub fn router() -> ToolRouter<FakeEngine> {
    ToolRouter::new(Arc::new(ChessAnalyzer::new(FakeEngine)))
}

/// Chat model that replays scripted completions and records every request.
#[derive(Default)]
pub struct FakeModel {
    script: Mutex<VecDeque<Result<Completion, ModelError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl FakeModel {
    pub fn new(script: Vec<Result<Completion, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChatModel for FakeModel {
    async fn complete(
        &self,
        _model: &str,
        messages: &[Message],
        _tools: &[Value],
    ) -> Result<Completion, ModelError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(text_reply("Done.")))
    }
}

pub fn text_reply(text: &str) -> Completion {
    Completion {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

pub fn tool_reply(calls: Vec<ToolCall>) -> Completion {
    Completion {
        content: None,
        tool_calls: calls,
        finish_reason: Some("tool_calls".to_string()),
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// Serve the web app on an ephemeral port and return its base URL.
pub async fn spawn_web(model: Option<Arc<FakeModel>>) -> String {
    let state = WebState {
        router: router(),
        model,
        model_name: "test/model".to_string(),
    };
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    format!("http://{addr}")
}
