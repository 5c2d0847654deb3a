use axum::{response::Html, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chess_analysis::Engine;
use chess_core::parse_fen;

use crate::agent::{Agent, Conversation, DebugLog, WEB_MAX_ITERATIONS};
use crate::clients::openrouter::ChatModel;
use crate::error::AppError;
use crate::routes::WebState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub const WEB_SYSTEM_PROMPT: &str = r#"You are Babelfish, an expert chess coach with powerful analysis tools.

CRITICAL INSTRUCTIONS FOR WEB INTERFACE:
1. You MUST use tools to analyze positions before making statements
2. Always visualize the board when discussing piece interactions
3. Provide analysis in clear, well-structured markdown format
4. Clearly separate your final analysis with a markdown header

WEB OUTPUT FORMAT:
Structure your response exactly like this:

## 🔍 Analysis Results

[Your comprehensive analysis here in markdown format]

### Key Findings
- Key tactical motifs discovered
- Strategic plans for both sides
- Critical weaknesses or strengths

### Recommended Moves
- Best moves with explanations
- Alternative options to consider

### Learning Points
- Important chess principles illustrated
- Patterns to remember

MARKDOWN REQUIREMENTS:
- Use ## for main headers, ### for subheaders
- Use **bold** for emphasis
- Use bullet points for lists
- Use > for important quotes or principles
- Keep it readable and well-organized

TOOL USAGE:
- ALWAYS use visualize_board before discussing piece positions
- Use analyze_position for deep evaluation
- Use find_tactical_motifs for tactical analysis
- Never make geometric claims without visual verification

Your goal: Provide expert analysis that combines precise engine evaluation with educational chess coaching, formatted beautifully in markdown."#;

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
    pub debug_log: DebugLog,
    pub board_fen: String,
    pub error: Option<String>,
}

impl AnalyzeResponse {
    fn failure(board_fen: &str, error: impl Into<String>, debug_log: DebugLog) -> Self {
        Self {
            success: false,
            analysis: String::new(),
            debug_log,
            board_fen: board_fen.to_string(),
            error: Some(error.into()),
        }
    }
}

pub fn user_message(fen: &str, question: Option<&str>) -> String {
    match question.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("Analyze this chess position: {fen}\n\nSpecific question: {q}"),
        None => format!("Provide a comprehensive analysis of this chess position: {fen}"),
    }
}

/// POST /analyze
pub async fn analyze<E: Engine, M: ChatModel>(
    Extension(state): Extension<WebState<E, M>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let fen = req.fen.trim();
    if fen.is_empty() {
        return Ok(Json(AnalyzeResponse::failure(
            fen,
            "FEN position is required",
            DebugLog::default(),
        )));
    }
    parse_fen(fen)?;

    let Some(model) = state.model.clone() else {
        return Ok(Json(AnalyzeResponse::failure(
            fen,
            "OPENROUTER_API_KEY environment variable not set",
            DebugLog::default(),
        )));
    };

    let agent = Agent::new(
        state.router.clone(),
        model,
        state.model_name.clone(),
        WEB_MAX_ITERATIONS,
    );
    let mut conversation = Conversation::with_system(WEB_SYSTEM_PROMPT);
    let mut log = DebugLog::default();
    let message = user_message(fen, req.question.as_deref());

    info!(fen, model = %state.model_name, "Web analysis requested");
    match agent.run_turn(&mut conversation, &message, &mut log).await {
        Ok(outcome) => Ok(Json(AnalyzeResponse {
            success: true,
            analysis: outcome.reply.unwrap_or_default(),
            debug_log: log,
            board_fen: fen.to_string(),
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "Web analysis failed");
            Ok(Json(AnalyzeResponse::failure(fen, e.to_string(), log)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let fen = chess_core::STARTING_FEN;
        assert_eq!(
            user_message(fen, None),
            format!("Provide a comprehensive analysis of this chess position: {fen}")
        );
        assert_eq!(user_message(fen, Some("  ")), user_message(fen, None));
        assert!(user_message(fen, Some("Is e4 best?")).ends_with("Specific question: Is e4 best?"));
    }

    #[test]
    fn test_index_is_embedded() {
        assert!(INDEX_HTML.contains("/analyze"));
    }
}
