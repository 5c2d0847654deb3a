//! Dispatch of tool calls to the analyzer, with typed arguments.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use chess_analysis::analyzer::explain;
use chess_analysis::{AnalysisError, ChessAnalyzer, Engine};
use chess_core::board::{render_board, BoardStyle};
use chess_core::material::{
    endgame_material, game_phase, has_role, piece_count, piece_development, ENDGAME_MAX_PIECES,
};
use chess_core::moves::legal_moves;
use chess_core::pgn::{extract_moves, looks_like_pgn};
use chess_core::position::{play_san_line, position_info};
use chess_core::shakmaty::{Position, Role};
use chess_core::{parse_fen, ChessError, SideName};

use crate::format;
use crate::tools::{self, ToolSpec};

/// Plies of principal variation computed for the endgame report
const ENDGAME_PV_MOVES: usize = 8;
/// Plies of that line shown to the user
const ENDGAME_PV_SHOWN: usize = 6;
const LEGAL_HINT: usize = 15;

/// Text result of a tool call. Failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Chess(#[from] ChessError),
}

impl ToolError {
    fn legal_moves(&self) -> Option<&[String]> {
        let chess = match self {
            ToolError::Chess(e) | ToolError::Analysis(AnalysisError::Chess(e)) => e,
            _ => return None,
        };
        match chess {
            ChessError::IllegalMove { legal, .. } => Some(legal),
            _ => None,
        }
    }

    fn render(&self) -> String {
        let mut text = format!("❌ Error: {self}");
        if let Some(legal) = self.legal_moves() {
            if !legal.is_empty() {
                text.push_str(&format!("\n\n**Legal moves available:** {}", legal.join(", ")));
                if legal.len() >= LEGAL_HINT {
                    text.push_str("...");
                }
            }
        }
        text
    }
}

#[derive(Deserialize)]
struct FenArgs {
    fen: String,
    depth: Option<i64>,
}

/// Moves arrive as a SAN array, or as one PGN / space-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum MovesInput {
    List(Vec<String>),
    Text(String),
}

impl MovesInput {
    fn into_sans(self) -> Vec<String> {
        match self {
            MovesInput::List(list) if list.len() == 1 && looks_like_pgn(&list[0]) => {
                extract_moves(&list[0])
            }
            MovesInput::List(list) => list
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            MovesInput::Text(text) => extract_moves(&text),
        }
    }
}

#[derive(Deserialize)]
struct GameArgs {
    moves: Option<MovesInput>,
    depth: Option<i64>,
}

#[derive(Deserialize)]
struct PvArgs {
    fen: String,
    depth: Option<i64>,
    max_moves: Option<i64>,
}

#[derive(Deserialize)]
struct MoveArgs {
    fen: String,
    #[serde(rename = "move")]
    mv: String,
    depth: Option<i64>,
}

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
struct BoardArgs {
    fen: String,
    #[serde(default)]
    flip: bool,
    #[serde(default = "yes")]
    show_coordinates: bool,
    #[serde(default, alias = "highlight_pieces")]
    highlight_squares: Vec<String>,
}

#[derive(Deserialize)]
struct LegalMovesArgs {
    fen: String,
    #[serde(default = "yes")]
    categorize: bool,
}

#[derive(Deserialize)]
struct ApplyArgs {
    starting_fen: String,
    #[serde(default)]
    moves: Vec<String>,
    #[serde(default)]
    show_progression: bool,
}

#[derive(Deserialize)]
struct OpeningArgs {
    fen: String,
    #[serde(default)]
    moves_played: Vec<String>,
}

#[derive(Deserialize)]
struct ExploreArgs {
    fen: String,
    #[serde(default)]
    candidate_moves: Vec<String>,
    depth: Option<i64>,
}

#[derive(Deserialize)]
struct VariationsArgs {
    fen: String,
    #[serde(default)]
    variations: Vec<Vec<String>>,
    depth: Option<i64>,
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Routes tool calls to a shared [`ChessAnalyzer`].
pub struct ToolRouter<E> {
    analyzer: Arc<ChessAnalyzer<E>>,
}

impl<E> Clone for ToolRouter<E> {
    fn clone(&self) -> Self {
        Self {
            analyzer: Arc::clone(&self.analyzer),
        }
    }
}

impl<E: Engine> ToolRouter<E> {
    pub fn new(analyzer: Arc<ChessAnalyzer<E>>) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &Arc<ChessAnalyzer<E>> {
        &self.analyzer
    }

    pub fn tools(&self) -> Vec<ToolSpec> {
        tools::catalogue()
    }

    pub async fn call(&self, name: &str, args: Value) -> ToolOutput {
        let started = Instant::now();
        let result = match name {
            "analyze_position" => self.analyze_position(args).await,
            "analyze_game" => self.analyze_game(args).await,
            "explain_position" => self.explain_position(args).await,
            "get_principal_variation" => self.principal_variation(args).await,
            "suggest_move" => self.suggest_move(args).await,
            "find_tactical_motifs" => self.find_tactical_motifs(args).await,
            "evaluate_move_quality" => self.evaluate_move_quality(args).await,
            "analyze_endgame" => self.analyze_endgame(args).await,
            "visualize_board" => self.visualize_board(args),
            "list_legal_moves" => self.list_legal_moves(args),
            "apply_moves" => self.apply_moves(args).await,
            "opening_analysis" => self.opening_analysis(args).await,
            "explore_moves" => self.explore_moves(args).await,
            "analyze_variations" => self.analyze_variations(args).await,
            _ => {
                warn!(tool = name, "Unknown tool");
                return ToolOutput::error(format!("❌ Unknown tool: {name}"));
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(text) => {
                info!(tool = name, elapsed_ms, "Tool call completed");
                ToolOutput::ok(text)
            }
            Err(e) => {
                warn!(tool = name, elapsed_ms, error = %e, "Tool call failed");
                ToolOutput::error(e.render())
            }
        }
    }

    async fn analyze_position(&self, args: Value) -> Result<String, ToolError> {
        let args: FenArgs = parse_args(args)?;
        let depth = tools::ANALYZE_POSITION_DEPTH.resolve(args.depth);
        let pos = parse_fen(&args.fen)?;

        let analysis = self.analyzer.analyze_position(&args.fen, depth).await?;
        Ok(format::position_analysis(
            args.fen.trim(),
            &analysis,
            &explain(&analysis),
            game_phase(&pos),
            &piece_development(&pos),
        ))
    }

    async fn analyze_game(&self, args: Value) -> Result<String, ToolError> {
        let args: GameArgs = parse_args(args)?;
        let depth = tools::ANALYZE_GAME_DEPTH.resolve(args.depth);
        let moves = args.moves.map(MovesInput::into_sans).unwrap_or_default();
        if moves.is_empty() {
            return Err(ToolError::InvalidArguments("Moves list is required".into()));
        }

        let game = self.analyzer.analyze_game(&moves, depth).await?;
        Ok(format::game_analysis(&game))
    }

    async fn explain_position(&self, args: Value) -> Result<String, ToolError> {
        let args: FenArgs = parse_args(args)?;
        let text = self
            .analyzer
            .explain_position(&args.fen, tools::EXPLAIN_DEPTH)
            .await?;
        Ok(format::explanation(args.fen.trim(), &text))
    }

    async fn principal_variation(&self, args: Value) -> Result<String, ToolError> {
        let args: PvArgs = parse_args(args)?;
        let depth = tools::PV_DEPTH.resolve(args.depth);
        let max_moves = tools::PV_MAX_MOVES.resolve(args.max_moves);

        let pv = self
            .analyzer
            .principal_variation(&args.fen, depth, max_moves as usize)
            .await?;
        Ok(format::principal_variation(&pv, max_moves))
    }

    async fn suggest_move(&self, args: Value) -> Result<String, ToolError> {
        let args: FenArgs = parse_args(args)?;
        let depth = tools::SUGGEST_DEPTH.resolve(args.depth);

        let analysis = self.analyzer.analyze_position(&args.fen, depth).await?;
        Ok(format::suggestion(&analysis, &explain(&analysis)))
    }

    async fn find_tactical_motifs(&self, args: Value) -> Result<String, ToolError> {
        let args: FenArgs = parse_args(args)?;
        let depth = tools::TACTICS_DEPTH.resolve(args.depth);

        let scan = self.analyzer.tactical_scan(&args.fen, depth).await?;
        Ok(format::tactics(&scan))
    }

    async fn evaluate_move_quality(&self, args: Value) -> Result<String, ToolError> {
        let args: MoveArgs = parse_args(args)?;
        let depth = tools::MOVE_QUALITY_DEPTH.resolve(args.depth);

        let eval = self
            .analyzer
            .evaluate_move(&args.fen, &args.mv, depth)
            .await?;
        Ok(format::move_quality(&eval, depth))
    }

    async fn analyze_endgame(&self, args: Value) -> Result<String, ToolError> {
        let args: FenArgs = parse_args(args)?;
        let depth = tools::ENDGAME_DEPTH.resolve(args.depth);
        let pos = parse_fen(&args.fen)?;

        let pieces = piece_count(&pos);
        if pieces > ENDGAME_MAX_PIECES {
            return Err(ToolError::Rejected(format!(
                "This appears to be a middlegame position ({pieces} pieces, more than {ENDGAME_MAX_PIECES}). Use 'analyze_position' for middlegame analysis."
            )));
        }

        let analysis = self.analyzer.analyze_position(&args.fen, depth).await?;
        let continuation = match self
            .analyzer
            .principal_variation(&args.fen, depth, ENDGAME_PV_MOVES)
            .await
        {
            Ok(pv) => Some(pv.moves.into_iter().take(ENDGAME_PV_SHOWN).collect()),
            Err(e) => {
                warn!(error = %e, "Endgame continuation unavailable");
                None
            }
        };

        Ok(format::endgame(&format::EndgameReport {
            fen: args.fen.trim(),
            piece_count: pieces,
            material: endgame_material(&pos),
            analysis: &analysis,
            explanation: explain(&analysis),
            continuation,
            has_pawns: has_role(&pos, Role::Pawn),
            has_heavy_pieces: has_role(&pos, Role::Rook) || has_role(&pos, Role::Queen),
        }))
    }

    fn visualize_board(&self, args: Value) -> Result<String, ToolError> {
        let args: BoardArgs = parse_args(args)?;
        let pos = parse_fen(&args.fen)?;
        let style = BoardStyle::new(args.flip, args.show_coordinates)
            .with_highlights(args.highlight_squares.as_slice())?;

        let info = position_info(&args.fen)?;
        Ok(format::board(&render_board(&pos, &style), &info))
    }

    fn list_legal_moves(&self, args: Value) -> Result<String, ToolError> {
        let args: LegalMovesArgs = parse_args(args)?;
        let pos = parse_fen(&args.fen)?;
        let info = position_info(&args.fen)?;

        Ok(format::legal_moves(
            args.fen.trim(),
            SideName::from(pos.turn()),
            info.status,
            &legal_moves(&pos),
            args.categorize,
        ))
    }

    async fn apply_moves(&self, args: Value) -> Result<String, ToolError> {
        let args: ApplyArgs = parse_args(args)?;
        if args.moves.is_empty() {
            return Err(ToolError::InvalidArguments("Please provide moves to apply".into()));
        }
        if args.moves.len() > tools::APPLY_MOVES_MAX {
            return Err(ToolError::InvalidArguments(format!(
                "At most {} moves can be applied at once",
                tools::APPLY_MOVES_MAX
            )));
        }

        let start = parse_fen(&args.starting_fen)?;
        let played = play_san_line(&start, &args.moves)?;
        let final_fen = played
            .last()
            .map(|m| m.fen_after.clone())
            .unwrap_or_else(|| args.starting_fen.clone());
        let final_info = position_info(&final_fen)?;

        let quick = match self
            .analyzer
            .analyze_position(&final_fen, tools::APPLY_MOVES_DEPTH)
            .await
        {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!(error = %e, "Quick evaluation of final position failed");
                None
            }
        };

        Ok(format::applied_moves(&format::AppliedMoves {
            starting_fen: args.starting_fen.trim(),
            starting_turn: SideName::from(start.turn()),
            played: &played,
            final_info: &final_info,
            show_progression: args.show_progression,
            quick: quick.as_ref(),
        }))
    }

    async fn opening_analysis(&self, args: Value) -> Result<String, ToolError> {
        let args: OpeningArgs = parse_args(args)?;
        let pos = parse_fen(&args.fen)?;

        let analysis = self
            .analyzer
            .analyze_position(&args.fen, tools::OPENING_DEPTH)
            .await?;
        Ok(format::opening(&format::OpeningReport {
            analysis: &analysis,
            move_number: pos.fullmoves().get(),
            moves_played: &args.moves_played,
            development: &piece_development(&pos),
        }))
    }

    async fn explore_moves(&self, args: Value) -> Result<String, ToolError> {
        let args: ExploreArgs = parse_args(args)?;
        let depth = tools::EXPLORE_DEPTH.resolve(args.depth);
        if args.candidate_moves.is_empty() {
            return Err(ToolError::InvalidArguments(
                "Please provide candidate moves to explore".into(),
            ));
        }
        if args.candidate_moves.len() > tools::EXPLORE_MAX_CANDIDATES {
            return Err(ToolError::InvalidArguments(format!(
                "At most {} candidate moves can be explored at once",
                tools::EXPLORE_MAX_CANDIDATES
            )));
        }

        let exploration = self
            .analyzer
            .explore_moves(&args.fen, &args.candidate_moves, depth)
            .await?;
        Ok(format::exploration(&exploration))
    }

    async fn analyze_variations(&self, args: Value) -> Result<String, ToolError> {
        let args: VariationsArgs = parse_args(args)?;
        let depth = tools::VARIATIONS_DEPTH.resolve(args.depth);
        if args.variations.is_empty() {
            return Err(ToolError::InvalidArguments("Please provide variations to analyze".into()));
        }
        if args.variations.len() > tools::VARIATIONS_MAX {
            return Err(ToolError::InvalidArguments(format!(
                "At most {} variations can be analyzed at once",
                tools::VARIATIONS_MAX
            )));
        }

        let analysis = self
            .analyzer
            .analyze_variations(&args.fen, &args.variations, depth)
            .await?;
        Ok(format::variations(&analysis))
    }
}
