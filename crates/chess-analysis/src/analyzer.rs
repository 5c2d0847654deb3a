//! Engine-backed analysis shared by the MCP tools, the chat agent and the web UI.

use serde::Serialize;
use shakmaty::{Chess, Color, Move, Position};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use chess_core::moves::MoveTraits;
use chess_core::position::{
    legal_san_sample, move_to_san, move_to_uci, parse_move, play_san_line, uci_to_move,
    PlayedMove,
};
use chess_core::{parse_fen, to_fen, ChessError, GameStatus, SideName, STARTING_FEN};

use crate::analysis::{
    calculate_accuracy, calculate_cp_loss, checkmate_cp, classify_move, is_mate_blunder,
    Classification, Classifications, Evaluation,
};
use crate::engine::{Engine, SearchResult};
use crate::error::AnalysisError;

/// Lines requested for a position analysis
pub const POSITION_MULTIPV: u32 = 3;
/// Lines requested for a tactical scan
pub const TACTICAL_MULTIPV: u32 = 5;
/// Principal variation stops once the score passes this many centipawns
const PV_DECISIVE_CP: i32 = 2000;
/// SAN moves kept per top line
const LINE_PREVIEW: usize = 8;
const LEGAL_SAMPLE: usize = 15;
pub const VARIATION_MIN_MOVES: usize = 2;
pub const VARIATION_MAX_MOVES: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct TopMove {
    pub san: String,
    pub uci: String,
    pub evaluation: Evaluation,
    /// Continuation in SAN, starting with this move
    pub line: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionAnalysis {
    pub fen: String,
    pub depth: u32,
    pub side_to_move: SideName,
    pub status: GameStatus,
    pub evaluation: Evaluation,
    pub best_move: Option<String>,
    pub best_move_uci: Option<String>,
    pub top_moves: Vec<TopMove>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveReport {
    pub move_number: u32,
    pub ply: usize,
    pub color: SideName,
    pub san: String,
    pub uci: String,
    pub fen_after: String,
    /// Evaluation of the position after the move
    pub evaluation: Evaluation,
    /// Engine's preferred move in the position before, in SAN
    pub best_move: Option<String>,
    pub cp_loss: i32,
    pub classification: Classification,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SideSummary {
    pub moves: u32,
    pub accuracy: f64,
    pub average_cp_loss: f64,
    pub classifications: Classifications,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameAnalysis {
    pub start_fen: String,
    pub depth: u32,
    pub total_moves: usize,
    pub moves: Vec<MoveReport>,
    pub white: SideSummary,
    pub black: SideSummary,
    pub final_fen: String,
    pub final_status: GameStatus,
    pub final_evaluation: Evaluation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOutcome {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

#[derive(Debug, Clone, Serialize)]
pub struct PvStep {
    /// 1-based step within the line
    pub step: usize,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    /// Evaluation of `fen_before`
    pub evaluation: Evaluation,
    pub to_move: SideName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<LineOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalVariation {
    pub starting_fen: String,
    pub depth: u32,
    pub moves: Vec<String>,
    pub steps: Vec<PvStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveEvaluation {
    pub fen: String,
    pub san: String,
    pub uci: String,
    pub mover: SideName,
    pub best_move: Option<String>,
    pub best_move_uci: Option<String>,
    pub best_evaluation: Evaluation,
    pub played_evaluation: Evaluation,
    pub cp_loss: i32,
    pub classification: Classification,
    pub is_best: bool,
    pub traits: MoveTraits,
    pub alternatives: Vec<TopMove>,
    pub fen_after: String,
    pub status_after: GameStatus,
}

/// One candidate move graded against the engine's preferred line.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub san: String,
    pub uci: String,
    /// Evaluation after the move
    pub evaluation: Evaluation,
    pub cp_loss: i32,
    pub classification: Classification,
    pub is_best: bool,
    pub traits: MoveTraits,
    /// Engine's best answer to the move, in SAN
    pub reply: Option<String>,
    pub fen_after: String,
    pub status_after: GameStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveExploration {
    pub fen: String,
    pub depth: u32,
    pub side_to_move: SideName,
    pub evaluation: Evaluation,
    pub best_move: Option<String>,
    /// Legal candidates, best first
    pub candidates: Vec<CandidateReport>,
    pub illegal: Vec<String>,
}

impl MoveExploration {
    pub fn engine_choice_explored(&self) -> bool {
        self.candidates.iter().any(|c| c.is_best)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariationStep {
    pub san: String,
    pub evaluation: Evaluation,
    pub fen_after: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariationOutcome {
    Played {
        steps: Vec<VariationStep>,
        final_evaluation: Evaluation,
        final_fen: String,
        /// Engine's best move in the final position, in SAN
        continuation: Option<String>,
    },
    Rejected {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct VariationReport {
    /// 1-based position in the request
    pub index: usize,
    pub moves: Vec<String>,
    pub truncated: bool,
    pub outcome: VariationOutcome,
}

impl VariationReport {
    pub fn final_evaluation(&self) -> Option<Evaluation> {
        match &self.outcome {
            VariationOutcome::Played {
                final_evaluation, ..
            } => Some(*final_evaluation),
            VariationOutcome::Rejected { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariationAnalysis {
    pub fen: String,
    pub depth: u32,
    pub side_to_move: SideName,
    pub evaluation: Evaluation,
    pub best_move: Option<String>,
    pub variations: Vec<VariationReport>,
}

impl VariationAnalysis {
    /// Played variations ordered best first for the side to move.
    pub fn ranked(&self) -> Vec<&VariationReport> {
        let mover = Color::from(self.side_to_move);
        let mut played: Vec<(&VariationReport, i32)> = self
            .variations
            .iter()
            .filter_map(|v| v.final_evaluation().map(|e| (v, e.for_side(mover))))
            .collect();
        played.sort_by_key(|(_, score)| std::cmp::Reverse(*score));
        played.into_iter().map(|(v, _)| v).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Motif {
    MatingAttack,
    MajorShot,
    Combination,
    Improvement,
}

impl Motif {
    pub fn label(&self) -> &'static str {
        match self {
            Motif::MatingAttack => "Forced mate",
            Motif::MajorShot => "Major tactical shot",
            Motif::Combination => "Strong combination",
            Motif::Improvement => "Tactical improvement",
        }
    }

    fn from_gain(gain: i32) -> Option<Self> {
        match gain {
            g if g > 300 => Some(Motif::MajorShot),
            g if g > 200 => Some(Motif::Combination),
            g if g > 100 => Some(Motif::Improvement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TacticalCandidate {
    pub san: String,
    pub uci: String,
    pub evaluation: Evaluation,
    /// Mover-relative gain over the weakest listed line
    pub improvement: i32,
    pub traits: MoveTraits,
    pub motif: Option<Motif>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TacticalScan {
    pub fen: String,
    pub depth: u32,
    pub side_to_move: SideName,
    pub status: GameStatus,
    pub evaluation: Evaluation,
    pub candidates: Vec<TacticalCandidate>,
}

impl TacticalScan {
    pub fn opportunities(&self) -> impl Iterator<Item = &TacticalCandidate> {
        self.candidates.iter().filter(|c| c.motif.is_some())
    }
}

/// Evaluation of one position during game analysis
struct PositionEval {
    evaluation: Evaluation,
    /// White-view centipawns, mates mapped near ±10000
    cp: i32,
    best_uci: Option<String>,
    best_san: Option<String>,
}

/// Serialises engine access; one search runs at a time.
pub struct ChessAnalyzer<E> {
    engine: Mutex<E>,
}

impl<E: Engine> ChessAnalyzer<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    async fn search(
        &self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<SearchResult, AnalysisError> {
        let mut engine = self.engine.lock().await;
        debug!(fen, depth, multipv, "search");
        engine.search(fen, depth.max(1), multipv).await
    }

    /// Quit the engine process, waiting for it to exit.
    pub async fn shutdown(&self) {
        self.engine.lock().await.quit().await;
    }

    pub async fn analyze_position(
        &self,
        fen: &str,
        depth: u32,
    ) -> Result<PositionAnalysis, AnalysisError> {
        let pos = parse_fen(fen)?;
        self.analyze_parsed(&pos, depth, POSITION_MULTIPV).await
    }

    async fn analyze_parsed(
        &self,
        pos: &Chess,
        depth: u32,
        multipv: u32,
    ) -> Result<PositionAnalysis, AnalysisError> {
        let fen = to_fen(pos);
        let status = GameStatus::of(pos);
        let side_to_move = SideName::from(pos.turn());

        let finished = match status {
            GameStatus::Checkmate { .. } => Some(Evaluation::Mate(0)),
            GameStatus::Stalemate => Some(Evaluation::Cp(0)),
            _ => None,
        };
        if let Some(evaluation) = finished {
            return Ok(PositionAnalysis {
                fen,
                depth,
                side_to_move,
                status,
                evaluation,
                best_move: None,
                best_move_uci: None,
                top_moves: Vec::new(),
            });
        }

        let result = self.search(&fen, depth, multipv).await?;
        let evaluation = result
            .top_score()
            .map(|s| Evaluation::from_score(s, pos.turn()))
            .unwrap_or(Evaluation::Cp(0));

        let best_move_uci = result
            .best_uci()
            .filter(|uci| uci_to_move(pos, uci).is_some())
            .map(str::to_string);
        let best_move = best_move_uci
            .as_deref()
            .and_then(|uci| uci_to_move(pos, uci))
            .map(|mv| move_to_san(pos, &mv));

        Ok(PositionAnalysis {
            fen,
            depth,
            side_to_move,
            status,
            evaluation,
            best_move,
            best_move_uci,
            top_moves: top_moves(pos, &result),
        })
    }

    /// Analyse a SAN move list from the standard starting position.
    pub async fn analyze_game(
        &self,
        moves: &[String],
        depth: u32,
    ) -> Result<GameAnalysis, AnalysisError> {
        self.analyze_game_from(STARTING_FEN, moves, depth).await
    }

    /// Analyse a SAN move list from `start_fen`. The whole list is validated
    /// before the engine is consulted.
    pub async fn analyze_game_from(
        &self,
        start_fen: &str,
        moves: &[String],
        depth: u32,
    ) -> Result<GameAnalysis, AnalysisError> {
        let start = parse_fen(start_fen)?;
        let played = play_san_line(&start, moves)?;
        info!(moves = played.len(), depth, "Analyzing game");

        let first_move = start.fullmoves().get();
        let black_first = usize::from(start.turn() == Color::Black);

        let mut reports = Vec::with_capacity(played.len());
        let mut white = SideTally::default();
        let mut black = SideTally::default();
        let mut before = self.position_eval(&start, depth).await?;
        let mut final_pos = start.clone();

        for (idx, m) in played.iter().enumerate() {
            let after_pos = parse_fen(&m.fen_after)?;
            let after = self.position_eval(&after_pos, depth).await?;

            let is_white = m.mover == SideName::White;
            let is_checkmate = matches!(m.status_after, GameStatus::Checkmate { .. });
            let is_best = before.best_uci.as_deref() == Some(m.uci.as_str());

            let (cp_loss, classification) = if is_best {
                (0, Classification::Best)
            } else {
                let loss = calculate_cp_loss(before.cp, after.cp, is_white, is_checkmate);
                let mate_blunder = is_mate_blunder(before.cp, after.cp, is_white, is_checkmate);
                (loss, classify_move(loss, mate_blunder))
            };

            let tally = if is_white { &mut white } else { &mut black };
            tally.add(cp_loss, classification);

            reports.push(MoveReport {
                move_number: first_move + ((idx + black_first) / 2) as u32,
                ply: m.ply,
                color: m.mover,
                san: m.san.clone(),
                uci: m.uci.clone(),
                fen_after: m.fen_after.clone(),
                evaluation: after.evaluation,
                best_move: before.best_san.clone(),
                cp_loss,
                classification,
            });

            before = after;
            final_pos = after_pos;
        }

        Ok(GameAnalysis {
            start_fen: to_fen(&start),
            depth,
            total_moves: reports.len(),
            moves: reports,
            white: white.summary(),
            black: black.summary(),
            final_fen: to_fen(&final_pos),
            final_status: GameStatus::of(&final_pos),
            final_evaluation: before.evaluation,
        })
    }

    async fn position_eval(&self, pos: &Chess, depth: u32) -> Result<PositionEval, AnalysisError> {
        if pos.is_checkmate() {
            return Ok(PositionEval {
                evaluation: Evaluation::Mate(0),
                cp: checkmate_cp(pos.turn().other()),
                best_uci: None,
                best_san: None,
            });
        }
        let analysis = self.analyze_parsed(pos, depth, 1).await?;
        Ok(PositionEval {
            cp: analysis.evaluation.as_centipawns(),
            evaluation: analysis.evaluation,
            best_uci: analysis.best_move_uci,
            best_san: analysis.best_move,
        })
    }

    /// Short prose description of a position.
    pub async fn explain_position(&self, fen: &str, depth: u32) -> Result<String, AnalysisError> {
        let analysis = self.analyze_position(fen, depth).await?;
        Ok(explain(&analysis))
    }

    /// Follow the engine's best move repeatedly from `fen`.
    pub async fn principal_variation(
        &self,
        fen: &str,
        depth: u32,
        max_moves: usize,
    ) -> Result<PrincipalVariation, AnalysisError> {
        let mut pos = parse_fen(fen)?;
        let starting_fen = to_fen(&pos);
        let mut steps: Vec<PvStep> = Vec::new();

        for step in 1..=max_moves {
            if GameStatus::of(&pos).is_final() {
                break;
            }
            let fen_before = to_fen(&pos);
            let result = match self.search(&fen_before, depth, 1).await {
                Ok(result) => result,
                Err(e) if !steps.is_empty() => {
                    warn!(error = %e, step, "Principal variation cut short");
                    break;
                }
                Err(e) => return Err(e),
            };

            let Some(mv) = result.best_uci().and_then(|uci| uci_to_move(&pos, uci)) else {
                warn!(fen = %fen_before, "Engine returned no playable move");
                break;
            };
            let evaluation = result
                .top_score()
                .map(|s| Evaluation::from_score(s, pos.turn()))
                .unwrap_or(Evaluation::Cp(0));

            let san = move_to_san(&pos, &mv);
            let to_move = SideName::from(pos.turn());
            pos.play_unchecked(mv.clone());

            let outcome = match GameStatus::of(&pos) {
                GameStatus::Checkmate { .. } => Some(LineOutcome::Checkmate),
                GameStatus::Stalemate => Some(LineOutcome::Stalemate),
                GameStatus::InsufficientMaterial => Some(LineOutcome::InsufficientMaterial),
                _ => None,
            };

            steps.push(PvStep {
                step,
                san,
                uci: move_to_uci(&mv),
                fen_before,
                fen_after: to_fen(&pos),
                evaluation,
                to_move,
                result: outcome,
            });

            if outcome.is_some() {
                break;
            }
            match evaluation {
                Evaluation::Mate(_) => break,
                Evaluation::Cp(cp) if cp.abs() > PV_DECISIVE_CP => break,
                Evaluation::Cp(_) => {}
            }
        }

        Ok(PrincipalVariation {
            starting_fen,
            depth,
            moves: steps.iter().map(|s| s.san.clone()).collect(),
            steps,
        })
    }

    /// Grade a single move against the engine's preferred line.
    pub async fn evaluate_move(
        &self,
        fen: &str,
        move_text: &str,
        depth: u32,
    ) -> Result<MoveEvaluation, AnalysisError> {
        let pos = parse_fen(fen)?;
        let status = GameStatus::of(&pos);
        if status.is_final() {
            return Err(AnalysisError::GameOver(status.describe().unwrap_or_default()));
        }
        let mv = parse_move(&pos, move_text).ok_or_else(|| ChessError::IllegalMove {
            ply: 1,
            san: move_text.trim().to_string(),
            legal: legal_san_sample(&pos, LEGAL_SAMPLE),
        })?;

        let analysis = self.analyze_parsed(&pos, depth, POSITION_MULTIPV).await?;
        let graded = self.grade(&pos, mv, &analysis, depth, false).await?;

        Ok(MoveEvaluation {
            fen: analysis.fen,
            san: graded.san,
            uci: graded.uci,
            mover: SideName::from(pos.turn()),
            best_move: analysis.best_move,
            best_move_uci: analysis.best_move_uci,
            best_evaluation: analysis.evaluation,
            played_evaluation: graded.evaluation,
            cp_loss: graded.cp_loss,
            classification: graded.classification,
            is_best: graded.is_best,
            traits: graded.traits,
            alternatives: analysis.top_moves,
            fen_after: graded.fen_after,
            status_after: graded.status_after,
        })
    }

    /// Score `mv` against an existing analysis of `pos`.
    /// The resulting position is searched when the move is not among the listed
    /// lines, or always when `with_reply` asks for the engine's answer.
    async fn grade(
        &self,
        pos: &Chess,
        mv: Move,
        before: &PositionAnalysis,
        depth: u32,
        with_reply: bool,
    ) -> Result<CandidateReport, AnalysisError> {
        let mover = pos.turn();
        let uci = move_to_uci(&mv);
        let san = move_to_san(pos, &mv);
        let traits = MoveTraits::of(pos, &mv);

        let mut after = pos.clone();
        after.play_unchecked(mv);
        let status_after = GameStatus::of(&after);
        let fen_after = to_fen(&after);

        let listed = before.top_moves.iter().find(|t| t.uci == uci);
        let reply = if status_after.is_final() || (listed.is_some() && !with_reply) {
            None
        } else {
            Some(self.analyze_parsed(&after, depth, 1).await?)
        };

        let (evaluation, played_cp) = match (listed, status_after, &reply) {
            (_, GameStatus::Checkmate { .. }, _) => (Evaluation::Mate(0), checkmate_cp(mover)),
            (Some(top), _, _) => (top.evaluation, top.evaluation.as_centipawns()),
            (None, _, Some(reply)) => (reply.evaluation, reply.evaluation.as_centipawns()),
            (None, _, None) => (Evaluation::Cp(0), 0),
        };

        let best_cp = before.evaluation.as_centipawns();
        let is_white = mover == Color::White;
        let is_checkmate = matches!(status_after, GameStatus::Checkmate { .. });
        let is_best = before.best_move_uci.as_deref() == Some(uci.as_str());

        let (cp_loss, classification) = if is_best || is_checkmate {
            (0, Classification::Best)
        } else {
            let loss = calculate_cp_loss(best_cp, played_cp, is_white, is_checkmate);
            let mate_blunder = is_mate_blunder(best_cp, played_cp, is_white, is_checkmate);
            (loss, classify_move(loss, mate_blunder))
        };

        Ok(CandidateReport {
            san,
            uci,
            evaluation,
            cp_loss,
            classification,
            is_best,
            traits,
            reply: reply.and_then(|r| r.best_move),
            fen_after,
            status_after,
        })
    }

    /// Grade several candidate moves from one position and rank them.
    /// Illegal candidates are reported rather than failing the call.
    pub async fn explore_moves(
        &self,
        fen: &str,
        candidates: &[String],
        depth: u32,
    ) -> Result<MoveExploration, AnalysisError> {
        let pos = parse_fen(fen)?;
        let status = GameStatus::of(&pos);
        if status.is_final() {
            return Err(AnalysisError::GameOver(status.describe().unwrap_or_default()));
        }

        let analysis = self.analyze_parsed(&pos, depth, POSITION_MULTIPV).await?;
        let mut graded = Vec::new();
        let mut illegal = Vec::new();
        for text in candidates {
            match parse_move(&pos, text) {
                Some(mv) => graded.push(self.grade(&pos, mv, &analysis, depth, true).await?),
                None => illegal.push(text.trim().to_string()),
            }
        }
        // Stable: equal losses keep the order they were asked in.
        graded.sort_by_key(|c| c.cp_loss);

        info!(fen, explored = graded.len(), illegal = illegal.len(), "Candidate moves explored");
        Ok(MoveExploration {
            fen: analysis.fen,
            depth,
            side_to_move: analysis.side_to_move,
            evaluation: analysis.evaluation,
            best_move: analysis.best_move,
            candidates: graded,
            illegal,
        })
    }

    /// Play each SAN sequence out and evaluate the position after every move.
    /// Sequences shorter than two moves or containing an illegal move are
    /// rejected individually; longer ones are cut to `VARIATION_MAX_MOVES`.
    pub async fn analyze_variations(
        &self,
        fen: &str,
        variations: &[Vec<String>],
        depth: u32,
    ) -> Result<VariationAnalysis, AnalysisError> {
        let pos = parse_fen(fen)?;
        let start = self.analyze_parsed(&pos, depth, 1).await?;

        let mut reports = Vec::with_capacity(variations.len());
        for (i, requested) in variations.iter().enumerate() {
            let truncated = requested.len() > VARIATION_MAX_MOVES;
            let moves: Vec<String> = requested.iter().take(VARIATION_MAX_MOVES).cloned().collect();
            let outcome = if moves.len() < VARIATION_MIN_MOVES {
                VariationOutcome::Rejected {
                    reason: format!("Each variation needs at least {VARIATION_MIN_MOVES} moves"),
                }
            } else {
                match play_san_line(&pos, &moves) {
                    Ok(played) => self.play_out(&played, depth).await?,
                    Err(e) => VariationOutcome::Rejected {
                        reason: e.to_string(),
                    },
                }
            };
            reports.push(VariationReport {
                index: i + 1,
                moves,
                truncated,
                outcome,
            });
        }

        Ok(VariationAnalysis {
            fen: start.fen,
            depth,
            side_to_move: start.side_to_move,
            evaluation: start.evaluation,
            best_move: start.best_move,
            variations: reports,
        })
    }

    async fn play_out(
        &self,
        played: &[PlayedMove],
        depth: u32,
    ) -> Result<VariationOutcome, AnalysisError> {
        let mut steps = Vec::with_capacity(played.len());
        let mut continuation = None;
        for m in played {
            let analysis = self.analyze_position(&m.fen_after, depth).await?;
            steps.push(VariationStep {
                san: m.san.clone(),
                evaluation: analysis.evaluation,
                fen_after: m.fen_after.clone(),
            });
            continuation = analysis.best_move;
        }
        let Some(last) = steps.last() else {
            return Ok(VariationOutcome::Rejected {
                reason: "Empty variation".into(),
            });
        };
        Ok(VariationOutcome::Played {
            final_evaluation: last.evaluation,
            final_fen: last.fen_after.clone(),
            continuation,
            steps,
        })
    }

    /// Multi-line search that flags lines standing out from the rest.
    pub async fn tactical_scan(
        &self,
        fen: &str,
        depth: u32,
    ) -> Result<TacticalScan, AnalysisError> {
        let pos = parse_fen(fen)?;
        let analysis = self.analyze_parsed(&pos, depth, TACTICAL_MULTIPV).await?;
        let mover = pos.turn();

        let baseline = analysis
            .top_moves
            .iter()
            .map(|t| t.evaluation.for_side(mover))
            .min()
            .unwrap_or(0);

        let candidates = analysis
            .top_moves
            .iter()
            .filter_map(|top| {
                let mv = uci_to_move(&pos, &top.uci)?;
                let improvement = top.evaluation.for_side(mover) - baseline;
                let mates = top.evaluation.is_mate() && top.evaluation.favoured() == Some(mover);
                let motif = if mates {
                    Some(Motif::MatingAttack)
                } else {
                    Motif::from_gain(improvement)
                };
                Some(TacticalCandidate {
                    san: top.san.clone(),
                    uci: top.uci.clone(),
                    evaluation: top.evaluation,
                    improvement,
                    traits: MoveTraits::of(&pos, &mv),
                    motif,
                })
            })
            .collect();

        Ok(TacticalScan {
            fen: analysis.fen,
            depth,
            side_to_move: analysis.side_to_move,
            status: analysis.status,
            evaluation: analysis.evaluation,
            candidates,
        })
    }
}

#[derive(Default)]
struct SideTally {
    moves: u32,
    total_loss: i32,
    classifications: Classifications,
}

impl SideTally {
    fn add(&mut self, cp_loss: i32, class: Classification) {
        self.moves += 1;
        self.total_loss += cp_loss;
        self.classifications.record(class);
    }

    fn summary(self) -> SideSummary {
        let average_cp_loss = if self.moves == 0 {
            0.0
        } else {
            self.total_loss as f64 / self.moves as f64
        };
        SideSummary {
            moves: self.moves,
            accuracy: calculate_accuracy(self.total_loss, self.moves),
            average_cp_loss,
            classifications: self.classifications,
        }
    }
}

/// Engine lines as SAN, skipping any line whose first move is not legal here.
fn top_moves(pos: &Chess, result: &SearchResult) -> Vec<TopMove> {
    result
        .lines
        .iter()
        .filter_map(|line| {
            let first = line.pv.first()?;
            let mv = uci_to_move(pos, first)?;
            Some(TopMove {
                san: move_to_san(pos, &mv),
                uci: move_to_uci(&mv),
                evaluation: Evaluation::from_score(line.score, pos.turn()),
                line: line_to_san(pos, &line.pv, LINE_PREVIEW),
            })
        })
        .collect()
}

/// Convert a UCI line to SAN, stopping at the first move that does not apply.
pub fn line_to_san(pos: &Chess, pv: &[String], limit: usize) -> Vec<String> {
    let mut current = pos.clone();
    let mut sans = Vec::new();
    for uci in pv.iter().take(limit) {
        let Some(mv) = uci_to_move(&current, uci) else {
            break;
        };
        sans.push(move_to_san(&current, &mv));
        current.play_unchecked(mv);
    }
    sans
}

/// Fixed-template explanation of an analysed position.
pub fn explain(analysis: &PositionAnalysis) -> String {
    let mut parts = Vec::new();

    match (analysis.status, analysis.evaluation) {
        (GameStatus::Checkmate { winner }, _) => {
            parts.push(format!("Checkmate. {winner} has won."));
        }
        (GameStatus::Stalemate, _) => parts.push("Stalemate. The game is drawn.".to_string()),
        (_, Evaluation::Cp(cp)) if cp.abs() < 50 => {
            parts.push("The position is roughly equal.".to_string());
        }
        (_, Evaluation::Cp(cp)) => {
            let side = if cp > 0 { "White" } else { "Black" };
            let advantage = match cp.abs() {
                a if a < 100 => "slight",
                a if a < 300 => "significant",
                _ => "decisive",
            };
            parts.push(format!(
                "{side} has a {advantage} advantage ({:.1} pawns).",
                cp.abs() as f64 / 100.0
            ));
        }
        (_, Evaluation::Mate(n)) => {
            let side = if n > 0 { "White" } else { "Black" };
            parts.push(format!("{side} has mate in {} moves.", n.abs()));
        }
    }

    if let Some(best) = &analysis.best_move {
        parts.push(format!("The best move is {best}."));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::engine::{PvLine, Score};

    /// Answers from a FEN-keyed script, else the first legal move at 0.00.
    #[derive(Default)]
    struct ScriptedEngine {
        scripts: HashMap<String, Vec<(&'static str, Score)>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedEngine {
        fn script(mut self, fen: &str, lines: Vec<(&'static str, Score)>) -> Self {
            let key = to_fen(&parse_fen(fen).unwrap());
            self.scripts.insert(key, lines);
            self
        }
    }

    impl Engine for ScriptedEngine {
        async fn search(
            &mut self,
            fen: &str,
            depth: u32,
            multipv: u32,
        ) -> Result<SearchResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lines: Vec<PvLine> = match self.scripts.get(fen) {
                Some(script) => script
                    .iter()
                    .take(multipv as usize)
                    .enumerate()
                    .map(|(i, (uci, score))| PvLine {
                        multipv: i as u32 + 1,
                        depth,
                        score: *score,
                        pv: vec![uci.to_string()],
                    })
                    .collect(),
                None => {
                    let pos = parse_fen(fen)?;
                    pos.legal_moves()
                        .first()
                        .map(|mv| PvLine {
                            multipv: 1,
                            depth,
                            score: Score::Cp(0),
                            pv: vec![move_to_uci(mv)],
                        })
                        .into_iter()
                        .collect()
                }
            };
            let best_move = lines.first().map(|l| l.pv[0].clone());
            Ok(SearchResult { lines, best_move })
        }
    }

    fn fen_after(moves: &[&str]) -> String {
        let moves: Vec<String> = moves.iter().map(|s| s.to_string()).collect();
        play_san_line(&Chess::default(), &moves)
            .unwrap()
            .last()
            .unwrap()
            .fen_after
            .clone()
    }

    fn start_lines() -> Vec<(&'static str, Score)> {
        vec![
            ("e2e4", Score::Cp(30)),
            ("d2d4", Score::Cp(25)),
            ("g1f3", Score::Cp(20)),
            ("c2c4", Score::Cp(10)),
            ("b1c3", Score::Cp(0)),
        ]
    }

    #[tokio::test]
    async fn test_analyze_position_start() {
        let engine = ScriptedEngine::default().script(STARTING_FEN, start_lines());
        let analyzer = ChessAnalyzer::new(engine);

        let analysis = analyzer.analyze_position(STARTING_FEN, 15).await.unwrap();
        assert_eq!(analysis.best_move.as_deref(), Some("e4"));
        assert_eq!(analysis.best_move_uci.as_deref(), Some("e2e4"));
        assert_eq!(analysis.evaluation, Evaluation::Cp(30));
        assert_eq!(analysis.top_moves.len(), 3);
        assert_eq!(analysis.top_moves[2].san, "Nf3");
        assert_eq!(analysis.side_to_move, SideName::White);
    }

    #[tokio::test]
    async fn test_black_scores_are_flipped_to_white_view() {
        let fen = fen_after(&["e4"]);
        let engine = ScriptedEngine::default().script(&fen, vec![("c7c5", Score::Cp(40))]);
        let analyzer = ChessAnalyzer::new(engine);

        let analysis = analyzer.analyze_position(&fen, 10).await.unwrap();
        assert_eq!(analysis.evaluation, Evaluation::Cp(-40));
        assert_eq!(analysis.best_move.as_deref(), Some("c5"));
    }

    #[tokio::test]
    async fn test_checkmate_skips_engine() {
        let engine = ScriptedEngine::default();
        let calls = engine.calls.clone();
        let analyzer = ChessAnalyzer::new(engine);

        let fen = fen_after(&["f3", "e5", "g4", "Qh4"]);
        let analysis = analyzer.analyze_position(&fen, 15).await.unwrap();
        assert_eq!(analysis.evaluation, Evaluation::Mate(0));
        assert_eq!(
            analysis.status,
            GameStatus::Checkmate {
                winner: SideName::Black
            }
        );
        assert!(analysis.best_move.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(explain(&analysis), "Checkmate. Black has won.");
    }

    #[tokio::test]
    async fn test_invalid_fen_is_user_error() {
        let analyzer = ChessAnalyzer::new(ScriptedEngine::default());
        let err = analyzer.analyze_position("not a fen", 10).await.unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_explain_templates() {
        let mut analysis = PositionAnalysis {
            fen: STARTING_FEN.to_string(),
            depth: 15,
            side_to_move: SideName::White,
            status: GameStatus::Ongoing,
            evaluation: Evaluation::Cp(20),
            best_move: Some("e4".to_string()),
            best_move_uci: Some("e2e4".to_string()),
            top_moves: Vec::new(),
        };
        assert_eq!(
            explain(&analysis),
            "The position is roughly equal. The best move is e4."
        );

        analysis.evaluation = Evaluation::Cp(75);
        assert!(explain(&analysis).starts_with("White has a slight advantage (0.8 pawns)."));

        analysis.evaluation = Evaluation::Cp(-250);
        assert!(explain(&analysis).starts_with("Black has a significant advantage (2.5 pawns)."));

        analysis.evaluation = Evaluation::Cp(900);
        assert!(explain(&analysis).starts_with("White has a decisive advantage (9.0 pawns)."));

        analysis.evaluation = Evaluation::Mate(-3);
        analysis.best_move = None;
        assert_eq!(explain(&analysis), "Black has mate in 3 moves.");
    }

    #[tokio::test]
    async fn test_analyze_game_classifies_blunder() {
        let after_e4 = fen_after(&["e4"]);
        let after_f6 = fen_after(&["e4", "f6"]);
        let engine = ScriptedEngine::default()
            .script(STARTING_FEN, start_lines())
            .script(&after_e4, vec![("e7e5", Score::Cp(-20))])
            .script(&after_f6, vec![("d2d4", Score::Cp(280))]);
        let analyzer = ChessAnalyzer::new(engine);

        let moves = vec!["e4".to_string(), "f6".to_string()];
        let game = analyzer.analyze_game(&moves, 12).await.unwrap();

        assert_eq!(game.total_moves, 2);
        let first = &game.moves[0];
        assert_eq!(first.move_number, 1);
        assert_eq!(first.classification, Classification::Best);
        assert_eq!(first.cp_loss, 0);

        let second = &game.moves[1];
        assert_eq!(second.color, SideName::Black);
        assert_eq!(second.move_number, 1);
        assert_eq!(second.best_move.as_deref(), Some("e5"));
        assert_eq!(second.cp_loss, 260);
        assert_eq!(second.classification, Classification::Blunder);
        assert_eq!(second.evaluation, Evaluation::Cp(280));

        assert_eq!(game.white.classifications.best, 1);
        assert_eq!(game.black.classifications.blunder, 1);
        assert!((game.white.accuracy - 100.0).abs() < 0.01);
        assert!(game.black.accuracy < 60.0);
    }

    #[tokio::test]
    async fn test_analyze_game_rejects_illegal_move_before_searching() {
        let engine = ScriptedEngine::default();
        let calls = engine.calls.clone();
        let analyzer = ChessAnalyzer::new(engine);

        let moves: Vec<String> = ["e4", "e5", "Ke3"].iter().map(|s| s.to_string()).collect();
        let err = analyzer.analyze_game(&moves, 12).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Chess(ChessError::IllegalMove { ply: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_analyze_game_mating_move_has_no_loss() {
        let moves: Vec<String> = ["f3", "e5", "g4", "Qh4#"].iter().map(|s| s.to_string()).collect();
        let analyzer = ChessAnalyzer::new(ScriptedEngine::default());

        let game = analyzer.analyze_game(&moves, 8).await.unwrap();
        let mate = &game.moves[3];
        assert_eq!(mate.cp_loss, 0);
        assert_eq!(mate.evaluation, Evaluation::Mate(0));
        assert!(matches!(game.final_status, GameStatus::Checkmate { .. }));
    }

    #[tokio::test]
    async fn test_principal_variation_stops_at_max_moves() {
        let engine = ScriptedEngine::default().script(STARTING_FEN, start_lines());
        let analyzer = ChessAnalyzer::new(engine);

        let pv = analyzer.principal_variation(STARTING_FEN, 10, 3).await.unwrap();
        assert_eq!(pv.steps.len(), 3);
        assert_eq!(pv.moves[0], "e4");
        assert_eq!(pv.steps[0].to_move, SideName::White);
        assert_eq!(pv.steps[1].to_move, SideName::Black);
        assert_eq!(pv.steps[1].fen_before, pv.steps[0].fen_after);
    }

    #[tokio::test]
    async fn test_principal_variation_stops_on_checkmate() {
        let fen = fen_after(&["f3", "e5", "g4"]);
        let engine = ScriptedEngine::default().script(&fen, vec![("d8h4", Score::Mate(1))]);
        let analyzer = ChessAnalyzer::new(engine);

        let pv = analyzer.principal_variation(&fen, 10, 10).await.unwrap();
        assert_eq!(pv.steps.len(), 1);
        assert_eq!(pv.steps[0].san, "Qh4#");
        assert_eq!(pv.steps[0].result, Some(LineOutcome::Checkmate));
        assert_eq!(pv.steps[0].evaluation, Evaluation::Mate(-1));
    }

    #[tokio::test]
    async fn test_principal_variation_stops_on_decisive_score() {
        let engine =
            ScriptedEngine::default().script(STARTING_FEN, vec![("e2e4", Score::Cp(2500))]);
        let analyzer = ChessAnalyzer::new(engine);

        let pv = analyzer.principal_variation(STARTING_FEN, 10, 10).await.unwrap();
        assert_eq!(pv.steps.len(), 1);
        assert_eq!(pv.steps[0].result, None);
    }

    #[tokio::test]
    async fn test_evaluate_move_from_listed_line() {
        let engine = ScriptedEngine::default().script(STARTING_FEN, start_lines());
        let analyzer = ChessAnalyzer::new(engine);

        let eval = analyzer.evaluate_move(STARTING_FEN, "d4", 16).await.unwrap();
        assert_eq!(eval.uci, "d2d4");
        assert_eq!(eval.cp_loss, 5);
        assert_eq!(eval.classification, Classification::Excellent);
        assert!(!eval.is_best);
        assert_eq!(eval.best_move.as_deref(), Some("e4"));

        let best = analyzer.evaluate_move(STARTING_FEN, "e2e4", 16).await.unwrap();
        assert!(best.is_best);
        assert_eq!(best.classification, Classification::Best);
    }

    #[tokio::test]
    async fn test_evaluate_move_searches_unlisted_move() {
        let engine = ScriptedEngine::default().script(STARTING_FEN, start_lines());
        let calls = engine.calls.clone();
        let analyzer = ChessAnalyzer::new(engine);

        let eval = analyzer.evaluate_move(STARTING_FEN, "a3", 16).await.unwrap();
        assert_eq!(eval.played_evaluation, Evaluation::Cp(0));
        assert_eq!(eval.cp_loss, 30);
        assert_eq!(eval.classification, Classification::Good);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_evaluate_move_illegal() {
        let analyzer = ChessAnalyzer::new(ScriptedEngine::default());
        let err = analyzer
            .evaluate_move(STARTING_FEN, "Ke2", 16)
            .await
            .unwrap_err();
        match err {
            AnalysisError::Chess(ChessError::IllegalMove { san, legal, .. }) => {
                assert_eq!(san, "Ke2");
                assert_eq!(legal.len(), 15);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tactical_scan_bands() {
        let engine = ScriptedEngine::default().script(
            STARTING_FEN,
            vec![
                ("e2e4", Score::Cp(450)),
                ("d2d4", Score::Cp(250)),
                ("g1f3", Score::Cp(150)),
                ("c2c4", Score::Cp(100)),
                ("b1c3", Score::Cp(0)),
            ],
        );
        let analyzer = ChessAnalyzer::new(engine);

        let scan = analyzer.tactical_scan(STARTING_FEN, 15).await.unwrap();
        assert_eq!(scan.candidates.len(), 5);
        let motifs: Vec<Option<Motif>> = scan.candidates.iter().map(|c| c.motif).collect();
        assert_eq!(
            motifs,
            vec![
                Some(Motif::MajorShot),
                Some(Motif::Combination),
                Some(Motif::Improvement),
                None,
                None
            ]
        );
        assert_eq!(scan.opportunities().count(), 3);
        assert_eq!(scan.candidates[0].improvement, 450);
    }

    #[tokio::test]
    async fn test_tactical_scan_flags_mate() {
        let fen = fen_after(&["f3", "e5", "g4"]);
        let engine = ScriptedEngine::default().script(
            &fen,
            vec![("d8h4", Score::Mate(1)), ("g8f6", Score::Cp(150))],
        );
        let analyzer = ChessAnalyzer::new(engine);

        let scan = analyzer.tactical_scan(&fen, 15).await.unwrap();
        assert_eq!(scan.candidates[0].motif, Some(Motif::MatingAttack));
        assert!(scan.candidates[0].traits.mate);
        assert_eq!(scan.candidates[1].motif, None);
    }

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn test_explore_moves_ranks_candidates() {
        let engine = ScriptedEngine::default().script(STARTING_FEN, start_lines());
        let calls = engine.calls.clone();
        let analyzer = ChessAnalyzer::new(engine);

        let exploration = analyzer
            .explore_moves(STARTING_FEN, &sans(&["a3", "Qh5", "d4", "e4"]), 12)
            .await
            .unwrap();

        let order: Vec<&str> = exploration.candidates.iter().map(|c| c.san.as_str()).collect();
        assert_eq!(order, vec!["e4", "d4", "a3"]);
        assert_eq!(exploration.illegal, vec!["Qh5"]);
        assert!(exploration.engine_choice_explored());

        let a3 = &exploration.candidates[2];
        assert_eq!(a3.cp_loss, 30);
        assert_eq!(a3.classification, Classification::Good);
        assert!(a3.reply.is_some(), "every legal candidate gets an engine reply");
        assert_eq!(exploration.candidates[1].cp_loss, 5);

        // One search of the start, one per legal candidate.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_explore_moves_mate_needs_no_reply() {
        let fen = fen_after(&["f3", "e5", "g4"]);
        let engine = ScriptedEngine::default().script(
            &fen,
            vec![("d8h4", Score::Mate(1)), ("g8f6", Score::Cp(150))],
        );
        let analyzer = ChessAnalyzer::new(engine);

        let exploration = analyzer
            .explore_moves(&fen, &sans(&["Nf6", "Qh4#"]), 12)
            .await
            .unwrap();
        let mate = &exploration.candidates[0];
        assert_eq!(mate.san, "Qh4#");
        assert_eq!(mate.evaluation, Evaluation::Mate(0));
        assert_eq!(mate.reply, None);
        assert!(matches!(mate.status_after, GameStatus::Checkmate { .. }));
    }

    #[tokio::test]
    async fn test_analyze_variations() {
        let after_e5 = fen_after(&["e4", "e5"]);
        let engine = ScriptedEngine::default()
            .script(STARTING_FEN, start_lines())
            .script(&after_e5, vec![("g1f3", Score::Cp(40))]);
        let analyzer = ChessAnalyzer::new(engine);

        let variations = vec![
            sans(&["e4", "e5"]),
            sans(&["d4"]),
            sans(&["Nf3", "Ke7"]),
            sans(&["e4", "e5", "Nf3", "Nc6", "Bb5"]),
        ];
        let result = analyzer
            .analyze_variations(STARTING_FEN, &variations, 15)
            .await
            .unwrap();

        assert_eq!(result.evaluation, Evaluation::Cp(30));
        assert_eq!(result.variations.len(), 4);

        let first = &result.variations[0];
        match &first.outcome {
            VariationOutcome::Played {
                steps,
                final_evaluation,
                final_fen,
                continuation,
            } => {
                assert_eq!(steps.len(), 2);
                assert_eq!(*final_evaluation, Evaluation::Cp(40));
                assert_eq!(final_fen, &after_e5);
                assert_eq!(continuation.as_deref(), Some("Nf3"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        match &result.variations[1].outcome {
            VariationOutcome::Rejected { reason } => assert!(reason.contains("at least 2")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match &result.variations[2].outcome {
            VariationOutcome::Rejected { reason } => {
                assert!(reason.contains("'Ke7' at ply 2"), "got: {reason}")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let long = &result.variations[3];
        assert!(long.truncated);
        assert_eq!(long.moves.len(), VARIATION_MAX_MOVES);

        let ranked: Vec<usize> = result.ranked().iter().map(|v| v.index).collect();
        assert_eq!(ranked, vec![1, 4]);
    }
}
