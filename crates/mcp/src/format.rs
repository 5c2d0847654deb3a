//! Markdown-flavoured text for tool results.

use chess_analysis::analysis::{Classification, Evaluation};
use chess_analysis::analyzer::{
    CandidateReport, GameAnalysis, MoveEvaluation, MoveExploration, PositionAnalysis,
    PrincipalVariation, TacticalScan, VariationAnalysis, VariationOutcome, VariationReport,
};
use chess_core::material::{Development, GamePhase};
use chess_core::moves::{group_by_category, LegalMove, MoveCategory};
use chess_core::position::{PlayedMove, PositionInfo};
use chess_core::shakmaty::Color;
use chess_core::{GameStatus, SideName};

/// Moves shown at the end of a game analysis
const GAME_TAIL: usize = 5;
/// Steps shown from a principal variation
const PV_HEAD: usize = 5;
/// Moves of `moves_played` echoed in the opening report
const OPENING_LINE_SHOWN: usize = 8;

/// Long form: `+0.3 pawns (White advantage)`, `Mate in 2 for Black`.
pub fn eval_text(eval: Evaluation) -> String {
    match eval {
        Evaluation::Cp(0) => "Equal position".to_string(),
        Evaluation::Cp(cp) if cp > 0 => {
            format!("{:+.1} pawns (White advantage)", cp as f64 / 100.0)
        }
        Evaluation::Cp(cp) => format!("{:+.1} pawns (Black advantage)", cp as f64 / 100.0),
        Evaluation::Mate(0) => "Checkmate".to_string(),
        Evaluation::Mate(n) => {
            let side = if n > 0 { "White" } else { "Black" };
            format!("Mate in {} for {side}", n.abs())
        }
    }
}

/// Short form: `+0.3`, `M2` when White mates, `-M2` when Black does.
pub fn eval_short(eval: Evaluation) -> String {
    match eval {
        Evaluation::Cp(cp) => format!("{:+.1}", cp as f64 / 100.0),
        Evaluation::Mate(0) => "#".to_string(),
        Evaluation::Mate(_) => eval.display(),
    }
}

fn best_move_text(best: &Option<String>) -> &str {
    best.as_deref().unwrap_or("No legal moves")
}

fn depth_footer(depth: u32) -> String {
    format!("\n\n*Analysis depth: {depth}*")
}

fn phase_guidance(phase: GamePhase) -> &'static [&'static str] {
    match phase {
        GamePhase::Opening => &[
            "Develop knights and bishops toward the center",
            "Castle early to secure the king",
            "Avoid moving the same piece twice without reason",
        ],
        GamePhase::Middlegame => &[
            "Look for tactical opportunities and weaknesses",
            "Improve the worst-placed piece",
            "Consider pawn breaks and space advantage",
        ],
        GamePhase::Endgame => &[
            "Activate the king",
            "Create and push passed pawns",
            "Trade pieces when ahead in material",
        ],
    }
}

pub fn position_analysis(
    fen: &str,
    analysis: &PositionAnalysis,
    explanation: &str,
    phase: GamePhase,
    development: &[Development],
) -> String {
    let mut out = format!(
        "🐟 **Chess Position Analysis**\n\n**Position:** {fen}\n\n**Evaluation:** {}\n**Best Move:** {}\n\n**Explanation:** {explanation}\n\n**Top {} Moves:**",
        eval_text(analysis.evaluation),
        best_move_text(&analysis.best_move),
        analysis.top_moves.len(),
    );
    for (i, top) in analysis.top_moves.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} ({})",
            i + 1,
            top.san,
            eval_short(top.evaluation)
        ));
        if top.line.len() > 1 {
            out.push_str(&format!(": {}", top.line.join(" ")));
        }
    }

    out.push_str(&format!("\n\n**Game Phase:** {phase}"));
    for tip in phase_guidance(phase) {
        out.push_str(&format!("\n• {tip}"));
    }
    if phase == GamePhase::Opening {
        for dev in development {
            out.push_str(&format!(
                "\n• {}: {} minor piece(s) developed",
                dev.side, dev.developed
            ));
            if !dev.suggestions.is_empty() {
                out.push_str(&format!(" (consider {})", dev.suggestions.join(", ")));
            }
        }
    }

    out.push_str(&depth_footer(analysis.depth));
    out
}

pub fn game_analysis(game: &GameAnalysis) -> String {
    let mut out = format!(
        "🐟 **Chess Game Analysis**\n\n**Total Moves:** {}\n**Analysis Depth:** {}\n",
        game.total_moves, game.depth
    );

    for (side, summary) in [("White", &game.white), ("Black", &game.black)] {
        let c = &summary.classifications;
        out.push_str(&format!(
            "\n**{side}:** accuracy {:.1}%, average loss {:.0} cp ({} best, {} excellent, {} good, {} inaccuracies, {} mistakes, {} blunders)",
            summary.accuracy,
            summary.average_cp_loss,
            c.best,
            c.excellent,
            c.good,
            c.inaccuracy,
            c.mistake,
            c.blunder,
        ));
    }

    out.push('\n');
    let start = game.moves.len().saturating_sub(GAME_TAIL);
    for report in &game.moves[start..] {
        let dots = match report.color {
            SideName::White => ".",
            SideName::Black => "...",
        };
        out.push_str(&format!(
            "\n**{}{dots}** {} → {} ({}",
            report.move_number,
            report.san,
            eval_short(report.evaluation),
            report.classification
        ));
        if report.cp_loss > 0 {
            if let Some(best) = &report.best_move {
                out.push_str(&format!(", best was {best}"));
            }
        }
        out.push(')');
    }

    if game.moves.len() > GAME_TAIL {
        out.push_str(&format!(
            "\n\n*Showing last {GAME_TAIL} moves of {} total*",
            game.moves.len()
        ));
    }
    if let Some(status) = game.final_status.describe() {
        out.push_str(&format!("\n\n**Final Position:** {status}"));
    }
    out
}

pub fn explanation(fen: &str, text: &str) -> String {
    format!("🐟 **Position Explanation**\n\n**FEN:** {fen}\n\n**Analysis:** {text}")
}

pub fn principal_variation(pv: &PrincipalVariation, max_moves: u32) -> String {
    let mut out = format!(
        "🐟 **Principal Variation Analysis**\n\n**Starting Position:** {}\n\n**Best Line ({} moves):** {}\n\n**Move-by-Move Analysis:**",
        pv.starting_fen,
        pv.steps.len(),
        pv.moves.join(" ")
    );
    for step in pv.steps.iter().take(PV_HEAD) {
        out.push_str(&format!(
            "\n{}. {} → {}",
            step.step,
            step.san,
            eval_short(step.evaluation)
        ));
    }
    if pv.steps.len() > PV_HEAD {
        out.push_str(&format!(
            "\n\n*Showing first {PV_HEAD} moves of {} analyzed*",
            pv.steps.len()
        ));
    }
    if let Some(outcome) = pv.steps.last().and_then(|s| s.result) {
        out.push_str(&format!("\n\n**Line ends in:** {outcome:?}"));
    }
    out.push_str(&format!(
        "\n\n*Analysis depth: {}, Max moves: {max_moves}*",
        pv.depth
    ));
    out
}

pub fn suggestion(analysis: &PositionAnalysis, explanation: &str) -> String {
    let mut out = format!(
        "🐟 **Move Suggestion**\n\n**Position:** {}\n\n**Recommended Move:** {}\n\n**Position Evaluation:** {}\n\n**Why this move:** {explanation}\n\n**Alternative Moves:**",
        analysis.fen,
        best_move_text(&analysis.best_move),
        eval_text(analysis.evaluation),
    );

    let mover = analysis.side_to_move.into();
    let best = analysis.evaluation.for_side(mover);
    for (i, top) in analysis.top_moves.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} ({}",
            i + 1,
            top.san,
            eval_short(top.evaluation)
        ));
        let diff = top.evaluation.for_side(mover) - best;
        if diff.abs() > 10 && !top.evaluation.is_mate() {
            out.push_str(&format!(", {:+.1} from best", diff as f64 / 100.0));
        }
        out.push(')');
    }
    if analysis.top_moves.is_empty() {
        out.push_str("\n• None");
    }

    out.push_str(&depth_footer(analysis.depth));
    out
}

pub fn tactics(scan: &TacticalScan) -> String {
    let mut out = format!(
        "🐟 **Tactical Analysis**\n\n**Position:** {}\n\n**Current Evaluation:** {}\n\n**Candidate Moves:**",
        scan.fen,
        eval_text(scan.evaluation)
    );
    for (i, c) in scan.candidates.iter().enumerate() {
        let tags = c.traits.tags();
        out.push_str(&format!(
            "\n{}. {} ({})",
            i + 1,
            c.san,
            eval_short(c.evaluation)
        ));
        if !tags.is_empty() {
            out.push_str(&format!(" [{tags}]"));
        }
    }

    out.push_str("\n\n**Tactical Opportunities:**");
    let mut found = false;
    for c in scan.opportunities() {
        found = true;
        if let Some(motif) = c.motif {
            out.push_str(&format!(
                "\n• **{}** - {} (gains {:+.1} pawns over the alternatives)",
                c.san,
                motif.label(),
                c.improvement as f64 / 100.0
            ));
        }
    }
    if !found {
        out.push_str("\n• No immediate tactical opportunities found");
        out.push_str("\n• Position appears to be positional in nature");
        out.push_str("\n• Focus on improving piece coordination and pawn structure");
    }

    out.push_str(&depth_footer(scan.depth));
    out
}

pub fn move_quality(eval: &MoveEvaluation, depth: u32) -> String {
    let label = eval.classification.as_str();
    let mut out = format!(
        "🐟 **Move Quality Evaluation**\n\n**Position:** {}\n**Move Played:** {}\n\n**Move Quality:** {}{}\n**Loss vs Best Move:** {:.2} pawns\n\n**Best Move Would Give:** {}\n**After Your Move:** {}\n**Best Move:** {}",
        eval.fen,
        eval.san,
        capitalize(label),
        eval.classification.symbol(),
        eval.cp_loss as f64 / 100.0,
        eval_text(eval.best_evaluation),
        eval_text(eval.played_evaluation),
        best_move_text(&eval.best_move),
    );

    let tags = eval.traits.tags();
    if !tags.is_empty() {
        out.push_str(&format!("\n**Move Type:** {tags}"));
    }
    if let Some(status) = eval.status_after.describe() {
        out.push_str(&format!("\n**Result:** {status}"));
    }

    let best = best_move_text(&eval.best_move);
    let verdict = match eval.classification {
        Classification::Blunder | Classification::Mistake => {
            format!("**Improvement:** Consider {best} instead")
        }
        Classification::Inaccuracy => format!("**Note:** {best} would be slightly better"),
        _ if eval.is_best => "**Analysis:** This is the engine's top choice!".to_string(),
        _ => "**Analysis:** Your move is close to the best option!".to_string(),
    };
    out.push_str(&format!("\n\n{verdict}"));

    if !eval.alternatives.is_empty() {
        out.push_str("\n\n**Engine Alternatives:**");
        for (i, alt) in eval.alternatives.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} ({})",
                i + 1,
                alt.san,
                eval_short(alt.evaluation)
            ));
        }
    }

    out.push_str(&depth_footer(depth));
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct EndgameReport<'a> {
    pub fen: &'a str,
    pub piece_count: usize,
    pub material: String,
    pub analysis: &'a PositionAnalysis,
    pub explanation: String,
    pub continuation: Option<Vec<String>>,
    pub has_pawns: bool,
    pub has_heavy_pieces: bool,
}

fn outcome_prediction(eval: Evaluation) -> String {
    match eval {
        Evaluation::Cp(cp) if cp.abs() < 50 => "Likely draw with accurate play".to_string(),
        Evaluation::Cp(cp) if cp > 200 => {
            "White should win with accurate technique".to_string()
        }
        Evaluation::Cp(cp) if cp < -200 => {
            "Black should win with accurate technique".to_string()
        }
        Evaluation::Cp(cp) => {
            let side = if cp > 0 { "White" } else { "Black" };
            format!("{side} has winning chances")
        }
        Evaluation::Mate(0) => "Game over".to_string(),
        Evaluation::Mate(n) => {
            let side = if n > 0 { "White" } else { "Black" };
            format!("{side} wins by force")
        }
    }
}

pub fn endgame(report: &EndgameReport<'_>) -> String {
    let continuation = match &report.continuation {
        Some(moves) if !moves.is_empty() => moves.join(" "),
        Some(_) => "None".to_string(),
        None => "Unable to calculate".to_string(),
    };
    let mut out = format!(
        "🐟 **Endgame Analysis**\n\n**Position:** {}\n**Piece Count:** {} pieces\n**Material:** {}\n\n**Evaluation:** {}\n**Outcome Prediction:** {}\n\n**Best Move:** {}\n**Explanation:** {}\n\n**Recommended Continuation:** {continuation}\n\n**Endgame Principles:**",
        report.fen,
        report.piece_count,
        report.material,
        eval_text(report.analysis.evaluation),
        outcome_prediction(report.analysis.evaluation),
        best_move_text(&report.analysis.best_move),
        report.explanation,
    );

    if report.piece_count <= 6 {
        out.push_str("\n• King activity is crucial in simple endgames");
        out.push_str("\n• Centralize your king when possible");
    }
    if report.has_pawns {
        out.push_str("\n• Push passed pawns when safe");
        out.push_str("\n• Use your king to support pawn advancement");
    }
    if report.has_heavy_pieces {
        out.push_str("\n• Keep heavy pieces active");
        out.push_str("\n• Cut off the enemy king when possible");
    }

    out.push_str(&format!("\n\n*Deep analysis depth: {}*", report.analysis.depth));
    out
}

pub fn board(board_text: &str, info: &PositionInfo) -> String {
    let mut lines = vec![
        "🐟 **Chess Board Visualization**".to_string(),
        String::new(),
        board_text.to_string(),
        String::new(),
        "**Position Info:**".to_string(),
        format!("• **FEN:** {}", info.fen),
        format!("• **Turn:** {}", info.turn),
        format!("• **Castling Rights:** {}", info.castling_rights),
        format!("• **En Passant:** {}", info.en_passant),
        format!("• **Halfmove Clock:** {}", info.halfmove_clock),
        format!("• **Fullmove Number:** {}", info.fullmove_number),
    ];
    if let Some(status) = info.status.describe() {
        lines.push(format!("• **Status:** {status}"));
    }
    lines.join("\n")
}

fn category_icon(cat: MoveCategory) -> &'static str {
    match cat {
        MoveCategory::Capture => "⚔️",
        MoveCategory::Check => "👑",
        MoveCategory::Castling => "🏰",
        MoveCategory::EnPassant => "🎯",
        MoveCategory::Promotion => "⭐",
        MoveCategory::Quiet => "🚶",
    }
}

pub fn legal_moves(
    fen: &str,
    turn: SideName,
    status: GameStatus,
    moves: &[LegalMove],
    categorize: bool,
) -> String {
    if moves.is_empty() {
        let result = match status {
            GameStatus::Checkmate { .. } => "Checkmate",
            _ => "Stalemate",
        };
        return format!("🚫 **No Legal Moves Available**\n\nPosition: {fen}\nResult: {result}");
    }

    if !categorize {
        let mut sans: Vec<&str> = moves.iter().map(|m| m.san.as_str()).collect();
        sans.sort();
        return format!(
            "📋 **Legal Moves ({turn} to move)**\n\n**Position:** {fen}\n\n**All Legal Moves ({} total):**\n{}",
            sans.len(),
            sans.join(", ")
        );
    }

    let mut out = format!(
        "📋 **Legal Moves Analysis ({turn} to move)**\n\n**Position:** {fen}\n**Total Legal Moves:** {}\n\n**📊 Moves by Category:**",
        moves.len()
    );
    let groups = group_by_category(moves);
    let count = |cat: MoveCategory| {
        groups
            .iter()
            .find(|(c, _)| *c == cat)
            .map(|(_, sans)| sans.len())
            .unwrap_or(0)
    };
    for (cat, sans) in &groups {
        out.push_str(&format!(
            "\n\n**{} {} ({}):**\n{}",
            category_icon(*cat),
            cat.label(),
            sans.len(),
            sans.join(", ")
        ));
    }

    let captures = count(MoveCategory::Capture);
    let checks = count(MoveCategory::Check);
    let quiet = count(MoveCategory::Quiet);
    out.push_str(&format!(
        "\n\n**📈 Move Statistics:**\n• Forcing moves (captures + checks): {}\n• Positional moves (quiet + castling): {}\n• Special moves (en passant + promotions): {}",
        captures + checks,
        quiet + count(MoveCategory::Castling),
        count(MoveCategory::EnPassant) + count(MoveCategory::Promotion),
    ));
    if captures > 5 {
        out.push_str("\n• ⚡ Many capture options available - tactical position");
    } else if checks > 2 {
        out.push_str("\n• 👑 Multiple check options - aggressive possibilities");
    } else if quiet > 20 {
        out.push_str("\n• 🌊 Many quiet moves - open, flexible position");
    }
    out
}

pub struct AppliedMoves<'a> {
    pub starting_fen: &'a str,
    pub starting_turn: SideName,
    pub played: &'a [PlayedMove],
    pub final_info: &'a PositionInfo,
    pub show_progression: bool,
    /// Quick engine look at the final position, when it succeeded
    pub quick: Option<&'a PositionAnalysis>,
}

pub fn applied_moves(report: &AppliedMoves<'_>) -> String {
    let mut out = format!(
        "⚙️ **Move Application Results**\n\n**Starting Position:**\n• FEN: `{}`\n• To Move: {}",
        report.starting_fen, report.starting_turn
    );

    if report.show_progression {
        out.push_str("\n\n**📍 Move-by-Move Progression:**");
        for m in report.played {
            let note = match m.status_after {
                GameStatus::Checkmate { .. } => " (CHECKMATE)",
                GameStatus::Stalemate => " (Stalemate)",
                GameStatus::Check => " (Check)",
                _ => "",
            };
            out.push_str(&format!(
                "\n\n**{}. {}**{note}\n• FEN: `{}`\n• To Move: {}",
                m.ply,
                m.san,
                m.fen_after,
                m.mover.opponent()
            ));
        }
    }

    let sans: Vec<&str> = report.played.iter().map(|m| m.san.as_str()).collect();
    let info = report.final_info;
    out.push_str(&format!(
        "\n\n**✅ FINAL POSITION:**\n• **Moves Applied:** {}\n• **Final FEN:** `{}`\n• **To Move:** {}\n• **Move Count:** {}",
        sans.join(" "),
        info.fen,
        info.turn,
        info.fullmove_number
    ));
    let status = match info.status {
        GameStatus::Checkmate { winner } => Some(format!("CHECKMATE - {winner} wins!")),
        GameStatus::Stalemate => Some("STALEMATE - Draw".to_string()),
        GameStatus::Check => Some(format!("{} is in CHECK", info.turn)),
        GameStatus::InsufficientMaterial => Some("Insufficient material - Draw".to_string()),
        GameStatus::Ongoing => None,
    };
    if let Some(status) = status {
        out.push_str(&format!("\n• **Game Status:** {status}"));
    }

    if let Some(quick) = report.quick {
        out.push_str(&format!(
            "\n• **Evaluation:** {}\n• **Best Move:** {}",
            eval_text(quick.evaluation),
            quick.best_move.as_deref().unwrap_or("None (game over)")
        ));
    }
    out
}

pub struct OpeningReport<'a> {
    pub analysis: &'a PositionAnalysis,
    pub move_number: u32,
    pub moves_played: &'a [String],
    pub development: &'a [Development],
}

fn opening_principles(move_number: u32) -> (&'static str, &'static [&'static str]) {
    match move_number {
        0..=5 => (
            "🏗️ Early Opening Principles (Moves 1-5)",
            &[
                "**Development**: Bring knights and bishops to active squares",
                "**Center Control**: Fight for e4, e5, d4 and d5",
                "**King Safety**: Castle early",
                "**Avoid**: Moving the same piece twice or bringing the queen out early",
            ],
        ),
        6..=10 => (
            "⚔️ Opening Development (Moves 6-10)",
            &[
                "**Complete development**: Get every minor piece into play",
                "**Castle if you haven't**: King safety comes first",
                "**Connect rooks**: Clear the back rank",
                "**Central pawn breaks**: Look for d4/d5 or e4/e5 advances",
            ],
        ),
        _ => (
            "🌟 Opening to Middlegame Transition",
            &[
                "**Piece improvement**: Find better squares for passive pieces",
                "**Pawn structure**: Weigh pawn breaks against the weaknesses they leave",
                "**Planning**: Pick a strategic goal and coordinate toward it",
                "**Tactics**: Stay alert for tactical opportunities",
            ],
        ),
    }
}

pub fn opening(report: &OpeningReport<'_>) -> String {
    let analysis = report.analysis;
    let mut out = format!(
        "📚 **Opening Analysis**\n\n**Position Info:**\n• Move {}, {} to move\n• Evaluation: {}",
        report.move_number,
        analysis.side_to_move,
        eval_text(analysis.evaluation)
    );
    if !report.moves_played.is_empty() {
        let shown: Vec<&str> = report
            .moves_played
            .iter()
            .take(OPENING_LINE_SHOWN)
            .map(String::as_str)
            .collect();
        let more = if report.moves_played.len() > OPENING_LINE_SHOWN {
            "..."
        } else {
            ""
        };
        out.push_str(&format!("\n• Opening line: {}{more}", shown.join(" ")));
    }

    out.push_str("\n\n**🎯 Recommended Moves:**");
    for (i, top) in analysis.top_moves.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. **{}** ({})",
            i + 1,
            top.san,
            eval_short(top.evaluation)
        ));
    }
    if analysis.top_moves.is_empty() {
        out.push_str("\n• None");
    }

    let (title, principles) = opening_principles(report.move_number);
    out.push_str(&format!("\n\n**{title}:**"));
    for line in principles {
        out.push_str(&format!("\n• {line}"));
    }

    out.push_str("\n\n**🎭 Piece Activity Assessment:**");
    for dev in report.development {
        out.push_str(&format!(
            "\n• **{}**: {}/4 minor pieces developed",
            dev.side, dev.developed
        ));
        if !dev.suggestions.is_empty() {
            out.push_str(&format!(" | Next: {}", dev.suggestions.join(", ")));
        }
    }

    out.push_str(&depth_footer(analysis.depth));
    out
}

fn candidate_notes(c: &CandidateReport) -> String {
    let mut notes: Vec<String> = Vec::new();
    let tags = c.traits.tags();
    if !tags.is_empty() {
        notes.push(tags);
    }
    match c.status_after {
        GameStatus::Checkmate { .. } => notes.push("CHECKMATE!".to_string()),
        GameStatus::Stalemate => notes.push("stalemate".to_string()),
        _ => {}
    }
    if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    }
}

pub fn exploration(e: &MoveExploration) -> String {
    let mut out = format!(
        "🧪 **Move Exploration Results**\n\n**Starting Position ({} to move):**\n• Evaluation: {}\n• Engine's top choice: **{}**\n\n**🔍 Candidate Moves (best first):**",
        e.side_to_move,
        eval_text(e.evaluation),
        best_move_text(&e.best_move),
    );

    for (i, c) in e.candidates.iter().enumerate() {
        out.push_str(&format!(
            "\n\n**{}. {}** {}{}{}",
            i + 1,
            c.san,
            capitalize(c.classification.as_str()),
            c.classification.symbol(),
            candidate_notes(c)
        ));
        out.push_str(&format!(
            "\n• Evaluation: {} → {} (loss {:.2} pawns)",
            eval_short(e.evaluation),
            eval_short(c.evaluation),
            c.cp_loss as f64 / 100.0
        ));
        if let Some(reply) = &c.reply {
            out.push_str(&format!("\n• Engine reply: **{reply}**"));
        }
        out.push_str(&format!("\n• Resulting FEN: `{}`", c.fen_after));
    }

    if !e.illegal.is_empty() {
        out.push_str(&format!("\n\n**❌ Illegal moves:** {}", e.illegal.join(", ")));
    }

    if let (false, Some(best)) = (e.engine_choice_explored(), &e.best_move) {
        out.push_str(&format!(
            "\n\n**💡 Engine's Top Choice:** {best} (not among your candidates)"
        ));
    }

    out.push_str(&format!(
        "\n\n*Analysis depth: {} • {} moves explored*",
        e.depth,
        e.candidates.len() + e.illegal.len()
    ));
    out
}

/// Verdict on how a variation shifts the balance for the side that starts it.
fn variation_verdict(net: i32, mover: SideName) -> String {
    match net {
        n if n.abs() < 30 => "🟢 Balanced".to_string(),
        n if n > 100 => format!("🔵 Good for {mover}"),
        n if n < -100 => format!("🟡 Good for {}", mover.opponent()),
        _ => "🟡 Slight shift".to_string(),
    }
}

fn variation_section(v: &VariationReport, start: Evaluation, mover: SideName) -> String {
    let line = v.moves.join(" ");
    let (steps, final_evaluation, final_fen, continuation) = match &v.outcome {
        VariationOutcome::Rejected { reason } => {
            return format!("\n\n**Variation {}: {line}**\n❌ {reason}", v.index);
        }
        VariationOutcome::Played {
            steps,
            final_evaluation,
            final_fen,
            continuation,
        } => (steps, *final_evaluation, final_fen, continuation),
    };

    let color = Color::from(mover);
    let net = final_evaluation.for_side(color) - start.for_side(color);
    let mut out = format!(
        "\n\n**Variation {}: {line}** {}\n• Final evaluation: {} → {} (net {:+.1} for {mover})",
        v.index,
        variation_verdict(net, mover),
        eval_short(start),
        eval_short(final_evaluation),
        net as f64 / 100.0
    );
    if v.truncated {
        out.push_str("\n• ⚠️ Only the first 4 moves were analyzed");
    }
    out.push_str("\n• **Move progression:**");
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!(
            "\n  {}. {}: {}",
            i + 1,
            step.san,
            eval_short(step.evaluation)
        ));
    }
    out.push_str(&format!(
        "\n• **After variation, best continuation:** {}",
        continuation.as_deref().unwrap_or("None")
    ));
    out.push_str(&format!("\n• **Final FEN:** `{final_fen}`"));
    out
}

pub fn variations(analysis: &VariationAnalysis) -> String {
    let mover = analysis.side_to_move;
    let mut out = format!(
        "🌟 **Variation Analysis**\n\n**Starting Position ({mover} to move):**\n• Evaluation: {}\n• Best single move: **{}**\n\n**🎯 Multi-Move Sequence Analysis:**",
        eval_text(analysis.evaluation),
        best_move_text(&analysis.best_move),
    );
    for v in &analysis.variations {
        out.push_str(&variation_section(v, analysis.evaluation, mover));
    }

    let ranked = analysis.ranked();
    if !ranked.is_empty() {
        out.push_str(&format!("\n\n**📊 Best to Worst (for {mover}):**"));
        for (i, v) in ranked.iter().enumerate() {
            let eval = v.final_evaluation().map(eval_short).unwrap_or_default();
            out.push_str(&format!("\n{}. **{}** ({eval})", i + 1, v.moves.join(" ")));
        }
    }
    if let [best, .., worst] = ranked.as_slice() {
        let color = Color::from(mover);
        let spread = match (best.final_evaluation(), worst.final_evaluation()) {
            (Some(b), Some(w)) => b.for_side(color) - w.for_side(color),
            _ => 0,
        };
        let insight = match spread {
            s if s > 200 => format!(
                "**Major difference** between variations ({:.1} pawns), the choice is critical",
                s as f64 / 100.0
            ),
            s if s > 100 => "**Significant difference** between variations".to_string(),
            _ => "**Similar outcomes**, several options are playable".to_string(),
        };
        out.push_str(&format!("\n\n**🧠 Insight:** {insight}"));
    }

    out.push_str(&format!(
        "\n\n*Analyzed {} variation(s) at depth {}*",
        analysis.variations.len(),
        analysis.depth
    ));
    out
}
