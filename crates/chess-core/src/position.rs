//! FEN parsing, position status and move notation conversion.

use serde::{Deserialize, Serialize};
use shakmaty::{
    fen::Fen, san::San, san::SanPlus, uci::UciMove, CastlingMode, CastlingSide, Chess, Color,
    EnPassantMode, Move, Position,
};

use crate::error::ChessError;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// How many legal moves to list when reporting an illegal move.
const LEGAL_SAMPLE: usize = 15;

/// Parse and validate a FEN string into a playable position.
pub fn parse_fen(fen: &str) -> Result<Chess, ChessError> {
    let trimmed = fen.trim();
    if trimmed.is_empty() {
        return Err(ChessError::invalid_fen(fen, "empty FEN"));
    }
    let parsed: Fen = trimmed
        .parse()
        .map_err(|e| ChessError::invalid_fen(fen, e))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| ChessError::invalid_fen(fen, e))
}

pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Terminal or in-play state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Ongoing,
    Check,
    /// The side to move is mated; `winner` is the other side.
    Checkmate { winner: SideName },
    Stalemate,
    InsufficientMaterial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideName {
    White,
    Black,
}

impl From<Color> for SideName {
    fn from(color: Color) -> Self {
        match color {
            Color::White => SideName::White,
            Color::Black => SideName::Black,
        }
    }
}

impl From<SideName> for Color {
    fn from(side: SideName) -> Self {
        match side {
            SideName::White => Color::White,
            SideName::Black => Color::Black,
        }
    }
}

impl SideName {
    pub fn opponent(self) -> Self {
        match self {
            SideName::White => SideName::Black,
            SideName::Black => SideName::White,
        }
    }
}

impl std::fmt::Display for SideName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideName::White => write!(f, "White"),
            SideName::Black => write!(f, "Black"),
        }
    }
}

impl GameStatus {
    pub fn of(pos: &Chess) -> Self {
        if pos.is_checkmate() {
            GameStatus::Checkmate {
                winner: SideName::from(pos.turn().other()),
            }
        } else if pos.is_stalemate() {
            GameStatus::Stalemate
        } else if pos.is_check() {
            GameStatus::Check
        } else if pos.is_insufficient_material() {
            GameStatus::InsufficientMaterial
        } else {
            GameStatus::Ongoing
        }
    }

    /// True when the side to move has no legal moves.
    pub fn is_final(&self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Stalemate)
    }

    pub fn describe(&self) -> Option<String> {
        match self {
            GameStatus::Ongoing => None,
            GameStatus::Check => Some("Check!".to_string()),
            GameStatus::Checkmate { winner } => Some(format!("Checkmate! {winner} wins")),
            GameStatus::Stalemate => Some("Stalemate!".to_string()),
            GameStatus::InsufficientMaterial => {
                Some("Insufficient material to mate".to_string())
            }
        }
    }
}

/// Summary of the FEN fields and game status of a position.
#[derive(Debug, Clone, Serialize)]
pub struct PositionInfo {
    pub fen: String,
    pub turn: SideName,
    pub castling_rights: String,
    pub en_passant: String,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub status: GameStatus,
}

pub fn position_info(fen: &str) -> Result<PositionInfo, ChessError> {
    let pos = parse_fen(fen)?;

    let mut castling = String::new();
    for (color, side, symbol) in [
        (Color::White, CastlingSide::KingSide, 'K'),
        (Color::White, CastlingSide::QueenSide, 'Q'),
        (Color::Black, CastlingSide::KingSide, 'k'),
        (Color::Black, CastlingSide::QueenSide, 'q'),
    ] {
        if pos.castles().has(color, side) {
            castling.push(symbol);
        }
    }
    if castling.is_empty() {
        castling.push_str("None");
    }

    // Report the en passant field as written, like most GUIs do
    let en_passant = fen
        .split_whitespace()
        .nth(3)
        .filter(|f| *f != "-")
        .unwrap_or("None")
        .to_string();

    Ok(PositionInfo {
        fen: fen.trim().to_string(),
        turn: SideName::from(pos.turn()),
        castling_rights: castling,
        en_passant,
        halfmove_clock: pos.halfmoves(),
        fullmove_number: pos.fullmoves().get(),
        status: GameStatus::of(&pos),
    })
}

/// SAN for a legal move, with `+`/`#` suffix.
pub fn move_to_san(pos: &Chess, mv: &Move) -> String {
    let san = San::from_move(pos, mv.clone());
    let mut after = pos.clone();
    after.play_unchecked(mv.clone());
    let suffix = if after.is_checkmate() {
        "#"
    } else if after.is_check() {
        "+"
    } else {
        ""
    };
    format!("{san}{suffix}")
}

pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Convert a UCI move to SAN. Returns `None` if the move is not legal here.
pub fn uci_to_san(pos: &Chess, uci: &str) -> Option<String> {
    let mv = uci_to_move(pos, uci)?;
    Some(move_to_san(pos, &mv))
}

/// Convert a SAN move to UCI. Returns `None` if the move is not legal here.
pub fn san_to_uci(pos: &Chess, san: &str) -> Option<String> {
    parse_move(pos, san).map(|mv| move_to_uci(&mv))
}

/// Resolve an engine move against a position.
pub fn uci_to_move(pos: &Chess, uci: &str) -> Option<Move> {
    let uci_move: UciMove = uci.trim().parse().ok()?;
    uci_move.to_move(pos).ok()
}

/// Resolve a user-supplied move (SAN, or UCI as a fallback) against a position.
pub fn parse_move(pos: &Chess, text: &str) -> Option<Move> {
    let token = normalize_token(text);
    if token.is_empty() {
        return None;
    }
    if let Ok(san_plus) = token.parse::<SanPlus>() {
        if let Ok(mv) = san_plus.san.to_move(pos) {
            return Some(mv);
        }
    }
    uci_to_move(pos, &token)
}

/// Strip annotation glyphs and accept zero-castling.
fn normalize_token(text: &str) -> String {
    let token = text.trim().trim_end_matches(['!', '?']);
    match token.trim_end_matches(['+', '#']) {
        "0-0" => token.replacen("0-0", "O-O", 1),
        "0-0-0" => token.replacen("0-0-0", "O-O-O", 1),
        _ => token.to_string(),
    }
}

/// A move applied during [`play_san_line`].
#[derive(Debug, Clone, Serialize)]
pub struct PlayedMove {
    /// 1-based ply index within the line
    pub ply: usize,
    pub san: String,
    pub uci: String,
    pub mover: SideName,
    pub fen_before: String,
    pub fen_after: String,
    pub status_after: GameStatus,
}

/// Legal moves in SAN, sorted, truncated to `limit`.
pub fn legal_san_sample(pos: &Chess, limit: usize) -> Vec<String> {
    let mut moves: Vec<String> = pos
        .legal_moves()
        .iter()
        .map(|m| move_to_san(pos, m))
        .collect();
    moves.sort();
    moves.truncate(limit);
    moves
}

/// Apply a list of moves in order, validating each one.
/// Returns every applied move and leaves `pos` untouched.
pub fn play_san_line(pos: &Chess, moves: &[String]) -> Result<Vec<PlayedMove>, ChessError> {
    let mut current = pos.clone();
    let mut played = Vec::with_capacity(moves.len());

    for (i, text) in moves.iter().enumerate() {
        let mv = parse_move(&current, text).ok_or_else(|| ChessError::IllegalMove {
            ply: i + 1,
            san: text.clone(),
            legal: legal_san_sample(&current, LEGAL_SAMPLE),
        })?;

        let fen_before = to_fen(&current);
        let san = move_to_san(&current, &mv);
        let uci = move_to_uci(&mv);
        let mover = SideName::from(current.turn());
        current.play_unchecked(mv);

        played.push(PlayedMove {
            ply: i + 1,
            san,
            uci,
            mover,
            fen_before,
            fen_after: to_fen(&current),
            status_after: GameStatus::of(&current),
        });
    }

    Ok(played)
}
