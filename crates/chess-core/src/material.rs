//! Material counting, game phase and development heuristics.

use serde::Serialize;
use shakmaty::{Board, Chess, Color, Position, Role, Square};

use crate::position::SideName;

/// Maximum piece count (kings included) for the endgame tools.
pub const ENDGAME_MAX_PIECES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GamePhase::Opening => "Opening",
            GamePhase::Middlegame => "Middlegame",
            GamePhase::Endgame => "Endgame",
        };
        f.write_str(name)
    }
}

/// All pieces on the board, kings included.
pub fn piece_count(pos: &Chess) -> usize {
    pos.board().occupied().count()
}

pub fn game_phase(pos: &Chess) -> GamePhase {
    match piece_count(pos) {
        n if n <= 10 => GamePhase::Endgame,
        n if n <= 20 => GamePhase::Middlegame,
        _ => GamePhase::Opening,
    }
}

fn non_king_roles(board: &Board, color: Color) -> Vec<Role> {
    let mut roles = Vec::new();
    for role in [Role::Queen, Role::Rook, Role::Bishop, Role::Knight, Role::Pawn] {
        let n = (board.by_role(role) & board.by_color(color)).count();
        roles.extend(std::iter::repeat(role).take(n));
    }
    roles
}

fn lone_piece_label(role: Role) -> Option<&'static str> {
    match role {
        Role::Pawn => Some("P"),
        Role::Queen => Some("Q"),
        Role::Rook => Some("R"),
        _ => None,
    }
}

/// Classify the basic endgames; anything else is a "complex" endgame.
pub fn endgame_material(pos: &Chess) -> String {
    let board = pos.board();
    let white = non_king_roles(board, Color::White);
    let black = non_king_roles(board, Color::Black);

    match (white.as_slice(), black.as_slice()) {
        ([role], []) => {
            if let Some(label) = lone_piece_label(*role) {
                return format!("K+{label} vs K");
            }
        }
        ([], [role]) => {
            if let Some(label) = lone_piece_label(*role) {
                return format!("K vs K+{label}");
            }
        }
        _ => {}
    }

    format!("Complex endgame ({} pieces)", white.len() + black.len())
}

pub fn has_role(pos: &Chess, role: Role) -> bool {
    !pos.board().by_role(role).is_empty()
}

#[derive(Debug, Clone, Serialize)]
pub struct Development {
    pub side: SideName,
    /// Minor pieces off their starting squares
    pub developed: usize,
    pub suggestions: Vec<&'static str>,
}

pub fn piece_development(pos: &Chess) -> Vec<Development> {
    let board = pos.board();
    [Color::White, Color::Black]
        .into_iter()
        .map(|color| {
            let (knight_homes, bishop_homes) = match color {
                Color::White => (
                    [(Square::B1, "Nc3 or Nd2"), (Square::G1, "Nf3 or Ne2")],
                    [Square::C1, Square::F1],
                ),
                Color::Black => (
                    [(Square::B8, "Nc6 or Nd7"), (Square::G8, "Nf6 or Ne7")],
                    [Square::C8, Square::F8],
                ),
            };

            let mut developed = 0;
            let mut suggestions = Vec::new();

            for sq in board.by_role(Role::Knight) & board.by_color(color) {
                match knight_homes.iter().find(|(home, _)| *home == sq) {
                    Some((_, hint)) => suggestions.push(*hint),
                    None => developed += 1,
                }
            }
            for sq in board.by_role(Role::Bishop) & board.by_color(color) {
                if !bishop_homes.contains(&sq) {
                    developed += 1;
                }
            }

            suggestions.truncate(2);
            Development {
                side: SideName::from(color),
                developed,
                suggestions,
            }
        })
        .collect()
}
