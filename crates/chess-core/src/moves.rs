//! Legal move listing with tactical categories.

use serde::Serialize;
use shakmaty::{Chess, Move, Position};

use crate::position::{move_to_san, move_to_uci};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCategory {
    Capture,
    Check,
    Castling,
    EnPassant,
    Promotion,
    Quiet,
}

impl MoveCategory {
    pub const ALL: [MoveCategory; 6] = [
        MoveCategory::Capture,
        MoveCategory::Check,
        MoveCategory::Castling,
        MoveCategory::EnPassant,
        MoveCategory::Promotion,
        MoveCategory::Quiet,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MoveCategory::Capture => "Captures",
            MoveCategory::Check => "Checks",
            MoveCategory::Castling => "Castling",
            MoveCategory::EnPassant => "En Passant",
            MoveCategory::Promotion => "Promotions",
            MoveCategory::Quiet => "Quiet Moves",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LegalMove {
    pub san: String,
    pub uci: String,
    pub category: MoveCategory,
}

/// Properties of a single move, independent of category priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveTraits {
    pub capture: bool,
    pub check: bool,
    pub promotion: bool,
    pub mate: bool,
}

impl MoveTraits {
    pub fn of(pos: &Chess, mv: &Move) -> Self {
        let mut after = pos.clone();
        after.play_unchecked(mv.clone());
        Self {
            capture: mv.is_capture(),
            check: after.is_check(),
            promotion: mv.is_promotion(),
            mate: after.is_checkmate(),
        }
    }

    /// Space separated tags such as `capture check`.
    pub fn tags(&self) -> String {
        let mut tags = Vec::new();
        if self.capture {
            tags.push("capture");
        }
        if self.check {
            tags.push("check");
        }
        if self.promotion {
            tags.push("promotion");
        }
        tags.join(" ")
    }

    pub fn is_forcing(&self) -> bool {
        self.capture || self.check
    }
}

/// Pick one category per move; captures win over checks, checks over the rest.
pub fn categorize(pos: &Chess, mv: &Move) -> MoveCategory {
    let traits = MoveTraits::of(pos, mv);
    if traits.capture {
        MoveCategory::Capture
    } else if traits.check {
        MoveCategory::Check
    } else if mv.is_castle() {
        MoveCategory::Castling
    } else if mv.is_en_passant() {
        MoveCategory::EnPassant
    } else if traits.promotion {
        MoveCategory::Promotion
    } else {
        MoveCategory::Quiet
    }
}

pub fn legal_moves(pos: &Chess) -> Vec<LegalMove> {
    pos.legal_moves()
        .iter()
        .map(|mv| LegalMove {
            san: move_to_san(pos, mv),
            uci: move_to_uci(mv),
            category: categorize(pos, mv),
        })
        .collect()
}

/// Sorted SAN lists per category, skipping empty categories.
pub fn group_by_category(moves: &[LegalMove]) -> Vec<(MoveCategory, Vec<String>)> {
    MoveCategory::ALL
        .iter()
        .filter_map(|cat| {
            let mut sans: Vec<String> = moves
                .iter()
                .filter(|m| m.category == *cat)
                .map(|m| m.san.clone())
                .collect();
            if sans.is_empty() {
                return None;
            }
            sans.sort();
            Some((*cat, sans))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::parse_fen;

    #[test]
    fn test_starting_position_all_quiet() {
        let moves = legal_moves(&Chess::default());
        assert_eq!(moves.len(), 20);
        assert!(moves.iter().all(|m| m.category == MoveCategory::Quiet));
    }

    #[test]
    fn test_categories() {
        // White can castle, capture on d5, promote on b8, and give check with Qh5+
        let pos = parse_fen("4k3/1P6/8/3p4/4P3/8/8/R3K2Q w Q - 0 1").unwrap();
        let moves = legal_moves(&pos);
        let find = |san: &str| moves.iter().find(|m| m.san == san).map(|m| m.category);

        assert_eq!(find("exd5"), Some(MoveCategory::Capture));
        assert_eq!(find("O-O-O"), Some(MoveCategory::Castling));
        assert_eq!(find("Qh5+"), Some(MoveCategory::Check));
        assert_eq!(find("b8=N"), Some(MoveCategory::Promotion));
        // Promotion to queen gives check along the back rank
        assert_eq!(find("b8=Q+"), Some(MoveCategory::Check));
    }

    #[test]
    fn test_en_passant_is_capture() {
        let pos = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let moves = legal_moves(&pos);
        let ep = moves.iter().find(|m| m.uci == "e5d6").unwrap();
        assert_eq!(ep.category, MoveCategory::Capture);
    }

    #[test]
    fn test_group_by_category_skips_empty() {
        let groups = group_by_category(&legal_moves(&Chess::default()));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, MoveCategory::Quiet);
        assert_eq!(groups[0].1.len(), 20);
    }
}
