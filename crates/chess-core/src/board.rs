//! Text rendering of a board for terminals and chat transcripts.

use shakmaty::{Chess, Color, File, Position, Rank, Role, Square};

use crate::error::ChessError;

const FILES: &str = "    a  b  c  d  e  f  g  h";
const FILES_FLIPPED: &str = "    h  g  f  e  d  c  b  a";
const TOP: &str = "  ┌──┬──┬──┬──┬──┬──┬──┬──┐";
const DIVIDER: &str = "  ├──┼──┼──┼──┼──┼──┼──┼──┤";
const BOTTOM: &str = "  └──┴──┴──┴──┴──┴──┴──┴──┘";

#[derive(Debug, Clone, Default)]
pub struct BoardStyle {
    /// Render from Black's side
    pub flip: bool,
    pub show_coordinates: bool,
    pub highlights: Vec<Square>,
}

impl BoardStyle {
    pub fn new(flip: bool, show_coordinates: bool) -> Self {
        Self {
            flip,
            show_coordinates,
            highlights: Vec::new(),
        }
    }

    /// Add highlighted squares given by name, e.g. `["e4", "d5"]`.
    pub fn with_highlights<S: AsRef<str>>(mut self, squares: &[S]) -> Result<Self, ChessError> {
        for name in squares {
            let name = name.as_ref().trim();
            let sq: Square = name
                .parse()
                .map_err(|_| ChessError::InvalidSquare(name.to_string()))?;
            self.highlights.push(sq);
        }
        Ok(self)
    }
}

/// Filled glyphs for White read better on dark terminals.
fn glyph(role: Role, color: Color) -> char {
    match (role, color) {
        (Role::Pawn, Color::White) => '♟',
        (Role::Rook, Color::White) => '♜',
        (Role::Knight, Color::White) => '♞',
        (Role::Bishop, Color::White) => '♝',
        (Role::Queen, Color::White) => '♛',
        (Role::King, Color::White) => '♚',
        (Role::Pawn, Color::Black) => '♙',
        (Role::Rook, Color::Black) => '♖',
        (Role::Knight, Color::Black) => '♘',
        (Role::Bishop, Color::Black) => '♗',
        (Role::Queen, Color::Black) => '♕',
        (Role::King, Color::Black) => '♔',
    }
}

pub fn render_board(pos: &Chess, style: &BoardStyle) -> String {
    let board = pos.board();
    let mut lines = Vec::with_capacity(19);
    let files_header = if style.flip { FILES_FLIPPED } else { FILES };

    if style.show_coordinates {
        lines.push(files_header.to_string());
    }
    lines.push(TOP.to_string());

    let ranks: Vec<u32> = if style.flip {
        (0..8).collect()
    } else {
        (0..8).rev().collect()
    };
    let files: Vec<u32> = if style.flip {
        (0..8).rev().collect()
    } else {
        (0..8).collect()
    };

    for (row, rank) in ranks.iter().enumerate() {
        let rank_label = rank + 1;
        let mut line = if style.show_coordinates {
            format!("{rank_label} │")
        } else {
            "│".to_string()
        };

        for file in &files {
            let sq = Square::from_coords(File::new(*file), Rank::new(*rank));
            let highlighted = style.highlights.contains(&sq);
            match board.piece_at(sq) {
                None if highlighted => line.push_str("██"),
                None => line.push_str("  "),
                Some(piece) => {
                    let g = glyph(piece.role, piece.color);
                    if highlighted {
                        line.push('[');
                        line.push(g);
                    } else {
                        line.push(g);
                        line.push(' ');
                    }
                }
            }
            line.push('│');
        }

        if style.show_coordinates {
            line.push_str(&format!(" {rank_label}"));
        }
        lines.push(line);

        if row < 7 {
            lines.push(DIVIDER.to_string());
        }
    }

    lines.push(BOTTOM.to_string());
    if style.show_coordinates {
        lines.push(files_header.to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_start_position() {
        let text = render_board(&Chess::default(), &BoardStyle::new(false, true));
        let lines: Vec<&str> = text.lines().collect();
        // header + top + 8 ranks + 7 dividers + bottom + footer
        assert_eq!(lines.len(), 19);
        assert_eq!(lines[0], FILES);
        assert!(lines[2].starts_with("8 │♖ │♘ │"));
        assert!(lines[16].starts_with("1 │♜ │♞ │"));
    }

    #[test]
    fn test_render_flipped_without_coordinates() {
        let text = render_board(&Chess::default(), &BoardStyle::new(true, false));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 17);
        // Rank 1 on top, h-file first: white rook on h1
        assert!(lines[1].starts_with("│♜ │♞ │♝ │♚ │♛ │"));
    }

    #[test]
    fn test_highlights() {
        let style = BoardStyle::new(false, true)
            .with_highlights(&["e4", "e2"])
            .unwrap();
        let text = render_board(&Chess::default(), &style);
        assert!(text.contains("██"));
        assert!(text.contains("[♟"));
        assert!(BoardStyle::new(false, true).with_highlights(&["z9"]).is_err());
    }
}
