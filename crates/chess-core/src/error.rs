//! Error types for position handling

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove {
        /// 1-based index into the submitted move list
        ply: usize,
        san: String,
        /// A sample of legal SAN moves in the position where the move failed
        legal: Vec<String>,
    },

    #[error("Invalid square '{0}'")]
    InvalidSquare(String),
}

impl ChessError {
    pub fn invalid_fen(fen: &str, reason: impl ToString) -> Self {
        ChessError::InvalidFen {
            fen: fen.to_string(),
            reason: reason.to_string(),
        }
    }
}
