//! Analyzer error types

use chess_core::ChessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error(transparent)]
    Chess(#[from] ChessError),

    #[error("No legal moves: {0}")]
    GameOver(String),

    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl AnalysisError {
    /// True when the caller supplied bad input, as opposed to an engine failure.
    pub fn is_user_error(&self) -> bool {
        matches!(self, AnalysisError::Chess(_) | AnalysisError::GameOver(_))
    }
}
