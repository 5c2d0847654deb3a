//! The engine seam: one async search primitive over a FEN.

use std::future::Future;

use crate::error::AnalysisError;

/// Engine score, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    /// Mate in N moves (positive = side to move mates)
    Mate(i32),
}

/// One line of a multi-PV search.
#[derive(Debug, Clone, PartialEq)]
pub struct PvLine {
    /// 1-based line index
    pub multipv: u32,
    pub depth: u32,
    pub score: Score,
    /// Moves in UCI notation
    pub pv: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// Lines ordered by `multipv`
    pub lines: Vec<PvLine>,
    /// `None` when the engine answered `bestmove (none)`
    pub best_move: Option<String>,
}

impl SearchResult {
    /// Engine's best move, falling back to the head of the first line.
    pub fn best_uci(&self) -> Option<&str> {
        self.best_move
            .as_deref()
            .or_else(|| self.lines.first().and_then(|l| l.pv.first()).map(String::as_str))
    }

    pub fn top_score(&self) -> Option<Score> {
        self.lines.first().map(|l| l.score)
    }
}

/// A UCI-speaking search backend.
pub trait Engine: Send + 'static {
    fn search(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> impl Future<Output = Result<SearchResult, AnalysisError>> + Send;

    /// Orderly shutdown. Engines without a process have nothing to do.
    fn quit(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
