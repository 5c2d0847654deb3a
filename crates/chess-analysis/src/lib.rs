//! Stockfish bridge and the analysis operations built on it.

pub mod analysis;
pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod stockfish;

pub use analysis::{Classification, Evaluation};
pub use analyzer::ChessAnalyzer;
pub use config::EngineConfig;
pub use engine::{Engine, PvLine, Score, SearchResult};
pub use error::AnalysisError;
pub use stockfish::StockfishEngine;
