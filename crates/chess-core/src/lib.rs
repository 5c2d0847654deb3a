//! Position utilities shared by the analyzer, the tool router and the web layer.
//!
//! Everything here is pure: FEN in, facts out. Engine access lives in
//! `chess-analysis`.

pub mod board;
pub mod error;
pub mod material;
pub mod moves;
pub mod pgn;
pub mod position;

pub use shakmaty;

pub use error::ChessError;
pub use position::{parse_fen, to_fen, GameStatus, SideName, STARTING_FEN};
