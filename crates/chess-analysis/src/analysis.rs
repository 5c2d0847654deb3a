/// Move classification and score arithmetic: pure functions only
/// (No engine or position dependencies)
use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::engine::Score;

/// Classification thresholds (centipawn loss)
const THRESHOLD_BEST: i32 = 0;
const THRESHOLD_EXCELLENT: i32 = 10;
const THRESHOLD_GOOD: i32 = 50;
const THRESHOLD_INACCURACY: i32 = 100;
const THRESHOLD_MISTAKE: i32 = 200;

/// Centipawn stand-in for "mate in 0"; mate in N maps to `MATE_SCORE - N`
pub const MATE_SCORE: i32 = 10_000;

/// Mate detection threshold
const MATE_THRESHOLD: i32 = 9000;

/// Maximum CP loss to cap at
pub const MAX_CP_LOSS: i32 = 500;

/// A score from White's point of view.
/// Serialised as `{"type":"cp","value":35}` / `{"type":"mate","value":-3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Evaluation {
    Cp(i32),
    /// Mate in N (positive = White mates)
    Mate(i32),
}

impl Evaluation {
    /// Convert an engine score relative to `turn` into White's view.
    pub fn from_score(score: Score, turn: Color) -> Self {
        let sign = match turn {
            Color::White => 1,
            Color::Black => -1,
        };
        match score {
            Score::Cp(cp) => Evaluation::Cp(cp * sign),
            Score::Mate(n) => Evaluation::Mate(n * sign),
        }
    }

    /// Centipawns from White's view, mates mapped near `±MATE_SCORE`.
    /// `Mate(0)` carries no side, so callers with a finished position use
    /// [`checkmate_cp`] instead.
    pub fn as_centipawns(&self) -> i32 {
        match *self {
            Evaluation::Cp(cp) => cp,
            Evaluation::Mate(n) if n > 0 => MATE_SCORE - n,
            Evaluation::Mate(n) if n < 0 => -MATE_SCORE - n,
            Evaluation::Mate(_) => 0,
        }
    }

    /// Centipawns from `color`'s point of view.
    pub fn for_side(&self, color: Color) -> i32 {
        match color {
            Color::White => self.as_centipawns(),
            Color::Black => -self.as_centipawns(),
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }

    /// Side that benefits, or `None` for a dead-level score.
    pub fn favoured(&self) -> Option<Color> {
        match *self {
            Evaluation::Cp(0) | Evaluation::Mate(0) => None,
            Evaluation::Cp(v) | Evaluation::Mate(v) if v > 0 => Some(Color::White),
            _ => Some(Color::Black),
        }
    }

    /// Compact display: `+0.35`, `-1.20`, `M3`, `-M2`.
    pub fn display(&self) -> String {
        match *self {
            Evaluation::Cp(cp) => format!("{:+.2}", cp as f64 / 100.0),
            Evaluation::Mate(n) if n < 0 => format!("-M{}", -n),
            Evaluation::Mate(n) => format!("M{n}"),
        }
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Centipawns for a checkmated position, from White's view.
pub fn checkmate_cp(winner: Color) -> i32 {
    match winner {
        Color::White => MATE_SCORE,
        Color::Black => -MATE_SCORE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Best,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Best => "best",
            Classification::Excellent => "excellent",
            Classification::Good => "good",
            Classification::Inaccuracy => "inaccuracy",
            Classification::Mistake => "mistake",
            Classification::Blunder => "blunder",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Classification::Best => "!!",
            Classification::Excellent => "!",
            Classification::Good => "",
            Classification::Inaccuracy => "?!",
            Classification::Mistake => "?",
            Classification::Blunder => "??",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifications {
    pub best: u32,
    pub excellent: u32,
    pub good: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
}

impl Classifications {
    pub fn record(&mut self, class: Classification) {
        let slot = match class {
            Classification::Best => &mut self.best,
            Classification::Excellent => &mut self.excellent,
            Classification::Good => &mut self.good,
            Classification::Inaccuracy => &mut self.inaccuracy,
            Classification::Mistake => &mut self.mistake,
            Classification::Blunder => &mut self.blunder,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.best + self.excellent + self.good + self.inaccuracy + self.mistake + self.blunder
    }
}

fn is_mate_position(eval: i32) -> bool {
    eval.abs() > MATE_THRESHOLD
}

pub fn is_mate_blunder(
    best_eval: i32,
    after_eval: i32,
    is_white: bool,
    is_checkmate: bool,
) -> bool {
    if is_checkmate {
        return false;
    }

    let best_is_mate = is_mate_position(best_eval);
    let after_is_mate = is_mate_position(after_eval);

    if best_is_mate && !after_is_mate {
        // Only a blunder if the lost mate was ours
        return if is_white { best_eval > 0 } else { best_eval < 0 };
    }

    if !best_is_mate && after_is_mate {
        let allowed_bad_mate = if is_white {
            after_eval < 0
        } else {
            after_eval > 0
        };
        return allowed_bad_mate;
    }

    false
}

pub fn calculate_cp_loss(
    best_eval: i32,
    after_eval: i32,
    is_white: bool,
    is_checkmate: bool,
) -> i32 {
    if is_checkmate {
        return 0;
    }

    let best_is_mate = is_mate_position(best_eval);
    let after_is_mate = is_mate_position(after_eval);

    if best_is_mate && after_is_mate {
        if (best_eval > 0) == (after_eval > 0) {
            return 0;
        } else {
            return MAX_CP_LOSS;
        }
    }

    let cp_loss = if is_white {
        best_eval - after_eval
    } else {
        after_eval - best_eval
    };

    cp_loss.clamp(0, MAX_CP_LOSS)
}

pub fn classify_move(cp_loss: i32, is_mate_blunder: bool) -> Classification {
    if is_mate_blunder {
        return Classification::Blunder;
    }
    if cp_loss <= THRESHOLD_BEST {
        Classification::Best
    } else if cp_loss < THRESHOLD_EXCELLENT {
        Classification::Excellent
    } else if cp_loss < THRESHOLD_GOOD {
        Classification::Good
    } else if cp_loss < THRESHOLD_INACCURACY {
        Classification::Inaccuracy
    } else if cp_loss < THRESHOLD_MISTAKE {
        Classification::Mistake
    } else {
        Classification::Blunder
    }
}

pub fn calculate_accuracy(total_cp_loss: i32, move_count: u32) -> f64 {
    if move_count == 0 {
        return 100.0;
    }
    let acpl = total_cp_loss as f64 / move_count as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    accuracy.clamp(0.0, 100.0)
}
