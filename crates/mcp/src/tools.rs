//! Tool catalogue: names, descriptions, JSON schemas and argument bounds.

use serde::Serialize;
use serde_json::{json, Value};

/// Default and accepted range for an integer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub default: u32,
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub const fn new(default: u32, min: u32, max: u32) -> Self {
        Self { default, min, max }
    }

    /// Missing values take the default; out-of-range values are clamped.
    pub fn resolve(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(v) => v.clamp(self.min as i64, self.max as i64) as u32,
            None => self.default,
        }
    }

    fn schema(&self, description: &str) -> Value {
        json!({
            "type": "integer",
            "description": description,
            "default": self.default,
            "minimum": self.min,
            "maximum": self.max,
        })
    }
}

pub const ANALYZE_POSITION_DEPTH: Bounds = Bounds::new(15, 1, 30);
pub const ANALYZE_GAME_DEPTH: Bounds = Bounds::new(12, 1, 20);
pub const EXPLAIN_DEPTH: u32 = 15;
pub const PV_DEPTH: Bounds = Bounds::new(20, 1, 25);
pub const PV_MAX_MOVES: Bounds = Bounds::new(10, 1, 20);
pub const SUGGEST_DEPTH: Bounds = Bounds::new(18, 5, 25);
pub const TACTICS_DEPTH: Bounds = Bounds::new(15, 8, 20);
pub const MOVE_QUALITY_DEPTH: Bounds = Bounds::new(16, 8, 22);
pub const ENDGAME_DEPTH: Bounds = Bounds::new(25, 15, 30);
/// Depth of the quick look at the final position after `apply_moves`
pub const APPLY_MOVES_DEPTH: u32 = 10;
pub const APPLY_MOVES_MAX: usize = 20;
pub const OPENING_DEPTH: u32 = 12;
pub const EXPLORE_DEPTH: Bounds = Bounds::new(12, 8, 18);
pub const EXPLORE_MAX_CANDIDATES: usize = 8;
pub const VARIATIONS_DEPTH: Bounds = Bounds::new(15, 10, 20);
pub const VARIATIONS_MAX: usize = 6;

/// One entry of `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn fen_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Every tool the router serves, in display order.
pub fn catalogue() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "analyze_position",
            description: "Analyze a chess position using Stockfish engine. Provides evaluation, best moves, and human-readable explanation.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position in FEN (Forsyth-Edwards Notation)"),
                    "depth": ANALYZE_POSITION_DEPTH.schema("Analysis depth (default: 15, higher is more accurate but slower)"),
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "analyze_game",
            description: "Analyze a complete chess game move by move. Provides evaluation, move classification and accuracy for each side.",
            input_schema: object(
                json!({
                    "moves": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of moves in standard algebraic notation (e.g., ['e4', 'e5', 'Nf3']). A single PGN string is also accepted.",
                    },
                    "depth": ANALYZE_GAME_DEPTH.schema("Analysis depth for each position (default: 12)"),
                }),
                &["moves"],
            ),
        },
        ToolSpec {
            name: "explain_position",
            description: "Get a human-readable explanation of a chess position's evaluation and key features.",
            input_schema: object(
                json!({ "fen": fen_prop("The chess position in FEN notation") }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "get_principal_variation",
            description: "Get the engine's principal variation (main line) from a chess position. Shows the best continuation for both sides.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position in FEN notation"),
                    "depth": PV_DEPTH.schema("Analysis depth for each position (default: 20)"),
                    "max_moves": PV_MAX_MOVES.schema("Maximum number of moves to calculate in the line (default: 10)"),
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "suggest_move",
            description: "Get the best move suggestion for a position with detailed explanation of why it's the best choice.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position in FEN notation"),
                    "depth": SUGGEST_DEPTH.schema("Analysis depth (default: 18, higher gives better suggestions)"),
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "find_tactical_motifs",
            description: "Analyze a position to find tactical opportunities: forced mates, major shots and combinations, with each candidate move tagged as capture, check or promotion.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position in FEN notation"),
                    "depth": TACTICS_DEPTH.schema("Analysis depth to search for tactics (default: 15)"),
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "evaluate_move_quality",
            description: "Evaluate whether a specific move in a position is good, bad, or a blunder compared to the best moves.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position BEFORE the move"),
                    "move": {
                        "type": "string",
                        "description": "The move to evaluate in standard algebraic notation (e.g., 'Nf3', 'exd5', 'O-O')",
                    },
                    "depth": MOVE_QUALITY_DEPTH.schema("Analysis depth (default: 16)"),
                }),
                &["fen", "move"],
            ),
        },
        ToolSpec {
            name: "analyze_endgame",
            description: "Specialized analysis for endgame positions (12 pieces or fewer): material balance, outcome prediction, recommended continuation and endgame principles.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The endgame position in FEN notation"),
                    "depth": ENDGAME_DEPTH.schema("Analysis depth (default: 25, endgames benefit from deeper analysis)"),
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "visualize_board",
            description: "Render a chess position as a text board with position details (turn, castling rights, en passant, clocks, status).",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position in FEN notation"),
                    "flip": {
                        "type": "boolean",
                        "description": "Show the board from Black's perspective (default: false)",
                        "default": false,
                    },
                    "show_coordinates": {
                        "type": "boolean",
                        "description": "Show file and rank labels (default: true)",
                        "default": true,
                    },
                    "highlight_squares": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Squares to highlight, e.g. ['e4', 'd5']",
                        "default": [],
                    },
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "list_legal_moves",
            description: "Generate a complete list of all legal moves in a chess position, optionally categorized by move type (captures, checks, castling, en passant, promotions, quiet moves).",
            input_schema: object(
                json!({
                    "fen": fen_prop("The chess position in FEN notation"),
                    "categorize": {
                        "type": "boolean",
                        "description": "Whether to categorize moves by type or just return a simple list (default: true)",
                        "default": true,
                    },
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "apply_moves",
            description: "Apply moves to a FEN position to get the correct resulting FEN. Validates each move's legality and returns the final position. Use this instead of calculating FEN positions by hand.",
            input_schema: object(
                json!({
                    "starting_fen": fen_prop("The starting chess position in FEN notation"),
                    "moves": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of moves to apply in standard algebraic notation (e.g., ['e4', 'e5', 'Nf3', 'Nc6'])",
                        "minItems": 1,
                        "maxItems": APPLY_MOVES_MAX,
                    },
                    "show_progression": {
                        "type": "boolean",
                        "description": "Whether to show the position after each move (default: false, only shows final position)",
                        "default": false,
                    },
                }),
                &["starting_fen", "moves"],
            ),
        },
        ToolSpec {
            name: "opening_analysis",
            description: "Analyze an early-game position: evaluation, recommended moves, opening principles for the current move number and piece development for both sides. Optionally takes the moves that led to the position.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The opening position to analyze (FEN notation)"),
                    "moves_played": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "The moves that led to this position (optional)",
                        "default": [],
                    },
                }),
                &["fen"],
            ),
        },
        ToolSpec {
            name: "explore_moves",
            description: "Test several candidate moves in a position and compare them. Each legal move is graded against the engine's best line, tagged as capture, check or promotion, shown with the engine's reply and ranked from best to worst.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The starting position (FEN notation)"),
                    "candidate_moves": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Moves to try in algebraic notation (e.g., ['Nf3', 'e4', 'O-O']). Include 3-5 candidates.",
                        "minItems": 1,
                        "maxItems": EXPLORE_MAX_CANDIDATES,
                    },
                    "depth": EXPLORE_DEPTH.schema("Analysis depth for each resulting position (default: 12)"),
                }),
                &["fen", "candidate_moves"],
            ),
        },
        ToolSpec {
            name: "analyze_variations",
            description: "Play out move sequences of 2-4 moves from a position and evaluate the position after every move. Compares where each variation ends, best first for the side to move.",
            input_schema: object(
                json!({
                    "fen": fen_prop("The starting position (FEN notation)"),
                    "variations": {
                        "type": "array",
                        "items": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "A sequence of 2-4 moves in algebraic notation",
                        },
                        "description": "Move sequences to analyze (e.g., [['e4', 'e5'], ['d4', 'd5', 'c4']])",
                        "minItems": 1,
                        "maxItems": VARIATIONS_MAX,
                    },
                    "depth": VARIATIONS_DEPTH.schema("Analysis depth for each position (default: 15)"),
                }),
                &["fen", "variations"],
            ),
        },
    ]
}

pub fn find(name: &str) -> Option<ToolSpec> {
    catalogue().into_iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_names_unique() {
        let tools = catalogue();
        assert_eq!(tools.len(), 14);
        let mut names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn test_schema_carries_bounds() {
        let tool = find("suggest_move").unwrap();
        let depth = &tool.input_schema["properties"]["depth"];
        assert_eq!(depth["default"], 18);
        assert_eq!(depth["minimum"], 5);
        assert_eq!(depth["maximum"], 25);
        assert_eq!(tool.input_schema["required"], json!(["fen"]));

        let explore = find("explore_moves").unwrap();
        let candidates = &explore.input_schema["properties"]["candidate_moves"];
        assert_eq!(candidates["maxItems"], 8);
        assert_eq!(explore.input_schema["properties"]["depth"]["maximum"], 18);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(find("explain_position").unwrap()).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert_eq!(value["name"], "explain_position");
    }

    #[test]
    fn test_bounds_resolve() {
        assert_eq!(SUGGEST_DEPTH.resolve(None), 18);
        assert_eq!(SUGGEST_DEPTH.resolve(Some(2)), 5);
        assert_eq!(SUGGEST_DEPTH.resolve(Some(99)), 25);
        assert_eq!(SUGGEST_DEPTH.resolve(Some(-4)), 5);
        assert_eq!(ANALYZE_POSITION_DEPTH.resolve(Some(20)), 20);
    }
}
