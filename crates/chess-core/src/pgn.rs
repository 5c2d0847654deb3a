//! PGN movetext extraction with a small regex-based parser.

use std::sync::OnceLock;

use regex::Regex;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("static regex"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^}]*\}|;[^\n]*").expect("static regex"))
}

fn move_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"O-O-O[+#]?|O-O[+#]?|0-0-0[+#]?|0-0[+#]?|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?[+#]?")
            .expect("static regex")
    })
}

/// Remove parenthesised variations, including nested ones.
fn strip_variations(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = header_re().replace_all(pgn, " ");
    let no_comments = comment_re().replace_all(&no_headers, " ");
    let movetext = strip_variations(&no_comments);

    move_re()
        .find_iter(&movetext)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Heuristic: does this single string look like PGN rather than one SAN move?
pub fn looks_like_pgn(text: &str) -> bool {
    let t = text.trim();
    t.starts_with('[') || t.contains("1.") || t.split_whitespace().count() > 1
}
