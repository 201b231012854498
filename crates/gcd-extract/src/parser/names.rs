//! Name cleanup shared by the character and credit parsers

/// Reduce an annotation fragment to a bare name
///
/// Complete `(...)` and `[...]` groups are removed along with anything after
/// an opener that is never closed. Stray closers and `?` (the GCD marker for
/// an uncertain attribution) are dropped, whitespace runs collapse to one
/// space and the result is trimmed.
///
/// ```
/// use gcd_extract::parser::prepare_name;
///
/// assert_eq!(prepare_name("  Jack  Kirby (layouts) ?"), "Jack Kirby");
/// assert_eq!(prepare_name("Batman [Bruce Wayne"), "Batman");
/// ```
pub fn prepare_name(s: &str) -> String {
    let mut kept = String::with_capacity(s.len());
    let mut depth = 0usize;

    for ch in s.chars() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '?' => {},
            _ if depth == 0 => kept.push(ch),
            _ => {},
        }
    }

    collapse_whitespace(&kept)
}

/// Trim a bracket piece and drop closers that have no opener
///
/// Balanced groups survive, so `Major Ray (Major William Ray)` is kept
/// whole while `Steve Rogers]` loses its surplus `]`. Returns `None` for a
/// piece that is blank afterwards.
pub fn clean_piece(s: &str) -> Option<String> {
    let mut kept = String::with_capacity(s.len());
    let mut open = 0usize;

    for ch in s.chars() {
        match ch {
            '[' | '(' => {
                open += 1;
                kept.push(ch);
            },
            ']' | ')' if open == 0 => {},
            ']' | ')' => {
                open -= 1;
                kept.push(ch);
            },
            _ => kept.push(ch),
        }
    }

    let cleaned = collapse_whitespace(&kept);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
