//! Semicolon splitting that respects `[...]` and `(...)` nesting

/// Split `s` on semicolons that are not inside a bracket or parenthesis group
///
/// Depth is a signed counter: `[` and `(` increment it, `]` and `)` decrement
/// it. A `;` is a split point while no opener is pending (depth <= 0), so a
/// surplus closer such as the one in `Captain America [Steve Rogers]]` neither
/// panics nor swallows the following entry. The counter restarts at zero for
/// every piece.
///
/// Pieces are returned untrimmed and in input order, so joining them with `;`
/// gives back `s`. The one exception: a blank final piece (a trailing `;`,
/// optionally followed by whitespace) is dropped.
pub fn split_on_outer_semicolons(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (idx, ch) in s.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            ';' if depth <= 0 => {
                pieces.push(&s[start..idx]);
                start = idx + ch.len_utf8();
                depth = 0;
            },
            _ => {},
        }
    }

    let last = &s[start..];
    if !last.trim().is_empty() {
        pieces.push(last);
    }

    pieces
}

/// Split on semicolons, trim, and drop blank pieces
pub fn split_trimmed(s: &str) -> Vec<&str> {
    split_on_outer_semicolons(s)
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}
