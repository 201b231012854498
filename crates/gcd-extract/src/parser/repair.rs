//! Best-effort repair of unclosed `[` groups
//!
//! The most common transcription defect in the `characters` field is a team
//! member list that never gets its closing `]`. Left alone, every following
//! entry of the annotation is swallowed into that team. This pass inserts a
//! synthetic `]` where the list most plausibly ended.
//!
//! It is a heuristic tuned on observed defects, not a grammar. Anything that is
//! not an unclosed `[` (including surplus `]`) is left untouched; the splitter
//! tolerates those on its own.

use std::borrow::Cow;

use super::characters::MAX_INDIVIDUAL_PIECES;

/// Close every `[` that is never closed
///
/// Innermost unclosed brackets are repaired first. For each one the `]` goes
/// right after the last parenthetical group that closes at the bracket's own
/// level and ends an item (followed by `;` or end of text), provided the list
/// closed there has enough members to be a team. Without such a group it goes
/// at the end of the text, before any trailing whitespace and semicolons.
pub fn fix_missing_brackets(s: &str) -> Cow<'_, str> {
    let Some(mut opener) = last_unclosed_bracket(s) else {
        return Cow::Borrowed(s);
    };

    let mut repaired = s.to_string();
    loop {
        let at = closing_position(&repaired, opener);
        repaired.insert(at, ']');

        match last_unclosed_bracket(&repaired) {
            Some(next) => opener = next,
            None => break,
        }
    }

    Cow::Owned(repaired)
}

/// Byte offset of the innermost `[` left open at end of text
fn last_unclosed_bracket(s: &str) -> Option<usize> {
    let mut open = Vec::new();
    for (idx, ch) in s.char_indices() {
        match ch {
            '[' => open.push(idx),
            ']' => {
                open.pop();
            },
            _ => {},
        }
    }
    open.pop()
}

fn closing_position(s: &str, opener: usize) -> usize {
    let body_start = opener + 1;
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut separators = 0usize;
    let mut candidate = None;

    for (offset, ch) in s[body_start..].char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ';' if paren_depth == 0 && bracket_depth == 0 => separators += 1,
            ')' if paren_depth > 0 => {
                paren_depth -= 1;
                // A note on an early member is not the end of the list
                if paren_depth == 0 && bracket_depth == 0 && separators >= MAX_INDIVIDUAL_PIECES {
                    let after = body_start + offset + 1;
                    if ends_item(&s[after..]) {
                        candidate = Some(after);
                    }
                }
            },
            _ => {},
        }
    }

    candidate.unwrap_or_else(|| {
        s.trim_end_matches(|c: char| c.is_whitespace() || c == ';')
            .len()
    })
}

fn ends_item(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), None | Some(';'))
}
