//! Parser for the `characters` annotation of a story

use crate::models::CharacterAppearance;

use super::names::{clean_piece, prepare_name};
use super::repair::fix_missing_brackets;
use super::split::{split_on_outer_semicolons, split_trimmed};

/// Bracket pieces above this count make the entry a team
pub(super) const MAX_INDIVIDUAL_PIECES: usize = 2;

/// Parse a raw `characters` annotation into typed appearances
///
/// Never fails: unclosed brackets are repaired first, then the text is split
/// into entries and every entry with a non-empty name becomes one appearance,
/// in input order.
///
/// ```
/// use gcd_extract::parser::parse_characters;
///
/// let parsed = parse_characters("Batman [Bruce Wayne] (cameo); Alfred");
/// assert_eq!(parsed.len(), 2);
/// assert_eq!(parsed[1].name(), "Alfred");
/// ```
pub fn parse_characters(raw: &str) -> Vec<CharacterAppearance> {
    let repaired = fix_missing_brackets(raw);
    split_on_outer_semicolons(&repaired)
        .into_iter()
        .filter_map(parse_entry)
        .collect()
}

/// Parse a single `;`-delimited entry
///
/// The bracket span runs from the first `[` to the last `]` (or to the end of
/// the entry when nothing closes it). Appearance info is the first `(...)`
/// group outside that span. The name is whatever precedes the earlier of the
/// two spans; an entry whose name cleans up to nothing yields `None`.
pub fn parse_entry(entry: &str) -> Option<CharacterAppearance> {
    let bracket = bracket_span(entry);
    let paren = paren_span(entry, bracket);

    let name_end = [bracket.map(|b| b.start), paren.map(|p| p.start)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(entry.len());
    let name = prepare_name(&entry[..name_end]);
    if name.is_empty() {
        return None;
    }

    let appearance_info = paren
        .and_then(|p| p.interior(entry))
        .map(str::trim)
        .filter(|info| !info.is_empty())
        .map(str::to_string);

    let interior = bracket.and_then(|b| b.interior(entry)).unwrap_or("");
    let mut pieces: Vec<String> = split_trimmed(interior)
        .into_iter()
        .filter_map(clean_piece)
        .collect();

    if pieces.len() > MAX_INDIVIDUAL_PIECES {
        let members = interior
            .trim()
            .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
            .to_string();
        return Some(CharacterAppearance::Team {
            name,
            members,
            appearance_info,
        });
    }

    let notes = (pieces.len() > 1).then(|| pieces.remove(1));
    let alter_ego = (!pieces.is_empty()).then(|| pieces.remove(0));

    Some(CharacterAppearance::Individual {
        name,
        alter_ego,
        appearance_info,
        notes,
    })
}

/// Byte range of a group: opener offset and closer offset, if any
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: Option<usize>,
}

impl Span {
    fn contains(&self, idx: usize) -> bool {
        idx >= self.start && self.end.is_none_or(|end| idx <= end)
    }

    /// Text between the delimiters; open-ended spans run to the end
    fn interior<'a>(&self, s: &'a str) -> Option<&'a str> {
        let from = self.start + 1;
        match self.end {
            Some(end) => s.get(from..end),
            None => s.get(from..),
        }
    }
}

fn bracket_span(entry: &str) -> Option<Span> {
    let start = entry.find('[')?;
    let end = entry[start..].rfind(']').map(|offset| start + offset);
    Some(Span { start, end })
}

fn paren_span(entry: &str, bracket: Option<Span>) -> Option<Span> {
    let outside = |idx: usize| bracket.is_none_or(|b| !b.contains(idx));

    let start = entry
        .char_indices()
        .find(|&(idx, ch)| ch == '(' && outside(idx))
        .map(|(idx, _)| idx)?;

    let mut depth = 0usize;
    for (offset, ch) in entry[start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(Span {
                        start,
                        end: Some(start + offset),
                    });
                }
            },
            _ => {},
        }
    }

    // Unbalanced: fall back to the last closer, if there is one
    let end = entry[start..].rfind(')').map(|offset| start + offset);
    Some(Span { start, end })
}
