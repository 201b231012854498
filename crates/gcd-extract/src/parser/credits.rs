//! Parser for the creator role fields of a story

use super::names::prepare_name;

/// Split a role field (`script`, `pencils`, ...) into cleaned creator names
///
/// Role fields carry no team structure, so the split is on every `;`.
/// Pieces that clean up to nothing are dropped.
pub fn split_credit_names(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(prepare_name)
        .filter(|name| !name.is_empty())
        .collect()
}
