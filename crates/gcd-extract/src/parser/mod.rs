//! Annotation parser
//!
//! Pure functions, no I/O. The `characters` field of a GCD story is a
//! `;`-separated list of entries such as
//!
//! ```text
//! Batman [Bruce Wayne] (cameo); Justice League [Superman; Flash; Aquaman]
//! ```
//!
//! where `[...]` holds an alter ego (or a team's member list) and `(...)` an
//! appearance note. The text is written by hand and often unbalanced, so
//! parsing runs in three stages:
//!
//! 1. [`fix_missing_brackets`] closes `[` groups that were never closed
//! 2. [`split_on_outer_semicolons`] cuts the text into entries
//! 3. [`parse_entry`] turns each entry into a [`CharacterAppearance`]
//!
//! [`CharacterAppearance`]: crate::models::CharacterAppearance

pub mod characters;
pub mod credits;
pub mod names;
pub mod repair;
pub mod split;

pub use characters::{parse_characters, parse_entry};
pub use credits::split_credit_names;
pub use names::{clean_piece, prepare_name};
pub use repair::fix_missing_brackets;
pub use split::{split_on_outer_semicolons, split_trimmed};
