//! Domain models for character and credit extraction
//!
//! Three groups of types live here:
//! - parsed annotation values ([`CharacterAppearance`])
//! - destination records ([`Character`], [`Appearance`], [`StoryCredit`])
//! - source rows read page by page from `gcd_story`

use serde::{Deserialize, Serialize};

use crate::pipeline::SourceRow;

/// One character entry parsed from a story's `characters` annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CharacterAppearance {
    /// A single character, e.g. `Batman [Bruce Wayne] (cameo)`
    Individual {
        name: String,
        alter_ego: Option<String>,
        appearance_info: Option<String>,
        /// Second bracket piece, e.g. `Robin [Dick Grayson; flashback]`
        notes: Option<String>,
    },
    /// A collective whose bracket held more than two members
    Team {
        name: String,
        /// Verbatim member list, not parsed further
        members: String,
        appearance_info: Option<String>,
    },
}

impl CharacterAppearance {
    pub fn name(&self) -> &str {
        match self {
            CharacterAppearance::Individual { name, .. } | CharacterAppearance::Team { name, .. } => {
                name
            },
        }
    }

    pub fn appearance_info(&self) -> Option<&str> {
        match self {
            CharacterAppearance::Individual { appearance_info, .. }
            | CharacterAppearance::Team { appearance_info, .. } => appearance_info.as_deref(),
        }
    }

    pub fn is_team(&self) -> bool {
        matches!(self, CharacterAppearance::Team { .. })
    }
}

/// Persisted character (`m_character`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub alter_ego: Option<String>,
    pub publisher_id: i64,
}

/// Appearance of a character in a story (`m_character_appearance`)
///
/// The database assigns the row id; two values with the same fields are the
/// same appearance, which is what makes re-processing a story harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appearance {
    pub story_id: i64,
    pub character_id: i64,
    /// Appearance info, e.g. "cameo"
    pub details: Option<String>,
    pub notes: Option<String>,
    /// Team member list when the character is a team
    pub membership: Option<String>,
}

/// Creator role columns on `gcd_story`, with their `gcd_credit_type` ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditType {
    Script,
    Pencils,
    Inks,
    Colors,
    Letters,
    Editing,
}

impl CreditType {
    pub const ALL: [CreditType; 6] = [
        CreditType::Script,
        CreditType::Pencils,
        CreditType::Inks,
        CreditType::Colors,
        CreditType::Letters,
        CreditType::Editing,
    ];

    pub fn id(self) -> i64 {
        match self {
            CreditType::Script => 1,
            CreditType::Pencils => 2,
            CreditType::Inks => 3,
            CreditType::Colors => 4,
            CreditType::Letters => 5,
            CreditType::Editing => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CreditType::Script => "script",
            CreditType::Pencils => "pencils",
            CreditType::Inks => "inks",
            CreditType::Colors => "colors",
            CreditType::Letters => "letters",
            CreditType::Editing => "editing",
        }
    }
}

impl std::fmt::Display for CreditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit of a creator on a story (`m_story_credit`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryCredit {
    pub story_id: i64,
    pub creator_id: i64,
    pub credit_type: CreditType,
}

/// Source row for the character pass
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoryCharactersRow {
    pub id: i64,
    pub characters: Option<String>,
    /// Resolved through issue and series; `None` when the join found nothing
    pub publisher_id: Option<i64>,
}

impl SourceRow for StoryCharactersRow {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Source row for the credit pass
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct StoryCreditsRow {
    pub id: i64,
    pub script: Option<String>,
    pub pencils: Option<String>,
    pub inks: Option<String>,
    pub colors: Option<String>,
    pub letters: Option<String>,
    pub editing: Option<String>,
}

impl StoryCreditsRow {
    /// Role fields in credit-type order
    pub fn role_fields(&self) -> [(CreditType, Option<&str>); 6] {
        [
            (CreditType::Script, self.script.as_deref()),
            (CreditType::Pencils, self.pencils.as_deref()),
            (CreditType::Inks, self.inks.as_deref()),
            (CreditType::Colors, self.colors.as_deref()),
            (CreditType::Letters, self.letters.as_deref()),
            (CreditType::Editing, self.editing.as_deref()),
        ]
    }
}

impl SourceRow for StoryCreditsRow {
    fn id(&self) -> i64 {
        self.id
    }
}
