//! Per-row extractors
//!
//! An extractor binds the annotation parser to a repository for one source
//! row. The batch driver knows nothing about characters or credits; it only
//! sees the [`Extractor`] trait.

use async_trait::async_trait;

use crate::pipeline::SourceRow;
use crate::repository::RepositoryError;

pub mod character;
pub mod credit;

pub use character::CharacterExtractor;
pub use credit::CreditExtractor;

/// Extraction type, also the key of its entry in the progress file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ExtractionKind {
    #[value(name = "Character", alias = "character")]
    Character,
    #[value(name = "Credit", alias = "credit")]
    Credit,
}

impl ExtractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionKind::Character => "Character",
            ExtractionKind::Credit => "Credit",
        }
    }
}

impl std::fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What extracting one row produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    /// Rows actually inserted (existing ones are not counted)
    pub records_written: u64,
    /// Appearances or credit names found in the row
    pub entries_parsed: u64,
    /// Credit names with no matching creator
    pub unresolved_names: u64,
    /// The row could not be attributed and was left alone
    pub skipped: bool,
}

impl ExtractOutcome {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Turns one source row into destination records
#[async_trait]
pub trait Extractor: Send + Sync {
    type Row: SourceRow;

    fn extraction_type(&self) -> ExtractionKind;

    async fn extract(&self, row: &Self::Row) -> Result<ExtractOutcome, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_progress_keys() {
        assert_eq!(ExtractionKind::Character.to_string(), "Character");
        assert_eq!(ExtractionKind::Credit.as_str(), "Credit");
    }

    #[test]
    fn test_kind_parses_from_cli() {
        use clap::ValueEnum;
        assert_eq!(ExtractionKind::from_str("Credit", false), Ok(ExtractionKind::Credit));
        assert_eq!(ExtractionKind::from_str("character", false), Ok(ExtractionKind::Character));
    }
}
