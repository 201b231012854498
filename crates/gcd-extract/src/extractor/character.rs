use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{ExtractOutcome, ExtractionKind, Extractor};
use crate::models::{Appearance, CharacterAppearance, StoryCharactersRow};
use crate::parser::parse_characters;
use crate::repository::{CharacterRepository, RepositoryError};

/// Characters and their appearances from a story's `characters` field
pub struct CharacterExtractor {
    repository: Arc<dyn CharacterRepository>,
}

impl CharacterExtractor {
    pub fn new(repository: Arc<dyn CharacterRepository>) -> Self {
        Self { repository }
    }

    async fn publisher_of(&self, row: &StoryCharactersRow) -> Result<Option<i64>, RepositoryError> {
        match row.publisher_id {
            Some(id) => Ok(Some(id)),
            None => self.repository.get_publisher_id(row.id).await,
        }
    }
}

#[async_trait]
impl Extractor for CharacterExtractor {
    type Row = StoryCharactersRow;

    fn extraction_type(&self) -> ExtractionKind {
        ExtractionKind::Character
    }

    async fn extract(&self, row: &StoryCharactersRow) -> Result<ExtractOutcome, RepositoryError> {
        let Some(raw) = row.characters.as_deref().filter(|c| !c.trim().is_empty()) else {
            return Ok(ExtractOutcome::default());
        };

        let parsed = parse_characters(raw);
        if parsed.is_empty() {
            return Ok(ExtractOutcome::default());
        }

        // Characters are keyed per publisher; without one there is nothing to attach to
        let Some(publisher_id) = self.publisher_of(row).await? else {
            debug!(story_id = row.id, "No publisher for story, skipping characters");
            return Ok(ExtractOutcome::skipped());
        };

        let mut appearances = HashSet::with_capacity(parsed.len());
        for entry in &parsed {
            let appearance = match entry {
                CharacterAppearance::Individual {
                    name,
                    alter_ego,
                    appearance_info,
                    notes,
                } => {
                    let character_id = self
                        .repository
                        .upsert_character(name, alter_ego.as_deref(), publisher_id)
                        .await?;
                    Appearance {
                        story_id: row.id,
                        character_id,
                        details: appearance_info.clone(),
                        notes: notes.clone(),
                        membership: None,
                    }
                },
                CharacterAppearance::Team {
                    name,
                    members,
                    appearance_info,
                } => {
                    let character_id = self
                        .repository
                        .upsert_character(name, None, publisher_id)
                        .await?;
                    Appearance {
                        story_id: row.id,
                        character_id,
                        details: appearance_info.clone(),
                        notes: None,
                        membership: Some(members.clone()),
                    }
                },
            };
            appearances.insert(appearance);
        }

        let records_written = self
            .repository
            .insert_character_appearances(&appearances)
            .await?;

        trace!(story_id = row.id, parsed = parsed.len(), records_written, "Extracted characters");

        Ok(ExtractOutcome {
            records_written,
            entries_parsed: parsed.len() as u64,
            unresolved_names: 0,
            skipped: false,
        })
    }
}
