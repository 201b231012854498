use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{ExtractOutcome, ExtractionKind, Extractor};
use crate::models::{StoryCredit, StoryCreditsRow};
use crate::parser::split_credit_names;
use crate::repository::{CreditRepository, RepositoryError};

/// Creator credits from a story's six role fields
pub struct CreditExtractor {
    repository: Arc<dyn CreditRepository>,
}

impl CreditExtractor {
    pub fn new(repository: Arc<dyn CreditRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Extractor for CreditExtractor {
    type Row = StoryCreditsRow;

    fn extraction_type(&self) -> ExtractionKind {
        ExtractionKind::Credit
    }

    async fn extract(&self, row: &StoryCreditsRow) -> Result<ExtractOutcome, RepositoryError> {
        let mut credits = HashSet::new();
        let mut outcome = ExtractOutcome::default();

        for (credit_type, field) in row.role_fields() {
            let Some(field) = field else { continue };

            for name in split_credit_names(field) {
                outcome.entries_parsed += 1;
                match self.repository.find_creator(&name).await? {
                    Some(creator_id) => {
                        credits.insert(StoryCredit {
                            story_id: row.id,
                            creator_id,
                            credit_type,
                        });
                    },
                    None => {
                        outcome.unresolved_names += 1;
                        debug!(story_id = row.id, %credit_type, name = %name, "No creator matches credit");
                    },
                }
            }
        }

        outcome.records_written = self.repository.insert_story_credits(&credits).await?;

        trace!(
            story_id = row.id,
            parsed = outcome.entries_parsed,
            records_written = outcome.records_written,
            "Extracted credits"
        );

        Ok(outcome)
    }
}
