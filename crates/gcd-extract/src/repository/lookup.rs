//! Ordered character lookup across schemas

use async_trait::async_trait;
use tracing::trace;

use super::{CharacterKey, RepositoryResult};

/// One place a character may already exist
#[async_trait]
pub trait CharacterLookup: Send + Sync {
    /// Schema this strategy searches
    fn schema(&self) -> &str;

    async fn find_character(&self, key: &CharacterKey) -> RepositoryResult<Option<i64>>;
}

/// Lookup strategies tried in order; the first hit wins
pub struct LookupChain {
    lookups: Vec<Box<dyn CharacterLookup>>,
}

impl LookupChain {
    pub fn new(lookups: Vec<Box<dyn CharacterLookup>>) -> Self {
        Self { lookups }
    }

    /// Primary schema first, then the target. A target that is itself the
    /// primary schema is searched once.
    pub fn primary_then_target(
        primary: Box<dyn CharacterLookup>,
        target: Box<dyn CharacterLookup>,
    ) -> Self {
        if primary.schema() == target.schema() {
            Self::new(vec![target])
        } else {
            Self::new(vec![primary, target])
        }
    }

    pub fn schemas(&self) -> Vec<&str> {
        self.lookups.iter().map(|l| l.schema()).collect()
    }

    /// Character id from the first schema that has the key
    pub async fn resolve(&self, key: &CharacterKey) -> RepositoryResult<Option<i64>> {
        for lookup in &self.lookups {
            if let Some(id) = lookup.find_character(key).await? {
                trace!(schema = lookup.schema(), character_id = id, "Character found");
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for LookupChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupChain")
            .field("schemas", &self.schemas())
            .finish()
    }
}
