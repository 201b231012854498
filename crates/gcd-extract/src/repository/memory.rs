//! In-memory repository
//!
//! Same contract as the PostgreSQL implementation, including the lookup
//! chain, truncation, and insert-or-ignore keys, without a database. Used by
//! the test suite.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::lookup::{CharacterLookup, LookupChain};
use super::{
    CharacterKey, CharacterRepository, CreditRepository, RepositoryError, RepositoryResult,
};
use crate::models::{Appearance, Character, StoryCredit};

/// Unique key of `m_character_appearance`; `membership` is not part of it
type AppearanceKey = (Option<String>, i64, i64, Option<String>);

#[derive(Debug, Default)]
struct MemoryState {
    characters: HashMap<String, Vec<Character>>,
    next_character_id: i64,
    appearances: HashMap<AppearanceKey, Appearance>,
    credits: HashSet<StoryCredit>,
    story_publishers: HashMap<i64, i64>,
    /// Known publishers; `None` disables the foreign key check
    publishers: Option<HashSet<i64>>,
    creators: HashMap<String, i64>,
}

impl MemoryState {
    fn insert_character(&mut self, schema: &str, key: CharacterKey) -> Character {
        self.next_character_id += 1;
        let character = Character {
            id: self.next_character_id,
            name: key.name,
            alter_ego: key.alter_ego,
            publisher_id: key.publisher_id,
        };
        self.characters
            .entry(schema.to_string())
            .or_default()
            .push(character.clone());
        character
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`CharacterLookup`] over one schema of a [`MemoryRepository`]
struct MemorySchemaLookup {
    state: Arc<Mutex<MemoryState>>,
    schema: String,
}

#[async_trait]
impl CharacterLookup for MemorySchemaLookup {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn find_character(&self, key: &CharacterKey) -> RepositoryResult<Option<i64>> {
        let state = lock(&self.state);
        let id = state.characters.get(&self.schema).and_then(|rows| {
            rows.iter()
                .find(|c| {
                    c.name == key.name
                        && c.alter_ego == key.alter_ego
                        && c.publisher_id == key.publisher_id
                })
                .map(|c| c.id)
        });
        Ok(id)
    }
}

pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    target: String,
    chain: LookupChain,
}

impl MemoryRepository {
    pub fn new(primary: &str, target: &str) -> Self {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        let lookup = |schema: &str| -> Box<dyn CharacterLookup> {
            Box::new(MemorySchemaLookup {
                state: Arc::clone(&state),
                schema: schema.to_string(),
            })
        };
        let chain = LookupChain::primary_then_target(lookup(primary), lookup(target));

        Self {
            state,
            target: target.to_string(),
            chain,
        }
    }

    /// Resolve `story_id` to `publisher_id` in [`CharacterRepository::get_publisher_id`]
    pub fn with_story_publisher(self, story_id: i64, publisher_id: i64) -> Self {
        lock(&self.state)
            .story_publishers
            .insert(story_id, publisher_id);
        self
    }

    /// Register a publisher. Once any is registered, inserting a character
    /// for an unregistered one fails like a foreign key violation.
    pub fn with_publisher(self, publisher_id: i64) -> Self {
        lock(&self.state)
            .publishers
            .get_or_insert_with(HashSet::new)
            .insert(publisher_id);
        self
    }

    /// Register a creator name record; the lowest id wins for duplicate names
    pub fn with_creator(self, name: &str, creator_id: i64) -> Self {
        lock(&self.state)
            .creators
            .entry(name.to_string())
            .and_modify(|id| *id = (*id).min(creator_id))
            .or_insert(creator_id);
        self
    }

    /// Insert a character directly into `schema`, bypassing the lookup chain
    pub fn seed_character(
        &self,
        schema: &str,
        name: &str,
        alter_ego: Option<&str>,
        publisher_id: i64,
    ) -> i64 {
        lock(&self.state)
            .insert_character(schema, CharacterKey::new(name, alter_ego, publisher_id))
            .id
    }

    pub fn characters(&self, schema: &str) -> Vec<Character> {
        lock(&self.state)
            .characters
            .get(schema)
            .cloned()
            .unwrap_or_default()
    }

    pub fn appearances(&self) -> HashSet<Appearance> {
        lock(&self.state).appearances.values().cloned().collect()
    }

    pub fn credits(&self) -> HashSet<StoryCredit> {
        lock(&self.state).credits.clone()
    }
}

#[async_trait]
impl CharacterRepository for MemoryRepository {
    async fn upsert_character(
        &self,
        name: &str,
        alter_ego: Option<&str>,
        publisher_id: i64,
    ) -> RepositoryResult<i64> {
        let key = CharacterKey::new(name, alter_ego, publisher_id);
        if let Some(id) = self.chain.resolve(&key).await? {
            return Ok(id);
        }

        let mut state = lock(&self.state);
        if let Some(known) = &state.publishers {
            if !known.contains(&publisher_id) {
                return Err(RepositoryError::UnknownPublisher {
                    publisher_id,
                    name: key.name,
                });
            }
        }
        Ok(state.insert_character(&self.target, key).id)
    }

    async fn insert_character_appearances(
        &self,
        appearances: &HashSet<Appearance>,
    ) -> RepositoryResult<u64> {
        let mut state = lock(&self.state);
        let mut inserted = 0;
        for appearance in appearances {
            let key = (
                appearance.details.clone(),
                appearance.character_id,
                appearance.story_id,
                appearance.notes.clone(),
            );
            if !state.appearances.contains_key(&key) {
                state.appearances.insert(key, appearance.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_publisher_id(&self, story_id: i64) -> RepositoryResult<Option<i64>> {
        Ok(lock(&self.state).story_publishers.get(&story_id).copied())
    }
}

#[async_trait]
impl CreditRepository for MemoryRepository {
    async fn find_creator(&self, name: &str) -> RepositoryResult<Option<i64>> {
        Ok(lock(&self.state).creators.get(name).copied())
    }

    async fn insert_story_credits(&self, credits: &HashSet<StoryCredit>) -> RepositoryResult<u64> {
        let mut state = lock(&self.state);
        let inserted = credits
            .iter()
            .filter(|credit| state.credits.insert((*credit).clone()))
            .count();
        Ok(inserted as u64)
    }
}
