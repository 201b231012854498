//! Destination repositories
//!
//! The extractors talk to the database only through the two traits defined
//! here. [`postgres::PgRepository`] is the production implementation and
//! [`memory::MemoryRepository`] an in-process one with the same semantics.
//!
//! Character resolution goes through a [`lookup::LookupChain`]: the shared
//! primary schema is consulted before the schema being written, so characters
//! already canonicalised there are reused instead of duplicated.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Appearance, StoryCredit};

pub mod lookup;
pub mod memory;
pub mod postgres;

pub use lookup::{CharacterLookup, LookupChain};
pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Width of the `name` and `alter_ego` columns, in characters
pub const MAX_NAME_CHARS: usize = 255;

/// Cut `s` to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Natural key of a character: (name, alter ego, publisher)
///
/// Built already truncated, so lookups and inserts always see the same
/// values. Two names that share their first 255 characters map to the same
/// key and therefore the same character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacterKey {
    pub name: String,
    pub alter_ego: Option<String>,
    pub publisher_id: i64,
}

impl CharacterKey {
    pub fn new(name: &str, alter_ego: Option<&str>, publisher_id: i64) -> Self {
        Self {
            name: truncate_chars(name, MAX_NAME_CHARS).to_string(),
            alter_ego: alter_ego.map(|a| truncate_chars(a, MAX_NAME_CHARS).to_string()),
            publisher_id,
        }
    }
}

/// Repository operation errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// SQL query or connection error
    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    /// Character insert referenced a publisher that does not exist
    #[error("Publisher {publisher_id} does not exist (character '{name}')")]
    UnknownPublisher { publisher_id: i64, name: String },

    /// Schema name is not a plain SQL identifier
    #[error("Invalid schema name '{0}'")]
    InvalidSchema(String),
}

impl RepositoryError {
    /// Whether the failure is transient (lost connection, exhausted pool)
    ///
    /// Nothing retries automatically; the flag tells the operator whether a
    /// plain re-run is likely to get past the failing row.
    pub fn is_retryable(&self) -> bool {
        match self {
            RepositoryError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            RepositoryError::UnknownPublisher { .. } | RepositoryError::InvalidSchema(_) => false,
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Reject schema names that are not safe to interpolate into SQL
pub fn validate_schema(schema: &str) -> RepositoryResult<()> {
    let mut chars = schema.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(RepositoryError::InvalidSchema(schema.to_string()))
    }
}

/// Schemas an extraction reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNames {
    /// Holds `gcd_story`, `gcd_issue`, `gcd_series` and the creator tables
    pub source: String,
    /// Receives `m_character`, `m_character_appearance` and `m_story_credit`
    pub target: String,
    /// Shared canonical characters, searched before `target`
    pub primary: String,
}

impl SchemaNames {
    pub fn validate(&self) -> RepositoryResult<()> {
        validate_schema(&self.source)?;
        validate_schema(&self.target)?;
        validate_schema(&self.primary)
    }
}

/// Character and appearance persistence
#[async_trait]
pub trait CharacterRepository: Send + Sync {
    /// Id of the character with this natural key, inserting it if no schema
    /// in the lookup chain has it
    async fn upsert_character(
        &self,
        name: &str,
        alter_ego: Option<&str>,
        publisher_id: i64,
    ) -> RepositoryResult<i64>;

    /// Insert appearances, ignoring ones already present. Returns the number
    /// of rows actually inserted.
    async fn insert_character_appearances(
        &self,
        appearances: &HashSet<Appearance>,
    ) -> RepositoryResult<u64>;

    /// Publisher of the series a story belongs to
    async fn get_publisher_id(&self, story_id: i64) -> RepositoryResult<Option<i64>>;
}

/// Creator lookup and credit persistence
#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Creator name record matching `name` exactly
    async fn find_creator(&self, name: &str) -> RepositoryResult<Option<i64>>;

    /// Insert credits, ignoring ones already present. Returns the number of
    /// rows actually inserted.
    async fn insert_story_credits(&self, credits: &HashSet<StoryCredit>) -> RepositoryResult<u64>;
}
