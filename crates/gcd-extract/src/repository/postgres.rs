//! PostgreSQL repository
//!
//! Schema names are validated once at construction and interpolated into the
//! statements, which are built up front. Everything else is bound.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::lookup::{CharacterLookup, LookupChain};
use super::{
    validate_schema, CharacterKey, CharacterRepository, CreditRepository, RepositoryError,
    RepositoryResult, SchemaNames,
};
use crate::models::{Appearance, StoryCredit};

/// Rows per multi-row INSERT, well under the bind parameter limit
const INSERT_CHUNK_SIZE: usize = 1000;

/// Exact-key lookup in one schema's `m_character`
pub struct SchemaCharacterLookup {
    pool: PgPool,
    schema: String,
    sql: String,
}

impl SchemaCharacterLookup {
    pub fn new(pool: PgPool, schema: &str) -> RepositoryResult<Self> {
        validate_schema(schema)?;
        let sql = format!(
            "SELECT id FROM {schema}.m_character \
             WHERE name = $1 AND alter_ego IS NOT DISTINCT FROM $2 AND publisher_id = $3 \
             ORDER BY id LIMIT 1"
        );
        Ok(Self {
            pool,
            schema: schema.to_string(),
            sql,
        })
    }
}

#[async_trait]
impl CharacterLookup for SchemaCharacterLookup {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn find_character(&self, key: &CharacterKey) -> RepositoryResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(&self.sql)
            .bind(&key.name)
            .bind(&key.alter_ego)
            .bind(key.publisher_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

struct Statements {
    insert_character: String,
    insert_appearances: String,
    insert_credits: String,
    publisher_of_story: String,
    find_creator: String,
}

impl Statements {
    fn new(schemas: &SchemaNames) -> Self {
        let SchemaNames { source, target, .. } = schemas;
        Self {
            insert_character: format!(
                "INSERT INTO {target}.m_character (name, alter_ego, publisher_id) \
                 VALUES ($1, $2, $3) RETURNING id"
            ),
            insert_appearances: format!(
                "INSERT INTO {target}.m_character_appearance \
                 (details, character_id, story_id, notes, membership) "
            ),
            insert_credits: format!(
                "INSERT INTO {target}.m_story_credit (creator_id, credit_type_id, story_id) "
            ),
            publisher_of_story: format!(
                "SELECT se.publisher_id FROM {source}.gcd_story s \
                 LEFT JOIN {source}.gcd_issue i ON i.id = s.issue_id \
                 LEFT JOIN {source}.gcd_series se ON se.id = i.series_id \
                 WHERE s.id = $1"
            ),
            find_creator: format!(
                "SELECT id FROM {source}.gcd_creator_name_detail \
                 WHERE name = $1 AND deleted = 0 ORDER BY id LIMIT 1"
            ),
        }
    }
}

/// Repository backed by a `sqlx` connection pool
pub struct PgRepository {
    pool: PgPool,
    schemas: SchemaNames,
    chain: LookupChain,
    sql: Statements,
}

impl PgRepository {
    pub fn new(pool: PgPool, schemas: SchemaNames) -> RepositoryResult<Self> {
        schemas.validate()?;
        let chain = LookupChain::primary_then_target(
            Box::new(SchemaCharacterLookup::new(pool.clone(), &schemas.primary)?),
            Box::new(SchemaCharacterLookup::new(pool.clone(), &schemas.target)?),
        );
        let sql = Statements::new(&schemas);

        Ok(Self {
            pool,
            schemas,
            chain,
            sql,
        })
    }

    pub fn schemas(&self) -> &SchemaNames {
        &self.schemas
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CharacterRepository for PgRepository {
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

        let inserted = sqlx::query_scalar::<_, i64>(&self.sql.insert_character)
            .bind(&key.name)
            .bind(&key.alter_ego)
            .bind(key.publisher_id)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(id) => {
                debug!(character_id = id, name = %key.name, publisher_id, "Inserted character");
                Ok(id)
            },
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(RepositoryError::UnknownPublisher {
                    publisher_id,
                    name: key.name,
                })
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_character_appearances(
        &self,
        appearances: &HashSet<Appearance>,
    ) -> RepositoryResult<u64> {
        if appearances.is_empty() {
            return Ok(0);
        }

        let rows: Vec<&Appearance> = appearances.iter().collect();
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new(&self.sql.insert_appearances);

            query_builder.push_values(chunk, |mut b, appearance| {
                b.push_bind(appearance.details.clone())
                    .push_bind(appearance.character_id)
                    .push_bind(appearance.story_id)
                    .push_bind(appearance.notes.clone())
                    .push_bind(appearance.membership.clone());
            });

            query_builder.push(" ON CONFLICT DO NOTHING");

            inserted += query_builder
                .build()
                .execute(&self.pool)
                .await?
                .rows_affected();
        }

        debug!(requested = appearances.len(), inserted, "Inserted character appearances");
        Ok(inserted)
    }

    async fn get_publisher_id(&self, story_id: i64) -> RepositoryResult<Option<i64>> {
        let publisher = sqlx::query_scalar::<_, Option<i64>>(&self.sql.publisher_of_story)
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(publisher.flatten())
    }
}

#[async_trait]
impl CreditRepository for PgRepository {
    async fn find_creator(&self, name: &str) -> RepositoryResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(&self.sql.find_creator)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_story_credits(&self, credits: &HashSet<StoryCredit>) -> RepositoryResult<u64> {
        if credits.is_empty() {
            return Ok(0);
        }

        let rows: Vec<&StoryCredit> = credits.iter().collect();
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new(&self.sql.insert_credits);

            query_builder.push_values(chunk, |mut b, credit| {
                b.push_bind(credit.creator_id)
                    .push_bind(credit.credit_type.id())
                    .push_bind(credit.story_id);
            });

            query_builder.push(" ON CONFLICT DO NOTHING");

            inserted += query_builder
                .build()
                .execute(&self.pool)
                .await?
                .rows_affected();
        }

        debug!(requested = credits.len(), inserted, "Inserted story credits");
        Ok(inserted)
    }
}
