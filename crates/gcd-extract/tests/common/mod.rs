//! Common test utilities for gcd-extract integration tests using testcontainers
//!
//! Spins up a PostgreSQL container holding a minimal GCD source schema (`gcd`)
//! plus the destination tables, and a second schema (`gcd_primary`) standing
//! in for the canonical character store.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestPostgres;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn test_with_postgres() {
//!     let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
//!     sqlx::query("SELECT 1").execute(pg.pool()).await.expect("Query failed");
//! }
//! ```

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use anyhow::{Context, Result};
use gcd_extract::repository::SchemaNames;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

pub const SOURCE_SCHEMA: &str = "gcd";
pub const PRIMARY_SCHEMA: &str = "gcd_primary";

/// Source tables, destination tables and the primary character store
///
/// `NULLS NOT DISTINCT` makes a NULL alter ego or note part of the unique key.
const SCHEMA_SQL: &str = r#"
CREATE SCHEMA gcd;
CREATE SCHEMA gcd_primary;

CREATE TABLE gcd.gcd_publisher (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE gcd.gcd_series (
    id BIGINT PRIMARY KEY,
    publisher_id BIGINT REFERENCES gcd.gcd_publisher (id)
);

CREATE TABLE gcd.gcd_issue (
    id BIGINT PRIMARY KEY,
    series_id BIGINT REFERENCES gcd.gcd_series (id)
);

CREATE TABLE gcd.gcd_story (
    id BIGINT PRIMARY KEY,
    issue_id BIGINT REFERENCES gcd.gcd_issue (id),
    characters TEXT NOT NULL DEFAULT '',
    script TEXT NOT NULL DEFAULT '',
    pencils TEXT NOT NULL DEFAULT '',
    inks TEXT NOT NULL DEFAULT '',
    colors TEXT NOT NULL DEFAULT '',
    letters TEXT NOT NULL DEFAULT '',
    editing TEXT NOT NULL DEFAULT '',
    deleted SMALLINT NOT NULL DEFAULT 0
);

CREATE TABLE gcd.gcd_creator_name_detail (
    id BIGINT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    deleted SMALLINT NOT NULL DEFAULT 0
);

CREATE TABLE gcd.m_character (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    alter_ego VARCHAR(255),
    publisher_id BIGINT NOT NULL REFERENCES gcd.gcd_publisher (id),
    UNIQUE NULLS NOT DISTINCT (name, alter_ego, publisher_id)
);

CREATE TABLE gcd.m_character_appearance (
    id BIGSERIAL PRIMARY KEY,
    details VARCHAR(255),
    character_id BIGINT NOT NULL,
    story_id BIGINT NOT NULL REFERENCES gcd.gcd_story (id),
    notes VARCHAR(255),
    membership TEXT,
    UNIQUE NULLS NOT DISTINCT (details, character_id, story_id, notes)
);

CREATE TABLE gcd.m_story_credit (
    id BIGSERIAL PRIMARY KEY,
    creator_id BIGINT NOT NULL REFERENCES gcd.gcd_creator_name_detail (id),
    credit_type_id BIGINT NOT NULL,
    story_id BIGINT NOT NULL REFERENCES gcd.gcd_story (id),
    UNIQUE (creator_id, credit_type_id, story_id)
);

CREATE TABLE gcd_primary.m_character (
    id BIGINT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    alter_ego VARCHAR(255),
    publisher_id BIGINT NOT NULL,
    UNIQUE NULLS NOT DISTINCT (name, alter_ego, publisher_id)
);
"#;

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL test container wrapper with the GCD tables created
pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    pool: PgPool,
    connection_string: String,
}

impl TestPostgres {
    /// Start a new PostgreSQL container and create the test schemas
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        // NULLS NOT DISTINCT needs 15+
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/postgres");
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Failed to create test schemas")?;

        Ok(Self {
            container,
            pool,
            connection_string,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Source and target `gcd`, primary `gcd_primary`
    pub fn schemas(&self) -> SchemaNames {
        SchemaNames {
            source: SOURCE_SCHEMA.to_string(),
            target: SOURCE_SCHEMA.to_string(),
            primary: PRIMARY_SCHEMA.to_string(),
        }
    }

    // ========================================================================
    // Seed helpers
    // ========================================================================

    /// Publisher with one series and one issue, all sharing `id`
    pub async fn seed_publisher(&self, id: i64, name: &str) -> Result<()> {
        sqlx::query("INSERT INTO gcd.gcd_publisher (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO gcd.gcd_series (id, publisher_id) VALUES ($1, $1)")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO gcd.gcd_issue (id, series_id) VALUES ($1, $1)")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Story in the issue seeded by [`Self::seed_publisher`] for `publisher_id`
    pub async fn seed_story(&self, id: i64, publisher_id: i64, characters: &str) -> Result<()> {
        sqlx::query("INSERT INTO gcd.gcd_story (id, issue_id, characters) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(publisher_id)
            .bind(characters)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Story with no issue, so no publisher
    pub async fn seed_orphan_story(&self, id: i64, characters: &str) -> Result<()> {
        sqlx::query("INSERT INTO gcd.gcd_story (id, characters) VALUES ($1, $2)")
            .bind(id)
            .bind(characters)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn seed_credit_story(&self, id: i64, script: &str, pencils: &str) -> Result<()> {
        sqlx::query("INSERT INTO gcd.gcd_story (id, script, pencils) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(script)
            .bind(pencils)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn seed_creator(&self, id: i64, name: &str, deleted: bool) -> Result<()> {
        sqlx::query("INSERT INTO gcd.gcd_creator_name_detail (id, name, deleted) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(i16::from(deleted))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn seed_primary_character(
        &self,
        id: i64,
        name: &str,
        alter_ego: Option<&str>,
        publisher_id: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO gcd_primary.m_character (id, name, alter_ego, publisher_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(name)
        .bind(alter_ego)
        .bind(publisher_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Initialize tracing for tests
///
/// Call this at the start of your test to enable logging.
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,gcd_extract=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
