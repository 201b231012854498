//! Connection pool setup

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::ExtractConfig;

/// Build the pool shared by the row source and the repository
pub async fn create_pool(config: &ExtractConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(config.database_url()?)
        .await
        .context("Failed to connect to the GCD database")?;

    tracing::info!(
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Database connection pool created"
    );

    Ok(pool)
}
