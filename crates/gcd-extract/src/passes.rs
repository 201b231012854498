//! Wiring of the character and credit passes

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use crate::config::ExtractConfig;
use crate::extractor::{CharacterExtractor, CreditExtractor, Extractor};
use crate::models::{StoryCharactersRow, StoryCreditsRow};
use crate::pipeline::{BatchDriver, DriverError, ExtractionSummary, PgRowSource, RowSource, SourceQuery};
use crate::progress::ProgressTracker;
use crate::repository::PgRepository;

/// Run one extractor to completion against the configured progress file
pub async fn run_pass<S, E>(
    source: &S,
    extractor: &E,
    config: &ExtractConfig,
) -> Result<ExtractionSummary, DriverError>
where
    S: RowSource,
    E: Extractor<Row = S::Row>,
{
    let mut tracker =
        ProgressTracker::open(&config.progress_file, extractor.extraction_type().as_str())?;

    BatchDriver::new(config.batch_size)
        .with_start_id(config.start_id)
        .extract_and_insert(source, extractor, &mut tracker)
        .await
}

pub async fn run_character_pass(
    pool: &PgPool,
    config: &ExtractConfig,
) -> anyhow::Result<ExtractionSummary> {
    let repository = Arc::new(PgRepository::new(pool.clone(), config.schemas())?);
    let query = SourceQuery::characters(&config.source_schema)?;
    let source = PgRowSource::<StoryCharactersRow>::new(pool.clone(), &query);

    info!(
        source = %config.source_schema,
        target = %config.target_schema,
        primary = %config.primary_schema,
        "Running character pass"
    );

    run_pass(&source, &CharacterExtractor::new(repository), config)
        .await
        .context("Character pass failed")
}

pub async fn run_credit_pass(
    pool: &PgPool,
    config: &ExtractConfig,
) -> anyhow::Result<ExtractionSummary> {
    let repository = Arc::new(PgRepository::new(pool.clone(), config.schemas())?);
    let query = SourceQuery::credits(&config.source_schema)?;
    let source = PgRowSource::<StoryCreditsRow>::new(pool.clone(), &query);

    info!(
        source = %config.source_schema,
        target = %config.target_schema,
        "Running credit pass"
    );

    run_pass(&source, &CreditExtractor::new(repository), config)
        .await
        .context("Credit pass failed")
}
