//! PostgreSQL repository and end-to-end pass tests
//!
//! Run with `cargo test -p gcd-extract --test postgres_repository_test -- --ignored`

mod common;

use std::collections::HashSet;

use common::{init_test_tracing, TestPostgres, PRIMARY_SCHEMA, SOURCE_SCHEMA};
use gcd_extract::config::ExtractConfig;
use gcd_extract::models::{Appearance, CreditType, StoryCredit};
use gcd_extract::passes;
use gcd_extract::progress;
use gcd_extract::repository::{
    CharacterRepository, CreditRepository, PgRepository, RepositoryError,
};
use tempfile::TempDir;

async fn setup() -> (TestPostgres, PgRepository) {
    init_test_tracing();
    let pg = TestPostgres::start()
        .await
        .expect("Failed to start PostgreSQL");
    pg.seed_publisher(1, "DC").await.unwrap();
    pg.seed_publisher(2, "Marvel").await.unwrap();
    let repo = PgRepository::new(pg.pool().clone(), pg.schemas()).unwrap();
    (pg, repo)
}

fn config_for(dir: &TempDir, batch_size: u32) -> ExtractConfig {
    ExtractConfig {
        source_schema: SOURCE_SCHEMA.to_string(),
        target_schema: SOURCE_SCHEMA.to_string(),
        primary_schema: PRIMARY_SCHEMA.to_string(),
        batch_size,
        progress_file: dir.path().join("progress.json"),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_character_is_idempotent() {
    let (pg, repo) = setup().await;

    let first = repo.upsert_character("Batman", Some("Bruce Wayne"), 1).await.unwrap();
    let again = repo.upsert_character("Batman", Some("Bruce Wayne"), 1).await.unwrap();
    let bare = repo.upsert_character("Batman", None, 1).await.unwrap();
    let bare_again = repo.upsert_character("Batman", None, 1).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(bare, bare_again);
    assert_ne!(first, bare);
    assert_eq!(pg.count("gcd.m_character").await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_primary_schema_wins_over_target() {
    let (pg, repo) = setup().await;
    pg.seed_primary_character(9001, "Superman", Some("Clark Kent"), 1)
        .await
        .unwrap();

    let id = repo.upsert_character("Superman", Some("Clark Kent"), 1).await.unwrap();

    assert_eq!(id, 9001);
    assert_eq!(pg.count("gcd.m_character").await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_long_names_truncated_before_insert() {
    let (_pg, repo) = setup().await;
    let name = "Z".repeat(400);

    let id = repo.upsert_character(&name, None, 1).await.unwrap();
    assert_eq!(repo.upsert_character(&name, None, 1).await.unwrap(), id);

    let stored: String = sqlx::query_scalar("SELECT name FROM gcd.m_character WHERE id = $1")
        .bind(id)
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(stored.chars().count(), 255);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unknown_publisher_is_reported() {
    let (_pg, repo) = setup().await;

    let err = repo.upsert_character("Spawn", None, 404).await.unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::UnknownPublisher { publisher_id: 404, .. }
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_appearance_insert_ignores_duplicates() {
    let (pg, repo) = setup().await;
    pg.seed_story(10, 1, "Batman").await.unwrap();
    let character_id = repo.upsert_character("Batman", None, 1).await.unwrap();

    let appearances: HashSet<Appearance> = [
        Appearance {
            story_id: 10,
            character_id,
            details: None,
            notes: None,
            membership: None,
        },
        Appearance {
            story_id: 10,
            character_id,
            details: Some("cameo".to_string()),
            notes: None,
            membership: None,
        },
    ]
    .into_iter()
    .collect();

    assert_eq!(repo.insert_character_appearances(&appearances).await.unwrap(), 2);
    assert_eq!(repo.insert_character_appearances(&appearances).await.unwrap(), 0);
    assert_eq!(pg.count("gcd.m_character_appearance").await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_publisher_resolved_through_issue_and_series() {
    let (pg, repo) = setup().await;
    pg.seed_story(20, 2, "Hulk").await.unwrap();
    pg.seed_orphan_story(21, "Hulk").await.unwrap();

    assert_eq!(repo.get_publisher_id(20).await.unwrap(), Some(2));
    assert_eq!(repo.get_publisher_id(21).await.unwrap(), None);
    assert_eq!(repo.get_publisher_id(999).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_creator_skips_deleted_names() {
    let (pg, repo) = setup().await;
    pg.seed_creator(1, "Jack Kirby", true).await.unwrap();
    pg.seed_creator(5, "Jack Kirby", false).await.unwrap();
    pg.seed_creator(7, "Jack Kirby", false).await.unwrap();
    pg.seed_credit_story(30, "", "Jack Kirby").await.unwrap();

    assert_eq!(repo.find_creator("Jack Kirby").await.unwrap(), Some(5));
    assert_eq!(repo.find_creator("Steve Ditko").await.unwrap(), None);

    let credits: HashSet<StoryCredit> = [StoryCredit {
        story_id: 30,
        creator_id: 5,
        credit_type: CreditType::Pencils,
    }]
    .into_iter()
    .collect();
    assert_eq!(repo.insert_story_credits(&credits).await.unwrap(), 1);
    assert_eq!(repo.insert_story_credits(&credits).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_character_pass_end_to_end_with_resume() {
    let (pg, _repo) = setup().await;
    pg.seed_story(1, 1, "Batman [Bruce Wayne]; Robin [Dick Grayson] (cameo)")
        .await
        .unwrap();
    pg.seed_story(2, 1, "Justice League [Batman; Superman; Wonder Woman]")
        .await
        .unwrap();
    pg.seed_story(3, 2, "").await.unwrap();
    pg.seed_orphan_story(4, "Mystery Man").await.unwrap();
    pg.seed_story(5, 2, "Fantastic Four [Thing [Ben Grimm]; Human Torch; Invisible Girl")
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, 2);

    let summary = passes::run_character_pass(pg.pool(), &config).await.unwrap();
    // Story 3 has an empty field and is not selected
    assert_eq!(summary.rows_processed, 4);
    assert_eq!(summary.rows_skipped, 1);
    assert_eq!(summary.last_processed_id, Some(5));
    assert_eq!(pg.count("gcd.m_character").await.unwrap(), 4);
    assert_eq!(pg.count("gcd.m_character_appearance").await.unwrap(), 4);

    // Nothing left after the cursor
    let rerun = passes::run_character_pass(pg.pool(), &config).await.unwrap();
    assert_eq!(rerun.rows_processed, 0);
    assert_eq!(rerun.started_after_id, 5);

    let saved = progress::read_all(&config.progress_file).unwrap();
    assert_eq!(saved["Character"].last_processed_item_id, 5);
    assert_eq!(saved["Character"].num_completed, 4);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_credit_pass_end_to_end() {
    let (pg, _repo) = setup().await;
    pg.seed_creator(1, "Stan Lee", false).await.unwrap();
    pg.seed_creator(2, "Jack Kirby", false).await.unwrap();
    pg.seed_credit_story(100, "Stan Lee", "Jack Kirby; Unknown Artist ?")
        .await
        .unwrap();
    pg.seed_credit_story(101, "Stan Lee; Jack Kirby", "Jack Kirby")
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let summary = passes::run_credit_pass(pg.pool(), &config_for(&dir, 10))
        .await
        .unwrap();

    assert_eq!(summary.rows_processed, 2);
    assert_eq!(summary.records_written, 5);
    assert_eq!(summary.unresolved_names, 1);
    assert_eq!(pg.count("gcd.m_story_credit").await.unwrap(), 5);
}
