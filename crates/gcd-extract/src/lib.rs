//! GCD Extract Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Normalises the free-text `characters` and creator credit annotations of
//! the Grand Comics Database into relational records.
//!
//! # Layout
//!
//! - [`parser`]: pure annotation parsing, including malformed-bracket repair
//! - [`repository`]: character, appearance and credit persistence
//! - [`extractor`]: one source row to destination records
//! - [`pipeline`]: paged source reading and the resumable batch driver
//! - [`progress`]: the durable per-extraction-type resume cursor
//!
//! # Example
//!
//! ```no_run
//! use gcd_extract::config::ExtractConfig;
//! use gcd_extract::{db, passes};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExtractConfig::from_env()?;
//!     let pool = db::create_pool(&config).await?;
//!     let summary = passes::run_character_pass(&pool, &config).await?;
//!     println!("{} rows processed", summary.rows_processed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod extractor;
pub mod models;
pub mod parser;
pub mod passes;
pub mod pipeline;
pub mod progress;
pub mod repository;
