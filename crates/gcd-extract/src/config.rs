//! Extraction configuration
//!
//! Read from the environment (and `.env`), then overridden per run by CLI
//! flags. Schema names end up inside SQL text, so they are checked here
//! before anything connects.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use gcd_common::GcdError;

use crate::repository::{validate_schema, SchemaNames};

pub const DEFAULT_SOURCE_SCHEMA: &str = "gcd";
pub const DEFAULT_BATCH_SIZE: u32 = 1000;
pub const DEFAULT_PROGRESS_FILE: &str = "progress.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Required only by commands that touch the database
    pub database_url: Option<String>,
    pub source_schema: String,
    /// Defaults to the source schema
    pub target_schema: String,
    /// Defaults to the target schema
    pub primary_schema: String,
    /// Rows per page
    pub batch_size: u32,
    pub progress_file: PathBuf,
    /// Watermark for a run with no saved cursor
    pub start_id: i64,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            source_schema: DEFAULT_SOURCE_SCHEMA.to_string(),
            target_schema: DEFAULT_SOURCE_SCHEMA.to_string(),
            primary_schema: DEFAULT_SOURCE_SCHEMA.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_file: PathBuf::from(DEFAULT_PROGRESS_FILE),
            start_id: 0,
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

impl ExtractConfig {
    /// Load configuration from environment variables, after `.env`
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let source_schema = lookup("EXTRACT_SOURCE_SCHEMA").unwrap_or(defaults.source_schema);
        let target_schema =
            lookup("EXTRACT_TARGET_SCHEMA").unwrap_or_else(|| source_schema.clone());
        let primary_schema =
            lookup("EXTRACT_PRIMARY_SCHEMA").unwrap_or_else(|| target_schema.clone());

        let config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            source_schema,
            target_schema,
            primary_schema,
            batch_size: parse_var(&lookup, "EXTRACT_BATCH_SIZE").unwrap_or(defaults.batch_size),
            progress_file: lookup("EXTRACT_PROGRESS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.progress_file),
            start_id: parse_var(&lookup, "EXTRACT_START_ID").unwrap_or(defaults.start_id),
            max_connections: parse_var(&lookup, "EXTRACT_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            acquire_timeout_secs: parse_var(&lookup, "EXTRACT_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or(defaults.acquire_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            return Err(GcdError::config("EXTRACT_BATCH_SIZE must be greater than 0").into());
        }
        if self.max_connections == 0 {
            return Err(GcdError::config("EXTRACT_MAX_CONNECTIONS must be greater than 0").into());
        }
        if self.start_id < 0 {
            return Err(GcdError::config("EXTRACT_START_ID must not be negative").into());
        }
        for (var, schema) in [
            ("EXTRACT_SOURCE_SCHEMA", &self.source_schema),
            ("EXTRACT_TARGET_SCHEMA", &self.target_schema),
            ("EXTRACT_PRIMARY_SCHEMA", &self.primary_schema),
        ] {
            validate_schema(schema)
                .with_context(|| format!("{var} must be a plain SQL identifier"))?;
        }
        Ok(())
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL not set")
    }

    pub fn schemas(&self) -> SchemaNames {
        SchemaNames {
            source: self.source_schema.clone(),
            target: self.target_schema.clone(),
            primary: self.primary_schema.clone(),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<ExtractConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ExtractConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, ExtractConfig::default());
        assert!(config.database_url().is_err());
    }

    #[test]
    fn test_schema_defaults_cascade() {
        let config = load(&[("EXTRACT_SOURCE_SCHEMA", "gcd_2024")]).unwrap();
        assert_eq!(config.target_schema, "gcd_2024");
        assert_eq!(config.primary_schema, "gcd_2024");

        let config = load(&[
            ("EXTRACT_SOURCE_SCHEMA", "gcd_2024"),
            ("EXTRACT_TARGET_SCHEMA", "gcd_staging"),
        ])
        .unwrap();
        assert_eq!(config.primary_schema, "gcd_staging");
    }

    #[test]
    fn test_values_from_env() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/gcd"),
            ("EXTRACT_BATCH_SIZE", "250"),
            ("EXTRACT_PROGRESS_FILE", "/var/lib/gcd/progress.json"),
            ("EXTRACT_START_ID", "1200"),
        ])
        .unwrap();

        assert_eq!(config.database_url().unwrap(), "postgresql://localhost/gcd");
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.progress_file, PathBuf::from("/var/lib/gcd/progress.json"));
        assert_eq!(config.start_id, 1200);
    }

    #[test]
    fn test_validation() {
        assert!(load(&[("EXTRACT_BATCH_SIZE", "0")]).is_err());
        assert!(load(&[("EXTRACT_MAX_CONNECTIONS", "0")]).is_err());

        let err = load(&[("EXTRACT_TARGET_SCHEMA", "gcd; drop")]).unwrap_err();
        assert!(err.to_string().contains("EXTRACT_TARGET_SCHEMA"));
    }
}
