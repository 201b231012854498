//! Error types shared by the GCD tools

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for GCD operations
pub type Result<T> = std::result::Result<T, GcdError>;

/// Main error type for GCD
#[derive(Error, Debug)]
pub enum GcdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Progress file {path} is unreadable: {reason}")]
    ProgressState { path: PathBuf, reason: String },

    #[error("Failed to persist progress to {path}: {source}")]
    ProgressPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GcdError {
    /// Shorthand for configuration errors
    pub fn config(message: impl Into<String>) -> Self {
        GcdError::Config(message.into())
    }
}
