//! CLI error type.

use std::path::PathBuf;

use resrepo::{QualifierError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid qualifiers '{qualifiers}': {source}")]
    Qualifiers {
        qualifiers: String,
        #[source]
        source: QualifierError,
    },

    #[error("Unknown resource type '{0}'")]
    UnknownType(String),

    #[error("Resource not found: @{resource_type}/{name}")]
    NotFound { resource_type: String, name: String },

    #[error("Failed to clear cache file {}: {source}", path.display())]
    CacheClear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write JSON output: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => 2,
            _ => 1,
        }
    }
}
