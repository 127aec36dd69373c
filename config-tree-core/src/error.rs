use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration source: {0}")]
    InvalidSource(String),

    #[error("referenced document not found: {}", path.display())]
    ReferenceNotFound { path: PathBuf },

    #[error("reference cycle detected: {}", format_chain(chain))]
    ReferenceCycle { chain: Vec<PathBuf> },

    #[error("override path '{0}' would replace the configuration root")]
    RootReplacementRejected(String),

    #[error("invalid override path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("schema file not found (searched: {})", format_chain(candidates))]
    SchemaNotFound { candidates: Vec<PathBuf> },

    #[error("configuration validation error at '{location}': {message}")]
    SchemaValidation { location: String, message: String },

    #[error("configuration objects cannot be modified directly (key '{0}')")]
    ImmutableWriteRejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to parse '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn format_chain(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
