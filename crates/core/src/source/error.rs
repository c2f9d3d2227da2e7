//! Error types for item sources.

use std::path::PathBuf;
use thiserror::Error;

/// A source could not be listed or read.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source does not exist.
    #[error("source not found: {0}")]
    NotFound(String),

    /// Filesystem error while listing or opening.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content could not be parsed.
    #[error("malformed source {source_id}: {message}")]
    Malformed { source_id: String, message: String },

    /// A required header column is absent.
    #[error("source {source_id} has no '{column}' column")]
    MissingColumn { source_id: String, column: String },

    /// The file-name pattern is not a valid regex.
    #[error("invalid source file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
