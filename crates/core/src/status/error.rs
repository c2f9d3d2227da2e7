//! Error types for the status module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or persisting item status.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Reading or writing the backing file failed.
    #[error("status I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be encoded or decoded.
    #[error("status serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("status database error: {0}")]
    Database(String),

    /// A stored state value is not one we know.
    #[error("unknown item state: {0}")]
    UnknownState(String),
}

impl StatusError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<rusqlite::Error> for StatusError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
