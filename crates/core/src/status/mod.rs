//! Durable per-item lifecycle state.
//!
//! [`StatusStore`] keeps the full `domain -> {id, state}` mapping in memory and
//! tracks which keys changed since the last flush. Persistence is delegated to
//! a [`StatusBackend`]:
//!
//! - [`JsonFileBackend`] rewrites one JSON document via write-then-rename
//! - [`SqliteBackend`] upserts changed rows inside a single transaction
//!
//! A missing or unreadable backing store is never fatal on load; the run just
//! starts fresh. A failed flush keeps the dirty keys so the next flush retries them.

mod error;
mod json_file;
mod sqlite;
mod store;
mod traits;
mod types;

pub use error::StatusError;
pub use json_file::JsonFileBackend;
pub use sqlite::SqliteBackend;
pub use store::StatusStore;
pub use traits::StatusBackend;
pub use types::{ItemRecord, ItemState};

use crate::config::{StatusBackendKind, StatusConfig};

/// Open the store selected by `config.backend`. Existing state is not read yet.
pub fn open_store(config: &StatusConfig) -> Result<StatusStore, StatusError> {
    match config.backend {
        StatusBackendKind::Json => Ok(StatusStore::new(JsonFileBackend::new(&config.path))),
        StatusBackendKind::Sqlite => Ok(StatusStore::new(SqliteBackend::new(&config.path)?)),
    }
}
