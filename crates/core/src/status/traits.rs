//! Trait definitions for status persistence.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{ItemRecord, StatusError};

/// Durable storage behind a [`super::StatusStore`].
///
/// Implementations must make `persist` all-or-nothing: after a crash the next
/// `read_all` sees either the previous or the new content, never a mix that
/// fails to parse.
#[async_trait]
pub trait StatusBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Read the whole mapping. A backing store that does not exist yet yields an empty map.
    async fn read_all(&self) -> Result<HashMap<String, ItemRecord>, StatusError>;

    /// Persist `entries`. `changed` lists the keys modified since the last
    /// successful persist, for backends that can write incrementally.
    async fn persist(
        &self,
        entries: &HashMap<String, ItemRecord>,
        changed: &[String],
    ) -> Result<(), StatusError>;
}
