//! Trait definitions for item sources.

use async_trait::async_trait;

use super::SourceError;
use crate::item::Item;

/// Produces ordered item sequences from named inputs.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Identifiers of every input this source can read, in processing order.
    async fn list_sources(&self) -> Result<Vec<String>, SourceError>;

    /// Read one input. Fails on unreadable or malformed input.
    async fn read_items(&self, source_id: &str) -> Result<Vec<Item>, SourceError>;
}
