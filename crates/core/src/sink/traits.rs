//! Trait definitions for request sinks.

use async_trait::async_trait;

use super::SubmissionError;
use crate::item::Item;

/// Accepts one item at a time and reports whether dispatch succeeded.
#[async_trait]
pub trait RequestSink: Send + Sync {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Submit one item. Retries and timeouts, if any, happen in here.
    async fn submit(&self, item: &Item) -> Result<(), SubmissionError>;
}
