//! Mock item source for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::item::Item;
use crate::source::{ItemSource, SourceError};

/// In-memory [`ItemSource`] with scripted failures.
///
/// Sources are listed in the order they were added.
///
/// # Example
///
/// ```rust,ignore
/// use dispatcher_core::testing::MockSource;
///
/// let source = MockSource::new()
///     .with_source("domains_1.csv", items)
///     .with_failing_source("domains_2.csv");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    order: Arc<Mutex<Vec<String>>>,
    /// `None` marks a source that fails to read.
    sources: Arc<Mutex<HashMap<String, Option<Vec<Item>>>>>,
    reads: Arc<Mutex<HashMap<String, usize>>>,
    fail_listing: Arc<Mutex<bool>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a readable source.
    pub fn with_source(self, id: &str, items: Vec<Item>) -> Self {
        self.add(id, Some(items));
        self
    }

    /// Add a source whose reads always fail.
    pub fn with_failing_source(self, id: &str) -> Self {
        self.add(id, None);
        self
    }

    /// Make `list_sources` fail.
    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    /// How many times `id` was read.
    pub fn read_count(&self, id: &str) -> usize {
        self.reads.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    fn add(&self, id: &str, items: Option<Vec<Item>>) {
        let mut order = self.order.lock().unwrap();
        if !order.iter().any(|existing| existing == id) {
            order.push(id.to_string());
        }
        self.sources.lock().unwrap().insert(id.to_string(), items);
    }
}

#[async_trait]
impl ItemSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_sources(&self) -> Result<Vec<String>, SourceError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(SourceError::NotFound("mock listing failure".to_string()));
        }
        Ok(self.order.lock().unwrap().clone())
    }

    async fn read_items(&self, source_id: &str) -> Result<Vec<Item>, SourceError> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(source_id.to_string())
            .or_default() += 1;

        match self.sources.lock().unwrap().get(source_id) {
            Some(Some(items)) => Ok(items.clone()),
            Some(None) => Err(SourceError::Malformed {
                source_id: source_id.to_string(),
                message: "mock read failure".to_string(),
            }),
            None => Err(SourceError::NotFound(source_id.to_string())),
        }
    }
}
