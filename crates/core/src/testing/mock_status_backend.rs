//! Mock status backend for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::status::{ItemRecord, StatusBackend, StatusError};

/// In-memory [`StatusBackend`] that records what was persisted.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// [`StatusStore`](crate::status::StatusStore).
#[derive(Debug, Clone, Default)]
pub struct MockStatusBackend {
    stored: Arc<Mutex<HashMap<String, ItemRecord>>>,
    persist_count: Arc<Mutex<usize>>,
    last_changed: Arc<Mutex<Vec<String>>>,
    fail_persist: Arc<Mutex<bool>>,
    fail_read: Arc<Mutex<bool>>,
}

impl MockStatusBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persisted record, as if written by an earlier run.
    pub fn insert(&self, domain: &str, record: ItemRecord) {
        self.stored.lock().unwrap().insert(domain.to_string(), record);
    }

    /// Everything persisted so far.
    pub fn snapshot(&self) -> HashMap<String, ItemRecord> {
        self.stored.lock().unwrap().clone()
    }

    pub fn persist_count(&self) -> usize {
        *self.persist_count.lock().unwrap()
    }

    /// Keys passed to the most recent successful persist.
    pub fn last_changed(&self) -> Vec<String> {
        self.last_changed.lock().unwrap().clone()
    }

    pub fn set_fail_persist(&self, fail: bool) {
        *self.fail_persist.lock().unwrap() = fail;
    }

    pub fn set_fail_read(&self, fail: bool) {
        *self.fail_read.lock().unwrap() = fail;
    }
}

#[async_trait]
impl StatusBackend for MockStatusBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read_all(&self) -> Result<HashMap<String, ItemRecord>, StatusError> {
        if *self.fail_read.lock().unwrap() {
            return Err(StatusError::Database("mock read failure".to_string()));
        }
        Ok(self.snapshot())
    }

    async fn persist(
        &self,
        entries: &HashMap<String, ItemRecord>,
        changed: &[String],
    ) -> Result<(), StatusError> {
        if *self.fail_persist.lock().unwrap() {
            return Err(StatusError::Database("mock persist failure".to_string()));
        }

        let mut stored = self.stored.lock().unwrap();
        for key in changed {
            if let Some(record) = entries.get(key) {
                stored.insert(key.clone(), record.clone());
            }
        }
        *self.persist_count.lock().unwrap() += 1;
        *self.last_changed.lock().unwrap() = changed.to_vec();
        Ok(())
    }
}
