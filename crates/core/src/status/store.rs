//! In-memory status mapping with dirty tracking.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use super::{ItemRecord, ItemState, StatusBackend, StatusError};
use crate::item::ItemId;
use crate::metrics::STATUS_FLUSHES;

/// Single-writer view of every domain's lifecycle state.
///
/// Mutations are in-memory only; [`StatusStore::flush`] publishes them.
pub struct StatusStore {
    backend: Box<dyn StatusBackend>,
    entries: HashMap<String, ItemRecord>,
    dirty: BTreeSet<String>,
}

impl StatusStore {
    /// Create an empty store over `backend`. Call [`StatusStore::load`] to read existing state.
    pub fn new(backend: impl StatusBackend + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    pub fn from_boxed(backend: Box<dyn StatusBackend>) -> Self {
        Self {
            backend,
            entries: HashMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Replace the in-memory mapping with what the backend holds.
    ///
    /// Missing or corrupt storage is logged and treated as a fresh run.
    /// Returns the number of records loaded.
    pub async fn load(&mut self) -> usize {
        self.dirty.clear();
        match self.backend.read_all().await {
            Ok(entries) => {
                self.entries = entries;
                info!(
                    backend = self.backend.name(),
                    records = self.entries.len(),
                    "Loaded item status"
                );
            }
            Err(e) => {
                warn!(
                    backend = self.backend.name(),
                    "Could not load item status, starting fresh: {}", e
                );
                self.entries = HashMap::new();
            }
        }
        self.entries.len()
    }

    pub fn get(&self, domain: &str) -> Option<&ItemRecord> {
        self.entries.get(domain)
    }

    pub fn state(&self, domain: &str) -> Option<ItemState> {
        self.entries.get(domain).map(|r| r.state)
    }

    /// True only when the stored state is exactly `processed`.
    pub fn is_completed(&self, domain: &str) -> bool {
        self.state(domain) == Some(ItemState::Processed)
    }

    /// Upsert a domain's state. Marks the store dirty when the record changes.
    pub fn record(&mut self, domain: &str, id: ItemId, state: ItemState) {
        let record = ItemRecord { id, state };
        if self.entries.get(domain) == Some(&record) {
            return;
        }
        self.entries.insert(domain.to_string(), record);
        self.dirty.insert(domain.to_string());
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &HashMap<String, ItemRecord> {
        &self.entries
    }

    /// Persist pending changes.
    ///
    /// Returns `Ok(false)` without touching the backend when nothing changed.
    /// On failure the dirty keys are kept so the next call retries them.
    pub async fn flush(&mut self) -> Result<bool, StatusError> {
        if self.dirty.is_empty() {
            return Ok(false);
        }

        let changed: Vec<String> = self.dirty.iter().cloned().collect();
        match self.backend.persist(&self.entries, &changed).await {
            Ok(()) => {
                debug!(
                    backend = self.backend.name(),
                    changed = changed.len(),
                    "Flushed item status"
                );
                self.dirty.clear();
                STATUS_FLUSHES.with_label_values(&["success"]).inc();
                Ok(true)
            }
            Err(e) => {
                STATUS_FLUSHES.with_label_values(&["failure"]).inc();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStatusBackend;

    #[tokio::test]
    async fn test_flush_is_noop_when_clean() {
        let backend = MockStatusBackend::new();
        let mut store = StatusStore::new(backend.clone());
        store.load().await;

        assert!(!store.is_dirty());
        assert!(!store.flush().await.unwrap());
        assert_eq!(backend.persist_count(), 0);
    }

    #[tokio::test]
    async fn test_record_marks_dirty_and_flush_clears() {
        let backend = MockStatusBackend::new();
        let mut store = StatusStore::new(backend.clone());

        store.record("a.com", ItemId::Number(1), ItemState::Processed);
        assert!(store.is_dirty());
        assert!(store.flush().await.unwrap());
        assert!(!store.is_dirty());
        assert_eq!(backend.persist_count(), 1);
        assert_eq!(backend.last_changed(), vec!["a.com".to_string()]);
        assert_eq!(
            backend.snapshot().get("a.com").map(|r| r.state),
            Some(ItemState::Processed)
        );
    }

    #[tokio::test]
    async fn test_rerecording_same_value_stays_clean() {
        let backend = MockStatusBackend::new();
        let mut store = StatusStore::new(backend.clone());
        store.record("a.com", ItemId::Number(1), ItemState::Processed);
        store.flush().await.unwrap();

        store.record("a.com", ItemId::Number(1), ItemState::Processed);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_changes_for_retry() {
        let backend = MockStatusBackend::new();
        let mut store = StatusStore::new(backend.clone());
        store.record("a.com", ItemId::Number(1), ItemState::Failed);

        backend.set_fail_persist(true);
        assert!(store.flush().await.is_err());
        assert!(store.is_dirty());

        backend.set_fail_persist(false);
        assert!(store.flush().await.unwrap());
        assert_eq!(
            backend.snapshot().get("a.com").map(|r| r.state),
            Some(ItemState::Failed)
        );
    }

    #[tokio::test]
    async fn test_load_failure_starts_fresh() {
        let backend = MockStatusBackend::new();
        backend.set_fail_read(true);
        let mut store = StatusStore::new(backend);

        assert_eq!(store.load().await, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_is_completed_only_for_processed() {
        let mut store = StatusStore::new(MockStatusBackend::new());
        store.record("ok.com", ItemId::Number(1), ItemState::Processed);
        store.record("bad.com", ItemId::Number(2), ItemState::Failed);
        store.record("wait.com", ItemId::Number(3), ItemState::Pending);

        assert!(store.is_completed("ok.com"));
        assert!(!store.is_completed("bad.com"));
        assert!(!store.is_completed("wait.com"));
        assert!(!store.is_completed("unknown.com"));
    }
}
