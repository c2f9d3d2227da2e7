//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator of the dispatch engine, so runs can be
//! exercised without files, databases or a downstream service.
//!
//! # Example
//!
//! ```rust,ignore
//! use dispatcher_core::testing::{fixtures, MockRequestSink, MockSource, MockStatusBackend};
//!
//! let source = MockSource::new().with_source("s1", fixtures::items(&["a.com", "b.com"]));
//! let sink = MockRequestSink::new();
//! sink.fail_domain("b.com");
//! let backend = MockStatusBackend::new();
//! ```

mod mock_sink;
mod mock_source;
mod mock_status_backend;

pub use mock_sink::{MockRequestSink, RecordedSubmission};
pub use mock_source::MockSource;
pub use mock_status_backend::MockStatusBackend;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::item::Item;

    /// Items with ids 1..=n for the given domains.
    pub fn items(domains: &[&str]) -> Vec<Item> {
        domains
            .iter()
            .enumerate()
            .map(|(i, domain)| Item::new(i as u64 + 1, *domain))
            .collect()
    }

    /// `count` items named `d0.com`, `d1.com`, ...
    pub fn numbered_items(count: usize) -> Vec<Item> {
        (0..count)
            .map(|i| Item::new(i as u64 + 1, format!("d{}.com", i)))
            .collect()
    }

    /// CSV text in the layout of a domain export.
    pub fn csv(rows: &[(&str, &str)]) -> String {
        let mut out = String::from("id,domain\n");
        for (id, domain) in rows {
            out.push_str(&format!("{},{}\n", id, domain));
        }
        out
    }
}
