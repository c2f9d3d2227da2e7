//! Mock request sink for testing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::item::Item;
use crate::sink::{RequestSink, SubmissionError};

/// A recorded submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub item: Item,
    pub success: bool,
}

/// Mock implementation of [`RequestSink`].
///
/// Provides controllable behavior for testing:
/// - Records every submission in arrival order
/// - Fails chosen domains
/// - Simulates latency and tracks peak concurrency
/// - Cancels a token after N submissions have started
#[derive(Debug, Clone, Default)]
pub struct MockRequestSink {
    submissions: Arc<Mutex<Vec<RecordedSubmission>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
    cancel_after: Arc<Mutex<Option<(usize, CancellationToken)>>>,
}

impl MockRequestSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every submission for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject submissions for `domain`.
    pub fn fail_domain(&self, domain: &str) {
        self.failing.lock().unwrap().insert(domain.to_string());
    }

    /// Stop rejecting `domain`.
    pub fn recover_domain(&self, domain: &str) {
        self.failing.lock().unwrap().remove(domain);
    }

    /// Cancel `token` once `count` submissions have started.
    pub fn cancel_after(&self, count: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((count, token));
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submitted_domains(&self) -> Vec<String> {
        self.submissions()
            .into_iter()
            .map(|s| s.item.domain)
            .collect()
    }

    pub fn submit_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    /// Peak number of submissions in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestSink for MockRequestSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, item: &Item) -> Result<(), SubmissionError> {
        let started = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if started >= *count {
                token.cancel();
            }
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let success = !self.failing.lock().unwrap().contains(&item.domain);
        self.submissions.lock().unwrap().push(RecordedSubmission {
            item: item.clone(),
            success,
        });

        if success {
            Ok(())
        } else {
            Err(SubmissionError::Rejected {
                status: 500,
                body: "mock failure".to_string(),
            })
        }
    }
}
