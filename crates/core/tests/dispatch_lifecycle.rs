//! Dispatch lifecycle integration tests.
//!
//! These tests drive whole runs through the engine with mock collaborators:
//! first run -> resumed run -> idempotent rerun, plus ceilings and cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dispatcher_core::{
    testing::{fixtures, MockRequestSink, MockSource, MockStatusBackend},
    DispatchConfig, DispatchEngine, DispatchEvent, ItemState, StatusStore, StopReason,
};

/// Shared collaborators; every engine built from one harness sees the same
/// downstream and the same persisted status.
struct TestHarness {
    source: MockSource,
    sink: MockRequestSink,
    backend: MockStatusBackend,
}

impl TestHarness {
    fn new(source: MockSource) -> Self {
        Self {
            source,
            sink: MockRequestSink::new(),
            backend: MockStatusBackend::new(),
        }
    }

    /// A fresh engine, as a new process would build it.
    fn engine(&self, config: DispatchConfig) -> DispatchEngine {
        DispatchEngine::new(
            config,
            Arc::new(self.source.clone()),
            Arc::new(self.sink.clone()),
            StatusStore::new(self.backend.clone()),
        )
        .expect("Failed to create engine")
    }
}

#[tokio::test]
async fn test_failed_item_is_retried_on_next_run() {
    let harness = TestHarness::new(
        MockSource::new().with_source("s1", fixtures::items(&["a.com", "b.com", "c.com"])),
    );
    harness.sink.fail_domain("b.com");

    let first = harness
        .engine(DispatchConfig::default())
        .run()
        .await
        .unwrap();
    assert_eq!(first.counters.processed, 2);
    assert_eq!(first.counters.failed, 1);
    assert_eq!(harness.backend.snapshot()["b.com"].state, ItemState::Failed);

    harness.sink.recover_domain("b.com");
    let second = harness
        .engine(DispatchConfig::default())
        .run()
        .await
        .unwrap();
    assert_eq!(second.counters.total_submitted, 1);
    assert_eq!(second.counters.skipped, 2);
    assert_eq!(second.counters.processed, 1);
    assert_eq!(
        harness.backend.snapshot()["b.com"].state,
        ItemState::Processed
    );
}

#[tokio::test]
async fn test_rerun_after_success_submits_nothing() {
    let harness = TestHarness::new(
        MockSource::new().with_source("s1", fixtures::items(&["a.com", "b.com", "c.com"])),
    );

    harness
        .engine(DispatchConfig::default())
        .run()
        .await
        .unwrap();
    let persisted = harness.backend.persist_count();

    let rerun = harness
        .engine(DispatchConfig::default())
        .run()
        .await
        .unwrap();
    assert_eq!(rerun.stop_reason, StopReason::Completed);
    assert_eq!(rerun.counters.total_submitted, 0);
    assert_eq!(rerun.counters.skipped, 3);
    assert_eq!(harness.sink.submit_count(), 3);
    // Nothing changed, so nothing was written.
    assert_eq!(harness.backend.persist_count(), persisted);
}

#[tokio::test]
async fn test_ceiling_then_resume_covers_every_item_once() {
    let harness = TestHarness::new(
        MockSource::new()
            .with_source("s1", fixtures::numbered_items(5))
            .with_source("s2", fixtures::items(&["x.com", "y.com"])),
    );

    let capped = DispatchConfig {
        max_concurrent_per_source: Some(2),
        global_item_ceiling: Some(3),
        ..Default::default()
    };
    let first = harness.engine(capped).run().await.unwrap();
    assert_eq!(first.stop_reason, StopReason::CeilingReached);
    assert_eq!(first.counters.total_submitted, 3);
    // The second source is never read once the ceiling is hit.
    assert_eq!(harness.source.read_count("s2"), 0);

    let second = harness
        .engine(DispatchConfig::default())
        .run()
        .await
        .unwrap();
    assert_eq!(second.stop_reason, StopReason::Completed);
    assert_eq!(second.counters.skipped, 3);
    assert_eq!(second.counters.total_submitted, 4);

    let mut submitted = harness.sink.submitted_domains();
    let total = submitted.len();
    submitted.sort();
    submitted.dedup();
    assert_eq!(total, 7);
    assert_eq!(submitted.len(), 7);
}

#[tokio::test]
async fn test_ceiling_equal_to_work_completes() {
    let harness =
        TestHarness::new(MockSource::new().with_source("s1", fixtures::numbered_items(4)));

    let config = DispatchConfig {
        global_item_ceiling: Some(4),
        ..Default::default()
    };
    let summary = harness.engine(config).run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::Completed);
    assert_eq!(summary.counters.total_submitted, 4);
}

#[tokio::test]
async fn test_cancellation_drains_in_flight_chunk() {
    let token = CancellationToken::new();
    let harness =
        TestHarness::new(MockSource::new().with_source("s1", fixtures::numbered_items(9)));
    let sink = MockRequestSink::new().with_delay(Duration::from_millis(20));
    sink.cancel_after(2, token.clone());
    let harness = TestHarness { sink, ..harness };

    let config = DispatchConfig {
        max_concurrent_per_source: Some(3),
        ..Default::default()
    };
    let summary = harness
        .engine(config)
        .with_cancellation(token)
        .run()
        .await
        .unwrap();

    // The chunk that was running when cancellation arrived finished in full.
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.counters.total_submitted, 3);
    assert_eq!(summary.counters.processed, 3);
    assert_eq!(summary.counters.pending, 6);
    assert_eq!(harness.sink.submit_count(), 3);
    assert_eq!(harness.backend.snapshot().len(), 3);
    assert!(!summary.degraded);
}

#[tokio::test]
async fn test_sized_window_covers_small_backlog() {
    let harness =
        TestHarness::new(MockSource::new().with_source("s1", fixtures::numbered_items(25)));
    let sink = MockRequestSink::new().with_delay(Duration::from_millis(5));
    let harness = TestHarness { sink, ..harness };

    // 25 items at the default average size fit one chunk of 10.
    harness
        .engine(DispatchConfig::default())
        .run()
        .await
        .unwrap();
    assert_eq!(harness.sink.submit_count(), 25);
    assert_eq!(harness.sink.max_in_flight(), 10);
    assert_eq!(harness.backend.persist_count(), 3);
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let source = MockSource::new();
    source.set_fail_listing(true);
    let harness = TestHarness::new(source);

    let finished = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&finished);
    let result = harness
        .engine(DispatchConfig::default())
        .with_observer(Arc::new(move |event: &DispatchEvent| {
            if let DispatchEvent::RunFinished { summary } = event {
                recorded.lock().unwrap().push(summary.clone());
            }
        }))
        .run()
        .await;

    assert!(matches!(
        result,
        Err(dispatcher_core::DispatchError::Listing(_))
    ));
    let finished = finished.lock().unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].counters.total_seen, 0);
    assert_eq!(harness.sink.submit_count(), 0);
}
