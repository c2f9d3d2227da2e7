//! Chunked, resumable dispatch of items to a request sink.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{
    DispatchError, DispatchEvent, EventCallback, RunCounters, RunSummary, StopReason,
};
use super::DispatchConfig;
use crate::item::Item;
use crate::metrics::{CHUNK_SIZE, ITEMS_SKIPPED, SOURCES, SUBMISSIONS, SUBMISSION_DURATION};
use crate::progress::progress;
use crate::sink::RequestSink;
use crate::sizer::BatchSizer;
use crate::source::ItemSource;
use crate::status::{ItemState, StatusStore};

/// Mutable state of one run.
struct RunState {
    started_at: DateTime<Utc>,
    clock: Instant,
    counters: RunCounters,
    /// Domains already claimed by this run.
    claimed: HashSet<String>,
    last_reported: u64,
    ceiling_announced: bool,
    sources_read: usize,
    sources_failed: usize,
}

impl RunState {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            clock: Instant::now(),
            counters: RunCounters::default(),
            claimed: HashSet::new(),
            last_reported: 0,
            ceiling_announced: false,
            sources_read: 0,
            sources_failed: 0,
        }
    }
}

/// Sends every unsatisfied item of every source to the sink.
///
/// The engine is the only writer of its [`StatusStore`]. Each chunk runs its
/// submissions concurrently; outcomes are recorded and flushed before the next
/// chunk begins, so a crash loses at most one chunk of bookkeeping.
pub struct DispatchEngine {
    config: DispatchConfig,
    sizer: BatchSizer,
    source: Arc<dyn ItemSource>,
    sink: Arc<dyn RequestSink>,
    status: StatusStore,
    status_loaded: bool,
    observer: Option<EventCallback>,
    cancel: CancellationToken,
}

impl DispatchEngine {
    pub fn new(
        config: DispatchConfig,
        source: Arc<dyn ItemSource>,
        sink: Arc<dyn RequestSink>,
        status: StatusStore,
    ) -> Result<Self, DispatchError> {
        let sizer = BatchSizer::new(config.max_aggregate_batch_bytes)?;
        if config.default_average_item_bytes == 0 {
            return Err(DispatchError::InvalidConfiguration(
                "default_average_item_bytes must be greater than 0".to_string(),
            ));
        }
        if config.max_concurrent_per_source == Some(0) {
            return Err(DispatchError::InvalidConfiguration(
                "max_concurrent_per_source must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            config,
            sizer,
            source,
            sink,
            status,
            status_loaded: false,
            observer: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Receive [`DispatchEvent`]s as the run progresses.
    pub fn with_observer(mut self, observer: EventCallback) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stop starting new chunks once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    pub fn into_status(self) -> StatusStore {
        self.status
    }

    /// Read persisted status from the backend.
    ///
    /// Runs implicitly on the first [`run`](Self::run); later runs reuse the
    /// in-memory mapping so unflushed records are not lost.
    pub async fn load_status(&mut self) -> usize {
        let loaded = self.status.load().await;
        self.status_loaded = true;
        loaded
    }

    /// Flush pending status changes. Returns whether anything was written.
    pub async fn flush_status(&mut self) -> Result<bool, crate::status::StatusError> {
        self.status.flush().await
    }

    /// Dispatch every source the item source lists.
    pub async fn run(&mut self) -> Result<RunSummary, DispatchError> {
        let source_ids = match self.source.list_sources().await {
            Ok(source_ids) => source_ids,
            Err(e) => {
                warn!(source = self.source.name(), "Could not list sources: {}", e);
                self.finish(&RunState::new(), StopReason::Completed);
                return Err(e.into());
            }
        };
        self.run_sources(&source_ids).await
    }

    /// Dispatch the given sources in order.
    pub async fn run_sources(
        &mut self,
        source_ids: &[String],
    ) -> Result<RunSummary, DispatchError> {
        if !self.status_loaded {
            self.load_status().await;
        }

        let mut state = RunState::new();
        info!(
            sources = source_ids.len(),
            source = self.source.name(),
            sink = self.sink.name(),
            ceiling = ?self.config.global_item_ceiling,
            "Dispatch run starting"
        );
        self.emit(DispatchEvent::RunStarted {
            sources: source_ids.len(),
        });

        let stop_reason = self.dispatch_sources(source_ids, &mut state).await;

        // Catch up on any flush that failed along the way.
        if self.status.is_dirty() {
            self.flush_after_chunk().await;
        }
        if state.last_reported != state.counters.completed() {
            self.report_progress(&mut state);
        }

        let summary = self.finish(&state, stop_reason);
        if state.sources_read == 0 && state.sources_failed > 0 {
            return Err(DispatchError::NoReadableSources {
                attempted: state.sources_failed,
            });
        }
        Ok(summary)
    }

    /// Log the summary line and publish `RunFinished`.
    fn finish(&self, state: &RunState, stop_reason: StopReason) -> RunSummary {
        let summary = RunSummary {
            counters: state.counters,
            elapsed_ms: state.clock.elapsed().as_millis() as u64,
            stop_reason,
            degraded: self.status.is_dirty(),
            sources_read: state.sources_read,
            sources_failed: state.sources_failed,
        };

        let c = &summary.counters;
        info!(
            total = c.total_seen,
            submitted = c.total_submitted,
            processed = c.processed,
            failed = c.failed,
            skipped = c.skipped,
            pending = c.pending,
            stop_reason = ?summary.stop_reason,
            degraded = summary.degraded,
            "Completed {} of {} items in {}",
            c.completed(),
            c.total_seen,
            summary.elapsed_formatted()
        );
        self.emit(DispatchEvent::RunFinished {
            summary: summary.clone(),
        });
        summary
    }

    async fn dispatch_sources(
        &mut self,
        source_ids: &[String],
        state: &mut RunState,
    ) -> StopReason {
        for source_id in source_ids {
            if let Some(reason) = self.stop_requested(state) {
                return reason;
            }

            let items = match self.source.read_items(source_id).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(source_id = %source_id, "Skipping unreadable source: {}", e);
                    SOURCES.with_label_values(&["failed"]).inc();
                    state.sources_failed += 1;
                    self.emit(DispatchEvent::SourceFailed {
                        source_id: source_id.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            SOURCES.with_label_values(&["read"]).inc();
            state.sources_read += 1;

            let seen = items.len();
            state.counters.total_seen += seen as u64;
            let to_submit = self.claim_unsatisfied(items, state);
            state.counters.refresh_pending();

            if to_submit.is_empty() {
                info!(source_id = %source_id, items = seen, "Nothing to submit");
                continue;
            }

            let window = match self.window(state.counters.total_seen) {
                Ok(window) => window,
                Err(e) => {
                    // Unreachable with a validated config; fall back to serial dispatch.
                    warn!("Could not size window, using 1: {}", e);
                    1
                }
            };
            info!(
                source_id = %source_id,
                items = seen,
                to_submit = to_submit.len(),
                window,
                "Dispatching source"
            );
            self.emit(DispatchEvent::SourceStarted {
                source_id: source_id.clone(),
                items: seen,
                to_submit: to_submit.len(),
                window,
            });

            let mut offset = 0;
            while offset < to_submit.len() {
                if let Some(reason) = self.stop_requested(state) {
                    return reason;
                }
                let take = match self.remaining_allowance(&state.counters) {
                    Some(allowance) => window.min(allowance as usize),
                    None => window,
                };
                let end = (offset + take).min(to_submit.len());

                self.dispatch_chunk(&to_submit[offset..end], state).await;
                offset = end;

                self.flush_after_chunk().await;
                self.maybe_report_progress(state);
            }
        }
        StopReason::Completed
    }

    /// Drop items that are already satisfied or claimed earlier in this run.
    fn claim_unsatisfied(&self, items: Vec<Item>, state: &mut RunState) -> Vec<Item> {
        let mut to_submit = Vec::with_capacity(items.len());
        for item in items {
            if self.is_satisfied(&item.domain) || !state.claimed.insert(item.domain.clone()) {
                debug!(domain = %item.domain, "Skipping item");
                state.counters.skipped += 1;
                ITEMS_SKIPPED.inc();
                continue;
            }
            to_submit.push(item);
        }
        to_submit
    }

    fn is_satisfied(&self, domain: &str) -> bool {
        match self.status.state(domain) {
            Some(ItemState::Processed) => true,
            Some(ItemState::Failed) => !self.config.retry_failed,
            Some(ItemState::Pending) | None => false,
        }
    }

    fn window(&self, backlog: u64) -> Result<usize, crate::sizer::SizerError> {
        match self.config.max_concurrent_per_source {
            Some(fixed) => Ok(fixed.max(1)),
            None => self
                .sizer
                .size(backlog, self.config.default_average_item_bytes),
        }
    }

    fn remaining_allowance(&self, counters: &RunCounters) -> Option<u64> {
        self.config
            .global_item_ceiling
            .map(|ceiling| ceiling.saturating_sub(counters.total_submitted))
    }

    /// Checked before every source and chunk; in-flight work is never interrupted.
    fn stop_requested(&self, state: &mut RunState) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            info!("Cancellation requested, not starting further chunks");
            self.emit(DispatchEvent::Cancelled);
            return Some(StopReason::Cancelled);
        }
        if self.remaining_allowance(&state.counters) == Some(0) {
            let ceiling = self.config.global_item_ceiling.unwrap_or_default();
            if !state.ceiling_announced {
                state.ceiling_announced = true;
                info!(ceiling, "Global item ceiling reached");
                self.emit(DispatchEvent::CeilingReached { ceiling });
            }
            return Some(StopReason::CeilingReached);
        }
        None
    }

    async fn dispatch_chunk(&mut self, chunk: &[Item], state: &mut RunState) {
        CHUNK_SIZE.observe(chunk.len() as f64);
        debug!(size = chunk.len(), "Starting chunk");

        let sink = &self.sink;
        let outcomes = join_all(chunk.iter().map(|item| async move {
            let timer = SUBMISSION_DURATION.start_timer();
            let result = sink.submit(item).await;
            timer.observe_duration();
            (item, result)
        }))
        .await;

        for (item, result) in outcomes {
            state.counters.total_submitted += 1;
            match result {
                Ok(()) => {
                    state.counters.processed += 1;
                    SUBMISSIONS.with_label_values(&["processed"]).inc();
                    self.status
                        .record(&item.domain, item.id.clone(), ItemState::Processed);
                }
                Err(e) => {
                    state.counters.failed += 1;
                    SUBMISSIONS.with_label_values(&["failed"]).inc();
                    warn!(domain = %item.domain, id = %item.id, "Submission failed: {}", e);
                    self.status
                        .record(&item.domain, item.id.clone(), ItemState::Failed);
                    self.emit(DispatchEvent::ItemFailed {
                        domain: item.domain.clone(),
                        id: item.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        state.counters.refresh_pending();
    }

    async fn flush_after_chunk(&mut self) {
        if let Err(e) = self.status.flush().await {
            warn!("Status flush failed, will retry after the next chunk: {}", e);
            self.emit(DispatchEvent::FlushFailed {
                error: e.to_string(),
            });
        }
    }

    fn maybe_report_progress(&self, state: &mut RunState) {
        let every = self.config.progress_every.max(1);
        let completed = state.counters.completed();
        if completed / every > state.last_reported / every {
            self.report_progress(state);
        }
    }

    fn report_progress(&self, state: &mut RunState) {
        let counters = state.counters;
        let total = counters.total_seen.saturating_sub(counters.skipped);
        let report = progress(counters.completed(), total, state.started_at, Utc::now());
        info!(
            percent = report.percent,
            done = report.done,
            total = report.total,
            elapsed = %report.elapsed_formatted,
            eta = %report.eta,
            "Progress"
        );
        state.last_reported = counters.completed();
        self.emit(DispatchEvent::Progress { report, counters });
    }

    fn emit(&self, event: DispatchEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}
