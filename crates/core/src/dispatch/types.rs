//! Types for the dispatch engine.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::ItemId;
use crate::progress::{format_duration, ProgressReport};
use crate::sizer::SizerError;
use crate::source::SourceError;

/// Errors that end a run as a whole.
///
/// Per-item and per-source failures never surface here; they are counted.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Engine settings are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Sources could not be listed.
    #[error("failed to list sources: {0}")]
    Listing(#[from] SourceError),

    /// Every listed source failed to read.
    #[error("none of the {attempted} sources could be read")]
    NoReadableSources { attempted: usize },
}

impl From<SizerError> for DispatchError {
    fn from(e: SizerError) -> Self {
        Self::InvalidConfiguration(e.to_string())
    }
}

/// Per-run counters, owned by one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Items read from all sources so far.
    pub total_seen: u64,
    /// Items handed to the sink.
    pub total_submitted: u64,
    pub processed: u64,
    pub failed: u64,
    /// Items already satisfied by earlier runs (or duplicated within this one).
    pub skipped: u64,
    /// Items read but never attempted.
    pub pending: u64,
}

impl RunCounters {
    /// Submissions resolved in this run, whatever the outcome.
    pub fn completed(&self) -> u64 {
        self.processed + self.failed
    }

    pub(crate) fn refresh_pending(&mut self) {
        self.pending = self
            .total_seen
            .saturating_sub(self.total_submitted + self.skipped);
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every readable source was exhausted.
    Completed,
    /// The global item ceiling was hit with work remaining.
    CeilingReached,
    /// Cancellation was requested.
    Cancelled,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub elapsed_ms: u64,
    pub stop_reason: StopReason,
    /// Some status changes could not be persisted.
    pub degraded: bool,
    pub sources_read: usize,
    pub sources_failed: usize,
}

impl RunSummary {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn elapsed_formatted(&self) -> String {
        format_duration(self.elapsed_ms / 1000)
    }
}

/// Observations published while a run progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    RunStarted {
        sources: usize,
    },
    SourceStarted {
        source_id: String,
        items: usize,
        to_submit: usize,
        window: usize,
    },
    SourceFailed {
        source_id: String,
        error: String,
    },
    ItemFailed {
        domain: String,
        id: ItemId,
        error: String,
    },
    Progress {
        report: ProgressReport,
        counters: RunCounters,
    },
    FlushFailed {
        error: String,
    },
    CeilingReached {
        ceiling: u64,
    },
    Cancelled,
    RunFinished {
        summary: RunSummary,
    },
}

/// Observer callback for [`DispatchEvent`]s.
pub type EventCallback = Arc<dyn Fn(&DispatchEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_unattempted_items() {
        let mut counters = RunCounters {
            total_seen: 10,
            total_submitted: 4,
            skipped: 3,
            ..Default::default()
        };
        counters.refresh_pending();
        assert_eq!(counters.pending, 3);
    }

    #[test]
    fn test_summary_elapsed_formatting() {
        let summary = RunSummary {
            counters: RunCounters::default(),
            elapsed_ms: 61_500,
            stop_reason: StopReason::Completed,
            degraded: false,
            sources_read: 1,
            sources_failed: 0,
        };
        assert_eq!(summary.elapsed(), Duration::from_millis(61_500));
        assert_eq!(summary.elapsed_formatted(), "0d 0h 1m 1s");
    }

    #[test]
    fn test_event_serialization() {
        let event = DispatchEvent::CeilingReached { ceiling: 5 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ceiling_reached");
        assert_eq!(json["ceiling"], 5);
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::NoReadableSources { attempted: 3 };
        assert_eq!(err.to_string(), "none of the 3 sources could be read");
    }
}
