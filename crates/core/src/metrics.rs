//! Prometheus metrics for the dispatch engine.
//!
//! This module provides metrics for:
//! - Submissions (results, duration, skips)
//! - Chunk windows
//! - Status persistence
//! - Sources

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Submissions
// =============================================================================

/// Submissions by result.
pub static SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dispatcher_submissions_total", "Total item submissions"),
        &["result"], // "processed", "failed"
    )
    .unwrap()
});

/// Submission duration in seconds.
pub static SUBMISSION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "dispatcher_submission_duration_seconds",
            "Duration of a single item submission",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

/// Items skipped because they were already satisfied.
pub static ITEMS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dispatcher_items_skipped_total",
        "Items skipped because they were already processed",
    )
    .unwrap()
});

// =============================================================================
// Chunks
// =============================================================================

/// Concurrency window per chunk.
pub static CHUNK_SIZE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("dispatcher_chunk_size", "Number of submissions per chunk")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0]),
    )
    .unwrap()
});

// =============================================================================
// Persistence and sources
// =============================================================================

/// Status flushes by result.
pub static STATUS_FLUSHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dispatcher_status_flushes_total", "Status store flushes"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Sources by result.
pub static SOURCES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dispatcher_sources_total", "Sources read"),
        &["result"], // "read", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SUBMISSIONS.clone()),
        Box::new(SUBMISSION_DURATION.clone()),
        Box::new(ITEMS_SKIPPED.clone()),
        Box::new(CHUNK_SIZE.clone()),
        Box::new(STATUS_FLUSHES.clone()),
        Box::new(SOURCES.clone()),
    ]
}
