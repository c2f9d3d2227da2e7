//! Prometheus registry for the dispatcher process.
//!
//! Registers the core dispatch collectors plus run-level gauges that are fed
//! from engine events.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

use dispatcher_core::{DispatchEvent, EventCallback};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Percent complete of the current run.
pub static RUN_PROGRESS_PERCENT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dispatcher_run_progress_percent",
        "Percent of submittable items completed in the current run",
    )
    .unwrap()
});

/// Items read but not yet attempted.
pub static ITEMS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dispatcher_items_pending",
        "Items read from sources but not yet submitted",
    )
    .unwrap()
});

/// Whether a run is in progress (1) or not (0).
pub static RUN_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("dispatcher_run_active", "Whether a dispatch run is in progress").unwrap()
});

fn register_metrics(registry: &Registry) {
    for collector in dispatcher_core::metrics::all_metrics() {
        registry.register(collector).unwrap();
    }
    registry
        .register(Box::new(RUN_PROGRESS_PERCENT.clone()))
        .unwrap();
    registry.register(Box::new(ITEMS_PENDING.clone())).unwrap();
    registry.register(Box::new(RUN_ACTIVE.clone())).unwrap();
}

/// Engine observer that keeps the run gauges current.
pub fn observer() -> EventCallback {
    std::sync::Arc::new(|event: &DispatchEvent| match event {
        DispatchEvent::RunStarted { .. } => {
            RUN_ACTIVE.set(1);
            RUN_PROGRESS_PERCENT.set(0);
        }
        DispatchEvent::Progress { report, counters } => {
            RUN_PROGRESS_PERCENT.set(report.percent as i64);
            ITEMS_PENDING.set(counters.pending as i64);
        }
        DispatchEvent::RunFinished { summary } => {
            RUN_ACTIVE.set(0);
            ITEMS_PENDING.set(summary.counters.pending as i64);
        }
        _ => {}
    })
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
