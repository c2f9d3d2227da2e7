//! Dispatch configuration.

use serde::{Deserialize, Serialize};

use crate::sizer::{DEFAULT_AVERAGE_ITEM_BYTES, DEFAULT_MAX_AGGREGATE_BATCH_BYTES};

/// Configuration for the dispatch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Fixed concurrency window.
    /// When unset the window is derived from the backlog size.
    #[serde(default)]
    pub max_concurrent_per_source: Option<usize>,

    /// Maximum submissions in one run (unlimited when unset).
    #[serde(default)]
    pub global_item_ceiling: Option<u64>,

    /// Estimated payload size of one item, used for window sizing.
    #[serde(default = "default_average_item_bytes")]
    pub default_average_item_bytes: u64,

    /// Upper bound on the estimated payload of one chunk.
    #[serde(default = "default_max_aggregate_batch_bytes")]
    pub max_aggregate_batch_bytes: u64,

    /// Resubmit items whose stored state is `failed`.
    /// Items stored as `processed` are never resubmitted.
    #[serde(default = "default_retry_failed")]
    pub retry_failed: bool,

    /// Report progress every N completed submissions.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

fn default_average_item_bytes() -> u64 {
    DEFAULT_AVERAGE_ITEM_BYTES
}

fn default_max_aggregate_batch_bytes() -> u64 {
    DEFAULT_MAX_AGGREGATE_BATCH_BYTES
}

fn default_retry_failed() -> bool {
    true
}

fn default_progress_every() -> u64 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_source: None,
            global_item_ceiling: None,
            default_average_item_bytes: default_average_item_bytes(),
            max_aggregate_batch_bytes: default_max_aggregate_batch_bytes(),
            retry_failed: default_retry_failed(),
            progress_every: default_progress_every(),
        }
    }
}
