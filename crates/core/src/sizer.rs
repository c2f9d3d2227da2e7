//! Concurrency window sizing from an estimated backlog payload.
//!
//! The window bounds both how many submissions are in flight at once and the
//! estimated aggregate payload of one chunk. Payload sizes are never measured;
//! the caller supplies an average item size.

use thiserror::Error;

/// Default average item size used when nothing better is known.
pub const DEFAULT_AVERAGE_ITEM_BYTES: u64 = 1024;

/// Default ceiling on the estimated bytes of one chunk.
pub const DEFAULT_MAX_AGGREGATE_BATCH_BYTES: u64 = 10 * 1024 * 1024;

const SMALL_WORKLOAD_BYTES: u64 = 100 * 1024;
const MEDIUM_WORKLOAD_BYTES: u64 = 1024 * 1024;

const SMALL_WINDOW: u64 = 10;
const MEDIUM_WINDOW: u64 = 50;
const LARGE_WINDOW: u64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Maps a backlog to a concurrency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizer {
    max_aggregate_bytes: u64,
}

impl Default for BatchSizer {
    fn default() -> Self {
        Self {
            max_aggregate_bytes: DEFAULT_MAX_AGGREGATE_BATCH_BYTES,
        }
    }
}

impl BatchSizer {
    pub fn new(max_aggregate_bytes: u64) -> Result<Self, SizerError> {
        if max_aggregate_bytes == 0 {
            return Err(SizerError::InvalidArgument(
                "max aggregate batch bytes must be positive".to_string(),
            ));
        }
        Ok(Self {
            max_aggregate_bytes,
        })
    }

    pub fn max_aggregate_bytes(&self) -> u64 {
        self.max_aggregate_bytes
    }

    /// Compute the window for `pending_count` items of roughly `avg_item_bytes` each.
    ///
    /// The result is always within `1..=pending_count`, and `result * avg_item_bytes`
    /// stays within the aggregate budget unless a single item alone exceeds it.
    pub fn size(&self, pending_count: u64, avg_item_bytes: u64) -> Result<usize, SizerError> {
        if pending_count == 0 {
            return Err(SizerError::InvalidArgument(
                "pending count must be positive".to_string(),
            ));
        }
        if avg_item_bytes == 0 {
            return Err(SizerError::InvalidArgument(
                "average item bytes must be positive".to_string(),
            ));
        }

        let total_bytes = pending_count.saturating_mul(avg_item_bytes);
        let tier = if total_bytes < SMALL_WORKLOAD_BYTES {
            SMALL_WINDOW
        } else if total_bytes < MEDIUM_WORKLOAD_BYTES {
            MEDIUM_WINDOW
        } else {
            LARGE_WINDOW
        };

        let mut limit = tier.min(pending_count);
        if limit.saturating_mul(avg_item_bytes) > self.max_aggregate_bytes {
            limit = self.max_aggregate_bytes / avg_item_bytes;
        }

        // An item larger than the whole budget still gets dispatched, one at a time.
        Ok(limit.clamp(1, pending_count) as usize)
    }
}
