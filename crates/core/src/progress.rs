//! Percent-complete and time-remaining estimates.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estimated time remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Eta {
    /// Nothing has completed yet, so there is no rate to extrapolate from.
    Unknown,
    Remaining { secs: u64 },
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Unknown => f.write_str("unknown"),
            Eta::Remaining { secs } => f.write_str(&format_duration(*secs)),
        }
    }
}

/// A point-in-time progress observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub done: u64,
    pub total: u64,
    /// Rounded, 0..=100.
    pub percent: u8,
    pub elapsed_secs: u64,
    pub elapsed_formatted: String,
    pub eta: Eta,
}

impl ProgressReport {
    pub fn eta_formatted(&self) -> String {
        self.eta.to_string()
    }
}

/// Compute progress for `done` of `total` items started at `start`, observed at `now`.
pub fn progress(done: u64, total: u64, start: DateTime<Utc>, now: DateTime<Utc>) -> ProgressReport {
    let total_for_ratio = total.max(1);
    let elapsed = now
        .signed_duration_since(start)
        .to_std()
        .unwrap_or(Duration::ZERO);

    let ratio = done as f64 / total_for_ratio as f64;
    let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;

    let eta = if done == 0 {
        Eta::Unknown
    } else {
        let remaining = total_for_ratio.saturating_sub(done) as f64;
        let secs = elapsed.as_secs_f64() * remaining / done as f64;
        Eta::Remaining {
            secs: secs.floor() as u64,
        }
    };

    let elapsed_secs = elapsed.as_secs();
    ProgressReport {
        done,
        total,
        percent,
        elapsed_secs,
        elapsed_formatted: format_duration(elapsed_secs),
        eta,
    }
}

/// Render seconds as `Xd Xh Xm Xs`.
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
}
