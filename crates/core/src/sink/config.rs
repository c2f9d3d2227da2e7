//! Sink configuration.

use serde::{Deserialize, Serialize};

use super::RequestDefaults;

/// Which sink implementation to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// POST requests to `endpoint`.
    Http,
    /// Log requests without sending them.
    #[default]
    Log,
}

/// Configuration for the outbound request sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,

    /// Target URL for the http sink.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-attempt timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after a retryable failure.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Maximum submissions per minute across the whole run (unlimited when unset).
    #[serde(default)]
    pub rate_limit_rpm: Option<u32>,

    /// Defaults applied to every shaped request.
    #[serde(default)]
    pub request: RequestDefaults,
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_retry_count() -> u32 {
    1
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            endpoint: None,
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            rate_limit_rpm: None,
            request: RequestDefaults::default(),
        }
    }
}
