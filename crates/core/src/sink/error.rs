//! Error types for request sinks.

use thiserror::Error;

/// A single item could not be dispatched.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The downstream system answered with a non-success status.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The downstream system could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The sink is misconfigured.
    #[error("sink configuration error: {0}")]
    Configuration(String),

    /// Anything else.
    #[error("submission failed: {0}")]
    Other(String),
}

impl SubmissionError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Configuration(_) | Self::Other(_) => false,
        }
    }
}

impl From<reqwest::Error> for SubmissionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}
