//! Outbound request sinks.
//!
//! Each item is shaped into a [`DataCollectRequest`] and handed to a
//! [`RequestSink`]. The engine only observes success or failure; any retrying,
//! timeouts or rate limiting happen inside the sink.
//!
//! - [`HttpRequestSink`] POSTs the request as JSON to a configured endpoint
//! - [`LogRequestSink`] only logs what would have been sent (dry run)

mod config;
mod error;
mod http;
mod log;
mod rate_limiter;
mod request;
mod traits;

use std::sync::Arc;

pub use config::{SinkConfig, SinkKind};
pub use error::SubmissionError;
pub use http::HttpRequestSink;
pub use log::LogRequestSink;
pub use rate_limiter::{RateLimiter, TokenBucket};
pub use request::{
    AccessMethod, AccessType, AuthenticationDetails, DataCollectRequest, DataFormat,
    QueryParameters, RequestDefaults, RequestParameters, ServiceSpec, ServiceType, StatusType,
    TraceHeaders,
};
pub use traits::RequestSink;

/// Create the sink selected by `config.kind`.
pub fn create_sink(config: &SinkConfig) -> Result<Arc<dyn RequestSink>, SubmissionError> {
    match config.kind {
        SinkKind::Http => Ok(Arc::new(HttpRequestSink::new(config)?)),
        SinkKind::Log => Ok(Arc::new(LogRequestSink::new(config.request.clone()))),
    }
}
