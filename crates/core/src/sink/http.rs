//! HTTP request sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::{
    DataCollectRequest, RateLimiter, RequestDefaults, RequestSink, SinkConfig, SubmissionError,
    TraceHeaders,
};
use crate::item::Item;

const CORRELATION_HEADER: &str = "x-correlation-id";
const TRACE_HEADER: &str = "x-trace-id";

/// Base delay between attempts; doubles on each retry.
const RETRY_BACKOFF_MS: u64 = 100;

/// POSTs each request as JSON to a fixed endpoint.
pub struct HttpRequestSink {
    client: Client,
    endpoint: String,
    retry_count: u32,
    defaults: RequestDefaults,
    rate_limiter: Option<RateLimiter>,
}

impl HttpRequestSink {
    pub fn new(config: &SinkConfig) -> Result<Self, SubmissionError> {
        let endpoint = config
            .endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SubmissionError::Configuration("sink.endpoint is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SubmissionError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            retry_count: config.retry_count,
            defaults: config.request.clone(),
            rate_limiter: config.rate_limit_rpm.map(RateLimiter::new),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(
        &self,
        request: &DataCollectRequest,
        headers: &TraceHeaders,
    ) -> Result<(), SubmissionError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(CORRELATION_HEADER, &headers.correlation_id)
            .header(TRACE_HEADER, &headers.trace_id)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SubmissionError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RequestSink for HttpRequestSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(&self, item: &Item) -> Result<(), SubmissionError> {
        let request = DataCollectRequest::for_item(item, &self.defaults);
        let headers = TraceHeaders::generate();
        let url = request.target_url();

        let mut attempt = 0;
        loop {
            match self.send_once(&request, &headers).await {
                Ok(()) => {
                    info!(
                        id = %item.id,
                        correlation_id = %headers.correlation_id,
                        url = %url,
                        "Request sent"
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.retry_count => {
                    attempt += 1;
                    warn!(
                        id = %item.id,
                        correlation_id = %headers.correlation_id,
                        attempt,
                        "Request failed, retrying: {}", e
                    );
                    let backoff = RETRY_BACKOFF_MS.saturating_mul(1 << (attempt - 1).min(6));
                    debug!(backoff_ms = backoff, "Backing off");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(
                        id = %item.id,
                        correlation_id = %headers.correlation_id,
                        url = %url,
                        "Request failed: {}", e
                    );
                    return Err(e);
                }
            }
        }
    }
}
