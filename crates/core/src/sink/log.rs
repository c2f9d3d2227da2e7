//! Dry-run sink.

use async_trait::async_trait;
use tracing::info;

use super::{DataCollectRequest, RequestDefaults, RequestSink, SubmissionError, TraceHeaders};
use crate::item::Item;

/// Shapes and logs each request, then reports success without sending anything.
#[derive(Debug, Clone, Default)]
pub struct LogRequestSink {
    defaults: RequestDefaults,
}

impl LogRequestSink {
    pub fn new(defaults: RequestDefaults) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl RequestSink for LogRequestSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn submit(&self, item: &Item) -> Result<(), SubmissionError> {
        let request = DataCollectRequest::for_item(item, &self.defaults);
        let headers = TraceHeaders::generate();
        info!(
            id = %item.id,
            correlation_id = %headers.correlation_id,
            url = %request.target_url(),
            "Dry run: request not sent"
        );
        Ok(())
    }
}
