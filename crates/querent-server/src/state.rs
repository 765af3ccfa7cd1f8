use std::sync::Arc;
use std::time::Duration;

use querent_engine::Pipeline;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Upper bound on one `/chat` pipeline run.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
