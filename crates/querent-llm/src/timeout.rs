use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use querent_core::errors::GatewayError;
use querent_core::provider::{Completion, CompletionRequest, LlmProvider};

/// Bounds every completion with a deadline. Each call is attempted once.
pub struct TimeoutProvider<P: LlmProvider> {
    inner: P,
    timeout: Duration,
}

impl<P: LlmProvider> TimeoutProvider<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<P: LlmProvider> LlmProvider for TimeoutProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = self.inner.name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "completion timed out"
                );
                Err(GatewayError::Timeout(self.timeout))
            }
        }
    }
}
