use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use querent_core::errors::GatewayError;
use querent_core::ids::ToolCallId;
use querent_core::messages::{Message, ToolCallBlock};
use querent_core::provider::{Completion, CompletionRequest, LlmProvider};

/// Pre-programmed responses for deterministic testing without API calls.
pub enum MockResponse {
    /// Reply with an assistant answer.
    Text(String),
    /// Reply with tool calls, given as `(name, arguments)`.
    ToolCalls(Vec<(String, Value)>),
    /// Fail the call.
    Error(GatewayError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCalls(vec![(name.into(), arguments)])
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that serves responses in order and records every request.
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Snapshot of the requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(request.clone());

        let next = self.responses.lock().pop_front();
        let Some(response) = next else {
            return Err(GatewayError::InvalidRequest(format!(
                "MockProvider: no response configured for call {idx}"
            )));
        };

        resolve_response(response).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: MockResponse) -> Result<Completion, GatewayError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Text(text) => {
                return Ok(Completion {
                    message: Message::answer(text),
                    usage: None,
                })
            }
            MockResponse::ToolCalls(calls) => {
                let calls = calls
                    .into_iter()
                    .map(|(name, arguments)| ToolCallBlock {
                        id: ToolCallId::new(),
                        name,
                        arguments,
                    })
                    .collect();
                return Ok(Completion {
                    message: Message::tool_calls(calls),
                    usage: None,
                });
            }
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}
