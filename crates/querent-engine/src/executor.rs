use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use querent_core::messages::{FailedAction, Message};
use querent_core::tools::{ToolError, ToolResult};

use crate::registry::ToolRegistry;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs tools by name with a deadline, isolating panics.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolResult, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        debug!(tool = name, "invoking tool");
        let result = tokio::time::timeout(
            self.timeout,
            AssertUnwindSafe(tool.execute(args)).catch_unwind(),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => {
                error!(tool = name, panic = %panic_message(&panic), "tool panicked during execution");
                Err(ToolError::ExecutionFailed("tool crashed".into()))
            }
            Err(_) => {
                warn!(tool = name, timeout_secs = self.timeout.as_secs(), "tool timed out");
                Err(ToolError::Timeout(self.timeout))
            }
        }
    }

    /// Execute every call held by `last`, in order.
    ///
    /// Appends one result per call carrying the call's id. When any call
    /// fails, a schema-retrieval failure follows the results. A `last` that
    /// is not a tool-call message yields nothing.
    pub async fn execute_pending(&self, last: Option<&Message>) -> Vec<Message> {
        let Some(Message::ToolCall(pending)) = last else {
            debug!("no pending tool calls");
            return Vec::new();
        };

        let mut out = Vec::with_capacity(pending.calls.len() + 1);
        let mut failures = Vec::new();

        for call in &pending.calls {
            match self.invoke(&call.name, call.arguments.clone()).await {
                Ok(result) => {
                    debug!(
                        tool = %call.name,
                        call_id = %call.id,
                        duration_ms = result.duration.as_millis() as u64,
                        "tool completed"
                    );
                    out.push(Message::tool_result(call.id.clone(), &call.name, result.content, false));
                }
                Err(e) => {
                    warn!(tool = %call.name, call_id = %call.id, error = %e, "tool failed");
                    let text = e.to_string();
                    out.push(Message::tool_result(call.id.clone(), &call.name, text.clone(), true));
                    failures.push(text);
                }
            }
        }

        if !failures.is_empty() {
            out.push(Message::failure(FailedAction::RetrievingSchema, failures.join("; ")));
        }
        out
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}
