mod steps;

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use querent_core::provider::LlmProvider;
use querent_db::{Dialect, LIST_TABLES_TOOL, SCHEMA_TOOL};

use crate::error::EngineError;
use crate::executor::ToolExecutor;
use crate::log::ConversationLog;
use crate::node::{next_transition, Node, Transition};
use crate::prompts::{check_query_prompt, generate_query_prompt};
use crate::registry::ToolRegistry;

/// State of the log after a step. `node` is `None` for the seeded log.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub node: Option<Node>,
    pub log: ConversationLog,
}

/// Outcome of driving a pipeline to completion.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineRun {
    pub visited: Vec<Node>,
    pub log: ConversationLog,
}

/// The fixed question-to-query graph.
///
/// One instance is shared by all requests; each call to [`Pipeline::stream`]
/// owns its own log.
pub struct Pipeline {
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
    dialect: Dialect,
    generate_prompt: String,
    check_prompt: String,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        dialect: Dialect,
    ) -> Result<Self, EngineError> {
        for required in [LIST_TABLES_TOOL, SCHEMA_TOOL] {
            if !registry.contains(required) {
                return Err(EngineError::MissingTool(required.to_string()));
            }
        }

        Ok(Self {
            provider,
            executor: ToolExecutor::new(registry),
            dialect,
            generate_prompt: generate_query_prompt(dialect),
            check_prompt: check_query_prompt(dialect),
        })
    }

    /// Deadline for each tool invocation.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Run the graph, yielding the seeded log and then the log after each step.
    pub fn stream(&self, question: impl Into<String>) -> impl Stream<Item = Snapshot> + Send + '_ {
        let mut log = ConversationLog::seeded(question);

        async_stream::stream! {
            yield Snapshot { node: None, log: log.clone() };

            let mut current = Node::START;
            loop {
                info!(node = %current, "entering node");
                let appended = self.step(current, &log).await;
                debug!(node = %current, appended = appended.len(), "node completed");
                log.extend(appended);

                yield Snapshot { node: Some(current), log: log.clone() };

                match next_transition(current, &log) {
                    Transition::Next(next) => {
                        debug!(from = %current, to = %next, "routing decision");
                        current = next;
                    }
                    Transition::End => {
                        debug!(from = %current, "routing decision: end");
                        break;
                    }
                }
            }
        }
    }

    /// Drive [`Pipeline::stream`] to the end.
    pub async fn run(&self, question: impl Into<String>) -> PipelineRun {
        let question = question.into();
        let mut run = PipelineRun {
            visited: Vec::new(),
            log: ConversationLog::seeded(question.clone()),
        };

        let stream = self.stream(question);
        futures::pin_mut!(stream);
        while let Some(snapshot) = stream.next().await {
            if let Some(node) = snapshot.node {
                run.visited.push(node);
            }
            run.log = snapshot.log;
        }
        run
    }
}

#[cfg(test)]
mod tests;
