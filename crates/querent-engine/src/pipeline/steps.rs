use serde_json::json;
use tracing::{debug, error, info, warn};

use querent_core::ids::ToolCallId;
use querent_core::messages::{AssistantContent, FailedAction, Message, ToolCallBlock};
use querent_core::provider::CompletionRequest;
use querent_db::{LIST_TABLES_TOOL, SCHEMA_TOOL};

use super::Pipeline;
use crate::log::ConversationLog;
use crate::node::Node;
use crate::sql::extract_sql;

impl Pipeline {
    /// Messages produced by `node` given the log so far. Failures come back as
    /// failure messages, never as errors.
    pub(super) async fn step(&self, node: Node, log: &ConversationLog) -> Vec<Message> {
        match node {
            Node::ListTables => self.list_tables().await,
            Node::CallGetSchema => self.call_get_schema(log).await,
            Node::GetSchema => self.executor.execute_pending(log.last()).await,
            Node::GenerateQuery => self.generate_query(log).await,
            Node::CheckQuery => self.check_query(log).await,
        }
    }

    async fn list_tables(&self) -> Vec<Message> {
        let call_id = ToolCallId::new();
        let request = Message::tool_calls(vec![ToolCallBlock {
            id: call_id.clone(),
            name: LIST_TABLES_TOOL.into(),
            arguments: json!({}),
        }]);

        match self.executor.invoke(LIST_TABLES_TOOL, json!({})).await {
            Ok(result) => {
                info!(node = "list_tables", tables = %result.content, "tables listed");
                let summary = Message::answer(format!("Available tables: {}", result.content));
                vec![
                    request,
                    Message::tool_result(call_id, LIST_TABLES_TOOL, result.content, false),
                    summary,
                ]
            }
            Err(e) => {
                error!(node = "list_tables", error = %e, "node failed");
                vec![Message::failure(FailedAction::ListingTables, e.to_string())]
            }
        }
    }

    async fn call_get_schema(&self, log: &ConversationLog) -> Vec<Message> {
        let Some(schema_tool) = self.executor.registry().definition(SCHEMA_TOOL) else {
            return vec![Message::failure(
                FailedAction::RetrievingSchema,
                format!("{SCHEMA_TOOL} is not registered"),
            )];
        };

        let request = CompletionRequest::new(log.messages().to_vec()).with_forced_tools(vec![schema_tool]);
        debug!(node = "call_get_schema", messages = request.messages.len(), "asking model for schema call");

        match self.provider.complete(&request).await {
            Ok(completion) => match completion.message {
                message @ Message::ToolCall(_) => {
                    info!(node = "call_get_schema", call = %message.text(), "schema call requested");
                    vec![message]
                }
                other => {
                    warn!(node = "call_get_schema", reply = %other.text(), "model answered without calling a tool");
                    vec![Message::failure(
                        FailedAction::RetrievingSchema,
                        "model did not request a schema lookup",
                    )]
                }
            },
            Err(e) => {
                error!(node = "call_get_schema", error = %e, kind = e.error_kind(), "node failed");
                vec![Message::failure(FailedAction::RetrievingSchema, e.to_string())]
            }
        }
    }

    async fn generate_query(&self, log: &ConversationLog) -> Vec<Message> {
        if let Some(question) = log.question() {
            debug!(node = "generate_query", question, "generating query");
        }

        let mut messages = Vec::with_capacity(log.len() + 1);
        messages.push(Message::system(self.generate_prompt.clone()));
        messages.extend(log.iter().cloned());

        let reply = self.provider.complete(&CompletionRequest::new(messages)).await;
        let message = match reply {
            Ok(completion) => query_from_reply(completion.message, FailedAction::GeneratingQuery),
            Err(e) => {
                error!(node = "generate_query", error = %e, kind = e.error_kind(), "node failed");
                Message::failure(FailedAction::GeneratingQuery, e.to_string())
            }
        };
        info!(node = "generate_query", query = %message.text(), "query generated");
        vec![message]
    }

    async fn check_query(&self, log: &ConversationLog) -> Vec<Message> {
        let query = log
            .last()
            .and_then(Message::as_assistant)
            .and_then(|m| m.usable_answer());
        let Some(query) = query else {
            error!(node = "check_query", "no valid query to check");
            return vec![Message::failure(FailedAction::CheckingQuery, "no query generated")];
        };
        debug!(node = "check_query", query, "checking query");

        let request = CompletionRequest::new(vec![
            Message::system(self.check_prompt.clone()),
            Message::human(query),
        ]);

        let message = match self.provider.complete(&request).await {
            Ok(completion) => query_from_reply(completion.message, FailedAction::CheckingQuery),
            Err(e) => {
                error!(node = "check_query", error = %e, kind = e.error_kind(), "node failed");
                Message::failure(FailedAction::CheckingQuery, e.to_string())
            }
        };
        info!(node = "check_query", checked_query = %message.text(), "query checked");
        vec![message]
    }
}

/// Reduce a model reply to a bare query, or a failure when there is none.
fn query_from_reply(reply: Message, action: FailedAction) -> Message {
    let Message::Assistant(assistant) = reply else {
        return Message::failure(action, "model returned a tool call instead of a query");
    };

    match assistant.content {
        AssistantContent::Answer { text } => {
            let sql = extract_sql(&text);
            if sql.is_empty() {
                Message::failure(action, "model returned an empty query")
            } else {
                Message::answer(sql)
            }
        }
        AssistantContent::Failure(failure) => Message::failure(action, failure.message),
    }
}
