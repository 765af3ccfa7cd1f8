use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use querent_core::errors::GatewayError;
use querent_core::messages::{FailedAction, Message};
use querent_core::provider::{LlmProvider, ToolChoice};
use querent_core::tools::{Tool, ToolError, ToolResult};
use querent_llm::{MockProvider, MockResponse};

use super::*;

struct FakeListTables {
    fail: bool,
}

#[async_trait]
impl Tool for FakeListTables {
    fn name(&self) -> &str {
        LIST_TABLES_TOOL
    }
    fn description(&self) -> &str {
        "lists tables"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _args: Value) -> Result<ToolResult, ToolError> {
        if self.fail {
            return Err(ToolError::ExecutionFailed("database is unreachable".into()));
        }
        Ok(ToolResult {
            content: "orders, users".into(),
            duration: Duration::ZERO,
        })
    }
}

struct FakeSchema;

#[async_trait]
impl Tool for FakeSchema {
    fn name(&self) -> &str {
        SCHEMA_TOOL
    }
    fn description(&self) -> &str {
        "describes tables"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "required": ["table_names"]})
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        match args["table_names"].as_str() {
            Some("users") => Ok(ToolResult {
                content: "CREATE TABLE users (id INTEGER, name TEXT)".into(),
                duration: Duration::ZERO,
            }),
            Some(other) => Err(ToolError::ExecutionFailed(format!(
                "table_names {other} not found in database"
            ))),
            None => Err(ToolError::InvalidArguments("table_names is required".into())),
        }
    }
}

fn registry(list_fails: bool) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FakeListTables { fail: list_fails }));
    registry.register(Arc::new(FakeSchema));
    Arc::new(registry)
}

fn pipeline(mock: &Arc<MockProvider>, list_fails: bool) -> Pipeline {
    let provider: Arc<dyn LlmProvider> = mock.clone();
    Pipeline::new(provider, registry(list_fails), Dialect::Sqlite).unwrap()
}

fn schema_call(tables: &str) -> MockResponse {
    MockResponse::tool_call(SCHEMA_TOOL, json!({"table_names": tables}))
}

fn failures(log: &ConversationLog) -> Vec<FailedAction> {
    log.iter()
        .filter_map(|m| m.as_assistant().and_then(|a| a.failure()).map(|f| f.action))
        .collect()
}

const ALL_NODES: [Node; 5] = [
    Node::ListTables,
    Node::CallGetSchema,
    Node::GetSchema,
    Node::GenerateQuery,
    Node::CheckQuery,
];

#[tokio::test]
async fn happy_path_visits_every_node_in_order() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("SELECT COUNT(*) FROM users"),
        MockResponse::text("```sql\nSELECT COUNT(*) FROM users;\n```"),
    ]));
    let run = pipeline(&mock, false).run("How many rows are in table users?").await;

    assert_eq!(run.visited, ALL_NODES.to_vec());
    assert_eq!(run.log.last(), Some(&Message::answer("SELECT COUNT(*) FROM users;")));
    assert!(failures(&run.log).is_empty());
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn prose_around_fenced_replies_never_reaches_the_answer() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("Here is the query:\n```sql\nSELECT COUNT(*) FROM users;\n```"),
        MockResponse::text("The query looks correct.\n```sql\nSELECT COUNT(*) FROM users;\n```\nNo changes needed."),
    ]));
    let run = pipeline(&mock, false).run("How many users?").await;

    assert_eq!(mock.requests()[2].messages[1], Message::human("SELECT COUNT(*) FROM users;"));
    assert_eq!(run.log.last(), Some(&Message::answer("SELECT COUNT(*) FROM users;")));
}

#[tokio::test]
async fn list_tables_appends_call_result_and_summary() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("SELECT 1"),
        MockResponse::text("SELECT 1"),
    ]));
    let run = pipeline(&mock, false).run("q").await;
    let messages = run.log.messages();

    let Message::ToolCall(call) = &messages[1] else {
        panic!("expected synthetic tool call, got {:?}", messages[1]);
    };
    assert_eq!(call.calls[0].name, LIST_TABLES_TOOL);
    let Message::ToolResult(result) = &messages[2] else {
        panic!("expected tool result, got {:?}", messages[2]);
    };
    assert_eq!(result.tool_call_id, call.calls[0].id);
    assert_eq!(result.content, "orders, users");
    assert_eq!(messages[3], Message::answer("Available tables: orders, users"));
}

#[tokio::test]
async fn schema_results_correlate_with_requested_calls() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("SELECT 1"),
        MockResponse::text("SELECT 1"),
    ]));
    let run = pipeline(&mock, false).run("q").await;
    let messages = run.log.messages();

    let pending = messages
        .iter()
        .rev()
        .find_map(|m| match m {
            Message::ToolCall(tc) if tc.calls[0].name == SCHEMA_TOOL => Some(tc.calls[0].id.clone()),
            _ => None,
        })
        .unwrap();
    let answered = messages
        .iter()
        .find_map(|m| match m {
            Message::ToolResult(r) if r.tool_name == SCHEMA_TOOL => Some(r.tool_call_id.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(pending, answered);
}

#[tokio::test]
async fn model_requests_are_shaped_per_step() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("SELECT name FROM users"),
        MockResponse::text("SELECT name FROM users"),
    ]));
    pipeline(&mock, false).run("list user names").await;
    let requests = mock.requests();

    // call_get_schema: full log, forced schema tool.
    assert_eq!(requests[0].tool_choice, ToolChoice::Required);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, SCHEMA_TOOL);
    assert_eq!(requests[0].messages[0], Message::human("list user names"));

    // generate_query: system prompt then the log.
    assert!(requests[1].tools.is_empty());
    assert!(matches!(&requests[1].messages[0], Message::System(s) if s.content.contains("sqlite")));
    assert_eq!(requests[1].messages[1], Message::human("list user names"));

    // check_query: system prompt plus the query as a human message, nothing else.
    assert_eq!(requests[2].messages.len(), 2);
    assert!(matches!(&requests[2].messages[0], Message::System(s) if s.content.contains("SQL expert")));
    assert_eq!(requests[2].messages[1], Message::human("SELECT name FROM users"));
}

#[tokio::test]
async fn list_tables_failure_is_recorded_and_check_is_skipped() {
    let mock = Arc::new(MockProvider::new(vec![]));
    let run = pipeline(&mock, true).run("q").await;

    assert_eq!(run.log.messages()[1].text(), "Error listing tables: database is unreachable");
    assert_eq!(failures(&run.log)[0], FailedAction::ListingTables);
    assert!(!run.visited.contains(&Node::CheckQuery));
}

#[tokio::test]
async fn generate_failure_short_circuits_check() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::Error(GatewayError::RateLimited),
        MockResponse::text("never used"),
    ]));
    let run = pipeline(&mock, false).run("q").await;

    assert_eq!(run.visited, ALL_NODES[..4].to_vec());
    assert_eq!(run.log.last().unwrap().text(), "Error generating query: rate limited");
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn blank_generated_query_is_a_failure() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("```sql\n```"),
    ]));
    let run = pipeline(&mock, false).run("q").await;

    assert_eq!(
        run.log.last().unwrap().text(),
        "Error generating query: model returned an empty query"
    );
    assert!(!run.visited.contains(&Node::CheckQuery));
}

#[tokio::test]
async fn schema_tool_failure_adds_failure_and_continues() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("invoices"),
        MockResponse::text("SELECT 1"),
        MockResponse::text("SELECT 1"),
    ]));
    let run = pipeline(&mock, false).run("q").await;

    assert!(failures(&run.log).contains(&FailedAction::RetrievingSchema));
    let failure_text = run
        .log
        .iter()
        .map(Message::text)
        .find(|t| t.starts_with("Error retrieving schema"))
        .unwrap();
    assert_eq!(failure_text, "Error retrieving schema: table_names invoices not found in database");
    assert_eq!(run.visited, ALL_NODES.to_vec());
}

#[tokio::test]
async fn text_reply_to_forced_tool_call_is_a_schema_failure() {
    let mock = Arc::new(MockProvider::new(vec![
        MockResponse::text("I think you want the users table"),
        MockResponse::Error(GatewayError::NetworkError("reset".into())),
    ]));
    let run = pipeline(&mock, false).run("q").await;

    // get_schema had nothing pending, so it appended nothing.
    let after_schema_call = run.log.len();
    assert_eq!(failures(&run.log)[0], FailedAction::RetrievingSchema);
    assert!(!run.log.iter().any(|m| matches!(m, Message::ToolResult(r) if r.tool_name == SCHEMA_TOOL)));
    assert_eq!(after_schema_call, 6);
}

#[tokio::test]
async fn stream_yields_seed_then_one_snapshot_per_step() {
    let mock = Arc::new(MockProvider::new(vec![
        schema_call("users"),
        MockResponse::text("SELECT 1"),
        MockResponse::text("SELECT 1"),
    ]));
    let pipeline = pipeline(&mock, false);
    let snapshots: Vec<Snapshot> = pipeline.stream("q").collect().await;

    assert_eq!(snapshots.len(), 6);
    assert_eq!(snapshots[0].node, None);
    assert_eq!(snapshots[0].log, ConversationLog::seeded("q"));

    let nodes: Vec<Node> = snapshots.iter().filter_map(|s| s.node).collect();
    assert_eq!(nodes, ALL_NODES.to_vec());

    // Each snapshot extends the previous one.
    for pair in snapshots.windows(2) {
        let (before, after) = (pair[0].log.messages(), pair[1].log.messages());
        assert!(after.len() >= before.len());
        assert_eq!(&after[..before.len()], before);
    }
}

#[test]
fn missing_tool_is_rejected() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FakeSchema));
    let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new(vec![]));

    let err = Pipeline::new(provider, Arc::new(registry), Dialect::Sqlite).err().unwrap();
    assert!(matches!(err, EngineError::MissingTool(ref name) if name == LIST_TABLES_TOOL));
}

#[test]
fn exposes_dialect_and_model() {
    let mock = Arc::new(MockProvider::new(vec![]));
    let pipeline = pipeline(&mock, false);
    assert_eq!(pipeline.dialect(), Dialect::Sqlite);
    assert_eq!(pipeline.model(), "mock-model");
}
