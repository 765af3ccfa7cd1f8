use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;

/// One entry of a conversation log. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System(SystemMessage),
    #[serde(rename = "human")]
    Human(HumanMessage),
    #[serde(rename = "ai")]
    Assistant(AssistantMessage),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallMessage),
    #[serde(rename = "tool")]
    ToolResult(ToolResultMessage),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HumanMessage {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: AssistantContent,
}

/// Assistant output is either a usable answer or a step failure.
/// Failures are carried as data so a pipeline run always completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantContent {
    Answer { text: String },
    Failure(StepFailure),
}

/// An assistant turn that requests one or more tool invocations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub calls: Vec<ToolCallBlock>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBlock {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub tool_call_id: ToolCallId,
    pub tool_name: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

// --- Step failures ---

/// Which pipeline action failed. Renders as the phrase used in sentinel text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedAction {
    ListingTables,
    RetrievingSchema,
    GeneratingQuery,
    CheckingQuery,
}

impl FailedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingTables => "listing tables",
            Self::RetrievingSchema => "retrieving schema",
            Self::GeneratingQuery => "generating query",
            Self::CheckingQuery => "checking query",
        }
    }
}

impl fmt::Display for FailedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure swallowed at a step boundary and re-expressed as a message.
///
/// Displays as `Error <action>: <message>`, the sentinel form surfaced to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub action: FailedAction,
    pub message: String,
}

impl StepFailure {
    pub const SENTINEL: &'static str = "Error";

    pub fn new(action: FailedAction, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", Self::SENTINEL, self.action, self.message)
    }
}

// --- Convenience constructors ---

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message::System(SystemMessage {
            content: text.into(),
        })
    }

    pub fn human(text: impl Into<String>) -> Self {
        Message::Human(HumanMessage {
            content: text.into(),
        })
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            content: AssistantContent::Answer { text: text.into() },
        })
    }

    pub fn failure(action: FailedAction, message: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            content: AssistantContent::Failure(StepFailure::new(action, message)),
        })
    }

    pub fn tool_calls(calls: Vec<ToolCallBlock>) -> Self {
        Message::ToolCall(ToolCallMessage { calls })
    }

    pub fn tool_result(
        tool_call_id: ToolCallId,
        tool_name: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Message::ToolResult(ToolResultMessage {
            tool_call_id,
            tool_name: tool_name.into(),
            content: content.into(),
            is_error,
        })
    }

    /// Short role label used in logs.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::Human(_) => "human",
            Self::Assistant(_) => "ai",
            Self::ToolCall(_) => "tool_call",
            Self::ToolResult(_) => "tool",
        }
    }

    /// Text as it would be shown to a reader; failures include their sentinel.
    pub fn text(&self) -> String {
        match self {
            Self::System(m) => m.content.clone(),
            Self::Human(m) => m.content.clone(),
            Self::Assistant(m) => m.text(),
            Self::ToolCall(m) => m
                .calls
                .iter()
                .map(|c| format!("{}({})", c.name, c.arguments))
                .collect::<Vec<_>>()
                .join(", "),
            Self::ToolResult(m) => m.content.clone(),
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::Assistant(m) => Some(m),
            _ => None,
        }
    }
}

impl AssistantMessage {
    pub fn text(&self) -> String {
        match &self.content {
            AssistantContent::Answer { text } => text.clone(),
            AssistantContent::Failure(failure) => failure.to_string(),
        }
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.content {
            AssistantContent::Failure(f) => Some(f),
            AssistantContent::Answer { .. } => None,
        }
    }

    /// The answer text when it is non-empty after trimming.
    pub fn usable_answer(&self) -> Option<&str> {
        match &self.content {
            AssistantContent::Answer { text } if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_renders_sentinel_text() {
        let msg = Message::failure(FailedAction::ListingTables, "connection refused");
        assert_eq!(msg.text(), "Error listing tables: connection refused");
    }

    #[test]
    fn every_action_has_its_phrase() {
        let rendered: Vec<String> = [
            FailedAction::ListingTables,
            FailedAction::RetrievingSchema,
            FailedAction::GeneratingQuery,
            FailedAction::CheckingQuery,
        ]
        .iter()
        .map(|a| StepFailure::new(*a, "x").to_string())
        .collect();
        assert_eq!(
            rendered,
            vec![
                "Error listing tables: x",
                "Error retrieving schema: x",
                "Error generating query: x",
                "Error checking query: x",
            ]
        );
    }

    #[test]
    fn usable_answer_rejects_blank_and_failures() {
        let blank = Message::answer("   \n");
        assert!(blank.as_assistant().unwrap().usable_answer().is_none());

        let failed = Message::failure(FailedAction::GeneratingQuery, "boom");
        assert!(failed.as_assistant().unwrap().usable_answer().is_none());

        let ok = Message::answer("SELECT 1");
        assert_eq!(ok.as_assistant().unwrap().usable_answer(), Some("SELECT 1"));
    }

    #[test]
    fn answer_starting_with_error_word_is_still_an_answer() {
        let msg = Message::answer("Error: looks like text but is an answer");
        let asst = msg.as_assistant().unwrap();
        assert!(asst.failure().is_none());
        assert!(asst.usable_answer().is_some());
    }

    #[test]
    fn role_tags_in_json() {
        let json = serde_json::to_value(Message::human("hi")).unwrap();
        assert_eq!(json["role"], "human");

        let json = serde_json::to_value(Message::answer("SELECT 1")).unwrap();
        assert_eq!(json["role"], "ai");
        assert_eq!(json["content"]["kind"], "answer");

        let json = serde_json::to_value(Message::failure(FailedAction::CheckingQuery, "x")).unwrap();
        assert_eq!(json["content"]["kind"], "failure");
        assert_eq!(json["content"]["action"], "checking_query");
    }

    #[test]
    fn tool_call_text_lists_calls() {
        let msg = Message::tool_calls(vec![ToolCallBlock {
            id: ToolCallId::from_raw("call_1"),
            name: "sql_db_schema".into(),
            arguments: serde_json::json!({"table_names": "users"}),
        }]);
        assert_eq!(msg.role(), "tool_call");
        assert!(msg.text().starts_with("sql_db_schema("));
    }
}
