use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::messages::Message;
use crate::tokens::TokenUsage;
use crate::tools::ToolDefinition;

/// How the model may use the tools offered with a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to call a tool.
    #[default]
    Auto,
    /// Model must call one of the offered tools.
    Required,
}

/// Everything a provider needs for one completion.
#[derive(Clone, Debug, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Offer tools and force the model to call one of them.
    pub fn with_forced_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self.tool_choice = ToolChoice::Required;
        self
    }
}

/// A provider reply: an `Assistant` answer or a `ToolCall` message.
#[derive(Clone, Debug)]
pub struct Completion {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

/// Trait implemented by each LLM backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_auto_without_tools() {
        let req = CompletionRequest::new(vec![Message::human("hi")]);
        assert!(req.tools.is_empty());
        assert_eq!(req.tool_choice, ToolChoice::Auto);
    }

    #[test]
    fn forced_tools_set_required_choice() {
        let def = ToolDefinition {
            name: "sql_db_schema".into(),
            description: "schema".into(),
            parameters_schema: serde_json::json!({"type": "object"}),
        };
        let req = CompletionRequest::new(vec![]).with_forced_tools(vec![def]);
        assert_eq!(req.tools.len(), 1);
        assert_eq!(req.tool_choice, ToolChoice::Required);
    }

    #[test]
    fn tool_choice_serde() {
        assert_eq!(serde_json::to_string(&ToolChoice::Required).unwrap(), r#""required""#);
        assert_eq!(serde_json::to_string(&ToolChoice::Auto).unwrap(), r#""auto""#);
    }
}
