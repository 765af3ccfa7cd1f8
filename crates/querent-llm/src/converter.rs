use serde::Deserialize;
use serde_json::{json, Value};

use querent_core::errors::GatewayError;
use querent_core::ids::ToolCallId;
use querent_core::messages::{Message, ToolCallBlock};
use querent_core::provider::{CompletionRequest, ToolChoice};
use querent_core::tokens::TokenUsage;
use querent_core::tools::ToolDefinition;

/// Convert a completion request into the Chat Completions request body.
pub fn build_request_body(request: &CompletionRequest, model: &str, temperature: Option<f32>) -> Value {
    let mut body = json!({
        "model": model,
        "messages": convert_messages(&request.messages),
    });

    if let Some(temp) = temperature {
        body["temperature"] = json!(temp);
    }

    if !request.tools.is_empty() {
        body["tools"] = json!(request.tools.iter().map(convert_tool).collect::<Vec<_>>());
        body["tool_choice"] = convert_tool_choice(&request.tool_choice);
    }

    body
}

fn convert_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| match msg {
            Message::System(m) => json!({"role": "system", "content": m.content}),
            Message::Human(m) => json!({"role": "user", "content": m.content}),
            Message::Assistant(m) => json!({"role": "assistant", "content": m.text()}),
            Message::ToolCall(m) => json!({
                "role": "assistant",
                "content": Value::Null,
                "tool_calls": m.calls.iter().map(convert_tool_call).collect::<Vec<_>>(),
            }),
            Message::ToolResult(m) => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id.as_str(),
                "content": m.content,
            }),
        })
        .collect()
}

fn convert_tool_call(tc: &ToolCallBlock) -> Value {
    json!({
        "id": tc.id.as_str(),
        "type": "function",
        "function": {
            "name": tc.name,
            "arguments": tc.arguments.to_string(),
        }
    })
}

fn convert_tool(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters_schema,
        }
    })
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
    }
}

// --- Response parsing ---

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseToolCall {
    pub id: String,
    pub function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
pub struct ResponseFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Turn the first choice into an answer or a tool-call message.
pub fn parse_response(resp: ChatCompletionResponse) -> Result<(Message, Option<TokenUsage>), GatewayError> {
    let usage = resp.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::MalformedResponse("response has no choices".into()))?;

    if choice.message.tool_calls.is_empty() {
        let text = choice.message.content.unwrap_or_default();
        return Ok((Message::answer(text), usage));
    }

    let calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| {
            let arguments = if tc.function.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&tc.function.arguments).map_err(|e| {
                    GatewayError::MalformedResponse(format!(
                        "arguments for {} are not valid JSON: {e}",
                        tc.function.name
                    ))
                })?
            };
            Ok(ToolCallBlock {
                id: ToolCallId::from_raw(tc.id),
                name: tc.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;

    Ok((Message::tool_calls(calls), usage))
}
