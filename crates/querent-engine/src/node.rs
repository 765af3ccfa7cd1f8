use std::fmt;

use serde::Serialize;

use querent_core::messages::Message;

use crate::log::ConversationLog;

/// Steps of the question-to-query pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    ListTables,
    CallGetSchema,
    GetSchema,
    GenerateQuery,
    CheckQuery,
}

impl Node {
    pub const START: Node = Node::ListTables;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListTables => "list_tables",
            Self::CallGetSchema => "call_get_schema",
            Self::GetSchema => "get_schema",
            Self::GenerateQuery => "generate_query",
            Self::CheckQuery => "check_query",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Next(Node),
    End,
}

/// Where to go after `node` has appended its messages to `log`.
///
/// Every edge is fixed except the one out of `GenerateQuery`, which checks
/// the query only when the last message is a usable answer.
pub fn next_transition(node: Node, log: &ConversationLog) -> Transition {
    match node {
        Node::ListTables => Transition::Next(Node::CallGetSchema),
        Node::CallGetSchema => Transition::Next(Node::GetSchema),
        Node::GetSchema => Transition::Next(Node::GenerateQuery),
        Node::GenerateQuery => match log.last() {
            Some(Message::Assistant(m)) if m.usable_answer().is_some() => {
                Transition::Next(Node::CheckQuery)
            }
            _ => Transition::End,
        },
        Node::CheckQuery => Transition::End,
    }
}
