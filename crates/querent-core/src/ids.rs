use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlates a tool call with its result. Generated ids are `call_<uuid v7>`;
/// ids issued by a provider are kept verbatim.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCallId(String);

impl ToolCallId {
    pub fn new() -> Self {
        Self(format!("call_{}", Uuid::now_v7().simple()))
    }

    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ToolCallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
