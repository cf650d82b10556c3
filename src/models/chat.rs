use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::definition::{ToolInvocation, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    #[serde(alias = "human")]
    User,
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: TurnRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: TurnRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// Tool call summary in the shape the chat UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUsed {
    pub name: String,
    pub args: Value,
    pub output: ToolResult,
}

impl From<&ToolInvocation> for ToolUsed {
    fn from(inv: &ToolInvocation) -> Self {
        Self {
            name: inv.call.name.clone(),
            args: inv.call.arguments.clone(),
            output: inv.result.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub output: String,
    pub history: Vec<ChatTurn>,
    pub tools_used: Vec<ToolUsed>,
    pub error: Option<String>,
}
