use serde::{Deserialize, Serialize};

/// A tool as advertised to MCP hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    #[serde(rename = "inputSchema")]
    pub parameters: serde_json::Value,
}

/// What a tool is allowed to do to the vault.
///
/// Ordered so that a ceiling admits every level at or below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAccess {
    #[default]
    Read,
    Write,
    Destructive,
}

impl ToolAccess {
    /// Highest access level permitted by the `[tools]` config section.
    pub fn ceiling(read_only: bool, allow_delete: bool) -> Self {
        if read_only {
            Self::Read
        } else if allow_delete {
            Self::Destructive
        } else {
            Self::Write
        }
    }
}

/// Text returned from a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// Set when the call failed in a way the caller should see and act on.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}
