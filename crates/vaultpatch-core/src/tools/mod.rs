//! Named tools over the vault and the patch engine.

pub mod args;
pub mod dispatch;
pub mod registry;
pub mod types;

pub use dispatch::ToolDispatcher;
pub use registry::{RegisteredTool, ToolRegistry};
pub use types::{ToolAccess, ToolDefinition, ToolOutput};

use crate::editor::EditError;
use crate::patch::PatchError;
use crate::vault::VaultError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool {0} is disabled by configuration")]
    NotPermitted(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<EditError> for ToolError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::Vault(e) => Self::Vault(e),
            EditError::Patch(e) => Self::Patch(e),
        }
    }
}

impl ToolError {
    /// Error result shown to the caller. Patch errors carry the rendered
    /// guidance followed by the JSON diagnostic.
    pub fn to_output(&self) -> ToolOutput {
        match self {
            Self::Patch(e) => {
                let diagnostic = serde_json::to_string_pretty(&e.to_diagnostic())
                    .unwrap_or_else(|_| e.to_string());
                ToolOutput::error(format!("{}\n\n{diagnostic}", e.render()))
            }
            other => ToolOutput::error(other.to_string()),
        }
    }
}
