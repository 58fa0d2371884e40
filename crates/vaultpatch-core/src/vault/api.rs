//! The vault collaborator: every operation tools perform against a vault.

use serde_json::Value;

use crate::BoxFuture;

use super::types::{Period, SearchHit};

/// Errors from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The REST API answered with a non-2xx status.
    #[error("Error {code}: {message} (HTTP {status} during {operation}){}", suffix(.suggestion))]
    Api {
        status: u16,
        code: i64,
        message: String,
        operation: &'static str,
        suggestion: Option<String>,
    },

    #[error("request failed during {operation}: {message}{}", suffix(.hint))]
    Network {
        operation: &'static str,
        message: String,
        hint: Option<String>,
    },

    #[error("unexpected response during {operation}: {message}")]
    Parse {
        operation: &'static str,
        message: String,
    },

    #[error("invalid vault request: {0}")]
    InvalidRequest(String),

    #[error("vault client setup failed: {0}")]
    Client(String),
}

fn suffix(extra: &Option<String>) -> String {
    extra
        .as_deref()
        .map(|s| format!(". {s}"))
        .unwrap_or_default()
}

impl VaultError {
    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Async operations against an Obsidian vault.
///
/// Paths are vault-relative and normalized by the implementation. Object safe
/// so tools can hold an `Arc<dyn VaultApi>`.
pub trait VaultApi: Send + Sync {
    /// Entries of the vault root (`None`) or of a directory. Directory
    /// entries end with `/`.
    fn list_files<'a>(&'a self, dir: Option<&'a str>) -> BoxFuture<'a, Result<Vec<String>, VaultError>>;

    fn get_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, VaultError>>;

    /// Create or overwrite a note.
    fn put_file<'a>(&'a self, path: &'a str, content: &'a str) -> BoxFuture<'a, Result<(), VaultError>>;

    /// Append to a note, creating it if missing.
    fn append_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), VaultError>>;

    fn delete_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), VaultError>>;

    fn simple_search<'a>(
        &'a self,
        query: &'a str,
        context_length: u32,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>, VaultError>>;

    /// JsonLogic query, evaluated by the remote API.
    fn search_json_logic<'a>(&'a self, query: &'a Value) -> BoxFuture<'a, Result<Value, VaultError>>;

    /// Dataview DQL query, evaluated by the remote API.
    fn search_dql<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Value, VaultError>>;

    /// Current periodic note for `period`.
    fn periodic_note(&self, period: Period) -> BoxFuture<'_, Result<String, VaultError>>;

    fn recent_periodic_notes(
        &self,
        period: Period,
        limit: u32,
        include_content: bool,
    ) -> BoxFuture<'_, Result<Value, VaultError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_api_error_display() {
        let err = VaultError::Api {
            status: 404,
            code: 40400,
            message: "File not found".into(),
            operation: "get_file",
            suggestion: Some("Check that the file exists".into()),
        };
        assert_eq!(
            err.to_string(),
            "Error 40400: File not found (HTTP 404 during get_file). Check that the file exists"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_network_error_without_hint() {
        let err = VaultError::Network {
            operation: "list_files",
            message: "timed out".into(),
            hint: None,
        };
        assert_eq!(err.to_string(), "request failed during list_files: timed out");
        assert_eq!(err.status(), None);
    }
}
