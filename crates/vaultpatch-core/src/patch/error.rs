use serde::{Deserialize, Serialize};

/// Why a patch request could not be carried out.
///
/// Every variant is recoverable by the caller; suggestions name targets that
/// would have resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("target {target:?} matches {} locations", candidates.len())]
    AmbiguousTarget {
        target: String,
        candidates: Vec<String>,
    },

    #[error("target {target:?} not found")]
    TargetNotFound {
        target: String,
        suggestions: Vec<String>,
    },

    #[error("malformed frontmatter: {0}")]
    MalformedFrontmatter(String),

    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        suggestions: Vec<String>,
    },
}

/// Machine-readable category of a [`PatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Ambiguous,
    NotFound,
    MalformedFrontmatter,
    InvalidRequest,
}

/// Serialized form of a [`PatchError`] returned to tool callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl PatchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::AmbiguousTarget { .. } => DiagnosticKind::Ambiguous,
            Self::TargetNotFound { .. } => DiagnosticKind::NotFound,
            Self::MalformedFrontmatter(_) => DiagnosticKind::MalformedFrontmatter,
            Self::InvalidRequest { .. } => DiagnosticKind::InvalidRequest,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::AmbiguousTarget { candidates, .. } => candidates,
            Self::TargetNotFound { suggestions, .. }
            | Self::InvalidRequest { suggestions, .. } => suggestions,
            Self::MalformedFrontmatter(_) => &[],
        }
    }

    pub fn to_diagnostic(&self) -> PatchDiagnostic {
        PatchDiagnostic {
            kind: self.kind(),
            message: self.to_string(),
            suggestions: self.suggestions().to_vec(),
        }
    }

    /// Human-readable guidance: the message followed by the suggestions.
    pub fn render(&self) -> String {
        let mut out = self.to_string();
        let suggestions = self.suggestions();
        if suggestions.is_empty() {
            if let Self::TargetNotFound { .. } = self {
                out.push_str(". No similar targets exist in this note.");
            }
            return out;
        }
        let lead = match self {
            Self::AmbiguousTarget { .. } => "Qualify the target with its parent heading, one of",
            _ => "Did you mean one of",
        };
        let quoted: Vec<String> = suggestions.iter().map(|s| format!("{s:?}")).collect();
        out.push_str(&format!(". {lead}: {}?", quoted.join(", ")));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_found_render() {
        let err = PatchError::TargetNotFound {
            target: "Projcets".into(),
            suggestions: vec!["Projects".into(), "Archive".into()],
        };
        assert_eq!(
            err.render(),
            "target \"Projcets\" not found. Did you mean one of: \"Projects\", \"Archive\"?"
        );
    }

    #[test]
    fn test_not_found_without_suggestions() {
        let err = PatchError::TargetNotFound {
            target: "abc123".into(),
            suggestions: vec![],
        };
        assert!(err.render().ends_with("No similar targets exist in this note."));
    }

    #[test]
    fn test_ambiguous_render_mentions_qualification() {
        let err = PatchError::AmbiguousTarget {
            target: "Notes".into(),
            candidates: vec!["A > Notes (line 3)".into(), "B > Notes (line 9)".into()],
        };
        assert!(err.render().contains("Qualify the target"));
        assert_eq!(err.to_string(), "target \"Notes\" matches 2 locations");
    }

    #[test]
    fn test_diagnostic_json_shape() {
        let err = PatchError::MalformedFrontmatter("note has no frontmatter block".into());
        let json = serde_json::to_value(err.to_diagnostic()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "malformed_frontmatter",
                "message": "malformed frontmatter: note has no frontmatter block",
                "suggestions": []
            })
        );
    }
}
