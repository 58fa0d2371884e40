//! Patch requests: what to anchor on and where to insert.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::PatchError;

/// How heading text is compared against the requested text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    /// Surrounding whitespace ignored on both sides; still case-sensitive.
    Trimmed,
}

impl MatchMode {
    pub fn from_trim(trim_whitespace: bool) -> Self {
        if trim_whitespace {
            Self::Trimmed
        } else {
            Self::Exact
        }
    }

    pub fn matches(self, candidate: &str, requested: &str) -> bool {
        match self {
            Self::Exact => candidate == requested,
            Self::Trimmed => candidate.trim() == requested.trim(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Heading,
    Block,
    Frontmatter,
}

impl FromStr for TargetKind {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heading" => Ok(Self::Heading),
            "block" => Ok(Self::Block),
            "frontmatter" => Ok(Self::Frontmatter),
            other => Err(PatchError::InvalidRequest {
                message: format!("unknown target type {other:?}"),
                suggestions: vec!["heading".into(), "block".into(), "frontmatter".into()],
            }),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heading => "heading",
            Self::Block => "block",
            Self::Frontmatter => "frontmatter",
        })
    }
}

/// The anchor a patch is applied relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorTarget {
    Heading { text: String, mode: MatchMode },
    Block { id: String },
    Frontmatter { key: String },
}

impl AnchorTarget {
    pub fn heading(text: impl Into<String>, trim_whitespace: bool) -> Self {
        Self::Heading {
            text: text.into(),
            mode: MatchMode::from_trim(trim_whitespace),
        }
    }

    /// Block reference id, with or without its leading `^`.
    pub fn block(id: &str) -> Self {
        let id = id.trim();
        Self::Block {
            id: id.strip_prefix('^').unwrap_or(id).to_string(),
        }
    }

    pub fn frontmatter(key: impl Into<String>) -> Self {
        Self::Frontmatter { key: key.into() }
    }

    pub fn from_kind(kind: TargetKind, target: &str, trim_whitespace: bool) -> Self {
        match kind {
            TargetKind::Heading => Self::heading(target, trim_whitespace),
            TargetKind::Block => Self::block(target),
            TargetKind::Frontmatter => Self::frontmatter(target.trim()),
        }
    }

    /// Build a target from optional parts; exactly one must be set.
    pub fn from_parts(
        heading: Option<&str>,
        block: Option<&str>,
        frontmatter: Option<&str>,
        trim_whitespace: bool,
    ) -> Result<Self, PatchError> {
        match (heading, block, frontmatter) {
            (Some(h), None, None) => Ok(Self::heading(h, trim_whitespace)),
            (None, Some(b), None) => Ok(Self::block(b)),
            (None, None, Some(k)) => Ok(Self::frontmatter(k.trim())),
            (None, None, None) => Err(PatchError::invalid(
                "one of heading, block, or frontmatter target is required",
            )),
            _ => Err(PatchError::invalid(
                "only one of heading, block, or frontmatter target may be given",
            )),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Heading { .. } => TargetKind::Heading,
            Self::Block { .. } => TargetKind::Block,
            Self::Frontmatter { .. } => TargetKind::Frontmatter,
        }
    }

    /// The requested text, id, or key.
    pub fn label(&self) -> &str {
        match self {
            Self::Heading { text, .. } => text,
            Self::Block { id } => id,
            Self::Frontmatter { key } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Start,
    #[default]
    End,
    Replace,
}

impl FromStr for Position {
    type Err = PatchError;

    /// Accepts `start`/`prepend`, `end`/`append`, and `replace`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "prepend" => Ok(Self::Start),
            "end" | "append" => Ok(Self::End),
            "replace" => Ok(Self::Replace),
            other => Err(PatchError::InvalidRequest {
                message: format!("unknown position {other:?}"),
                suggestions: vec!["append".into(), "prepend".into(), "replace".into()],
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionSpec {
    pub position: Position,
    pub content: String,
    pub trim_whitespace: bool,
}

impl InsertionSpec {
    pub fn new(position: Position, content: impl Into<String>) -> Self {
        Self {
            position,
            content: content.into(),
            trim_whitespace: false,
        }
    }

    pub fn trimmed(mut self, trim_whitespace: bool) -> Self {
        self.trim_whitespace = trim_whitespace;
        self
    }

    /// Content split into lines, with surrounding blank lines dropped when
    /// trimming.
    pub(crate) fn content_lines(&self) -> Vec<String> {
        if self.content.is_empty() {
            return Vec::new();
        }
        let mut lines: Vec<String> = self
            .content
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        if self.content.ends_with('\n') {
            lines.pop();
        }
        if self.trim_whitespace {
            while lines.last().is_some_and(|l| l.trim().is_empty()) {
                lines.pop();
            }
            let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
            lines.drain(..leading);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Exact.matches("Notes", "Notes"));
        assert!(!MatchMode::Exact.matches("Notes ", "Notes"));
        assert!(MatchMode::Trimmed.matches("Notes ", "  Notes"));
        assert!(!MatchMode::Trimmed.matches("notes", "Notes"));
    }

    #[test]
    fn test_from_parts_requires_exactly_one() {
        assert_eq!(
            AnchorTarget::from_parts(Some("A"), None, None, true).unwrap(),
            AnchorTarget::Heading {
                text: "A".into(),
                mode: MatchMode::Trimmed
            }
        );
        assert!(matches!(
            AnchorTarget::from_parts(None, None, None, false),
            Err(PatchError::InvalidRequest { .. })
        ));
        assert!(matches!(
            AnchorTarget::from_parts(Some("A"), Some("b"), None, false),
            Err(PatchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_block_id_caret_optional() {
        assert_eq!(AnchorTarget::block("^abc"), AnchorTarget::block("abc"));
        assert_eq!(AnchorTarget::block(" ^abc ").label(), "abc");
    }

    #[test]
    fn test_parse_kind_and_position() {
        assert_eq!("Heading".parse::<TargetKind>().unwrap(), TargetKind::Heading);
        assert!("section".parse::<TargetKind>().is_err());
        assert_eq!("append".parse::<Position>().unwrap(), Position::End);
        assert_eq!("prepend".parse::<Position>().unwrap(), Position::Start);
        assert_eq!("replace".parse::<Position>().unwrap(), Position::Replace);
        let err = "middle".parse::<Position>().unwrap_err();
        assert_eq!(err.suggestions().len(), 3);
    }

    #[test]
    fn test_content_lines() {
        let spec = InsertionSpec::new(Position::End, "\n\nline one\r\nline two\n\n");
        assert_eq!(spec.content_lines(), vec!["", "", "line one", "line two", ""]);
        let spec = spec.trimmed(true);
        assert_eq!(spec.content_lines(), vec!["line one", "line two"]);
        assert!(InsertionSpec::new(Position::End, "").content_lines().is_empty());
        assert!(
            InsertionSpec::new(Position::End, "\n \n")
                .trimmed(true)
                .content_lines()
                .is_empty()
        );
    }
}
