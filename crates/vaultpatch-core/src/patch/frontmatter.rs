//! Leading YAML frontmatter: block detection, field spans, and tag edits.
//!
//! The block is handled as text. Only top-level keys are recognized; nested
//! mappings and list items are treated as continuation lines of the key
//! that precedes them.

use super::document::Document;
use super::error::PatchError;

/// Location of a closed frontmatter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontmatterBlock {
    /// Line of the opening `---` fence (always 0).
    pub open_line: usize,
    /// Line of the closing `---` or `...` fence.
    pub close_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterState {
    /// The note does not start with a `---` fence.
    Absent,
    /// An opening fence with no closing fence.
    Unterminated,
    Present(FrontmatterBlock),
}

/// A top-level key and the lines its value occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpan {
    pub key: String,
    /// Line holding `key:`.
    pub line: usize,
    /// Exclusive end of the key line plus its continuation lines.
    pub end_line: usize,
}

pub fn locate(lines: &[String]) -> FrontmatterState {
    match lines.first() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return FrontmatterState::Absent,
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| matches!(l.trim_end(), "---" | "..."))
        .map_or(FrontmatterState::Unterminated, |(close_line, _)| {
            FrontmatterState::Present(FrontmatterBlock {
                open_line: 0,
                close_line,
            })
        })
}

/// Locate the block or fail with `MalformedFrontmatter`.
pub fn require(lines: &[String]) -> Result<FrontmatterBlock, PatchError> {
    match locate(lines) {
        FrontmatterState::Present(block) => Ok(block),
        FrontmatterState::Absent => Err(PatchError::MalformedFrontmatter(
            "note has no frontmatter block".to_string(),
        )),
        FrontmatterState::Unterminated => Err(PatchError::MalformedFrontmatter(
            "frontmatter block opened on line 1 is never closed".to_string(),
        )),
    }
}

impl FrontmatterBlock {
    pub fn fields(&self, lines: &[String]) -> Vec<FieldSpan> {
        let mut fields: Vec<FieldSpan> = Vec::new();
        let mut last_content = self.open_line;

        for i in (self.open_line + 1)..self.close_line {
            let line = &lines[i];
            if let Some(key) = parse_key(line) {
                if let Some(prev) = fields.last_mut() {
                    prev.end_line = last_content + 1;
                }
                fields.push(FieldSpan {
                    key: key.to_string(),
                    line: i,
                    end_line: i + 1,
                });
                last_content = i;
            } else if !line.trim().is_empty() && !line.trim_start().starts_with('#') {
                last_content = i;
            }
        }
        if let Some(prev) = fields.last_mut() {
            prev.end_line = last_content.max(prev.line) + 1;
        }
        fields
    }

    pub fn field(&self, lines: &[String], key: &str) -> Option<FieldSpan> {
        let key = key.trim();
        self.fields(lines).into_iter().find(|f| f.key == key)
    }
}

/// Parse a top-level `key:` line, returning the unquoted key.
fn parse_key(line: &str) -> Option<&str> {
    if line.starts_with([' ', '\t', '#', '-']) {
        return None;
    }
    let colon = line.find(':')?;
    let after = &line[colon + 1..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }
    let key = line[..colon].trim();
    let key = key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(key);
    (!key.is_empty()).then_some(key)
}

/// Render a `key: value` line, or a bare `key:` for an empty value.
pub fn format_field(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{key}:")
    } else {
        format!("{key}: {value}")
    }
}

/// Ensure a frontmatter block exists, creating an empty one at the top of the
/// note if needed. Returns `true` when a block was created.
pub fn ensure_block(document: &mut Document) -> Result<bool, PatchError> {
    match locate(document.lines()) {
        FrontmatterState::Present(_) => Ok(false),
        FrontmatterState::Unterminated => require(document.lines()).map(|_| false),
        FrontmatterState::Absent => {
            document.insert_lines(0, vec!["---".to_string(), "---".to_string()]);
            Ok(true)
        }
    }
}

/// Append `key:` as the last field of the block. The block must exist.
pub fn insert_key(document: &mut Document, key: &str) -> Result<FieldSpan, PatchError> {
    let block = require(document.lines())?;
    let line = block.close_line;
    document.insert_lines(line, vec![format_field(key.trim(), "")]);
    Ok(FieldSpan {
        key: key.trim().to_string(),
        line,
        end_line: line + 1,
    })
}

/// Add `tag` to the `tags` field, creating the block or field when missing.
///
/// Handles inline lists (`tags: [a, b]`), scalars (`tags: a`), and block
/// lists. Returns `false` when the tag was already present.
pub fn add_tag(document: &mut Document, tag: &str) -> Result<bool, PatchError> {
    let tag = tag.trim().trim_start_matches('#');
    if tag.is_empty() {
        return Err(PatchError::invalid("tag must not be empty"));
    }

    ensure_block(document)?;
    let block = require(document.lines())?;
    let Some(field) = block.field(document.lines(), "tags") else {
        let at = block.close_line;
        document.insert_lines(at, vec![format!("tags: [{tag}]")]);
        return Ok(true);
    };

    let key_line = document.lines()[field.line].clone();
    let value = key_line
        .split_once(':')
        .map(|(_, v)| v.trim())
        .unwrap_or_default();

    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        let mut tags: Vec<String> = inner
            .split(',')
            .map(|t| unquote(t.trim()).to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tags.iter().any(|t| t == tag) {
            return Ok(false);
        }
        tags.push(tag.to_string());
        document.splice(
            field.line..field.line + 1,
            vec![format!("tags: [{}]", tags.join(", "))],
        );
        return Ok(true);
    }

    if !value.is_empty() {
        let existing: Vec<&str> = value
            .split([',', ' '])
            .map(|t| unquote(t.trim()))
            .filter(|t| !t.is_empty())
            .collect();
        if existing.contains(&tag) {
            return Ok(false);
        }
        let mut tags: Vec<String> = existing.iter().map(|t| t.to_string()).collect();
        tags.push(tag.to_string());
        document.splice(
            field.line..field.line + 1,
            vec![format!("tags: [{}]", tags.join(", "))],
        );
        return Ok(true);
    }

    // Block list: `tags:` followed by `- item` lines.
    let items = &document.lines()[field.line + 1..field.end_line];
    if items
        .iter()
        .filter_map(|l| l.trim().strip_prefix('-'))
        .any(|item| unquote(item.trim()) == tag)
    {
        return Ok(false);
    }
    let indent = items
        .iter()
        .find(|l| l.trim_start().starts_with('-'))
        .map(|l| &l[..l.len() - l.trim_start().len()])
        .unwrap_or("  ")
        .to_string();
    document.insert_lines(field.end_line, vec![format!("{indent}- {tag}")]);
    Ok(true)
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(text: &str) -> Vec<String> {
        Document::parse(text).lines().to_vec()
    }

    #[test]
    fn test_locate_present() {
        let l = lines("---\ntitle: A\n---\n# Body\n");
        assert_eq!(
            locate(&l),
            FrontmatterState::Present(FrontmatterBlock {
                open_line: 0,
                close_line: 2
            })
        );
    }

    #[test]
    fn test_locate_dot_terminator() {
        let l = lines("---\ntitle: A\n...\n");
        assert!(matches!(locate(&l), FrontmatterState::Present(b) if b.close_line == 2));
    }

    #[test]
    fn test_locate_absent_and_unterminated() {
        assert_eq!(locate(&lines("# Title\n---\n")), FrontmatterState::Absent);
        assert_eq!(locate(&lines("---\ntitle: A\n")), FrontmatterState::Unterminated);
        assert_eq!(locate(&[]), FrontmatterState::Absent);
    }

    #[test]
    fn test_require_reports_malformed() {
        let err = require(&lines("---\ntitle: A\n")).unwrap_err();
        assert!(matches!(err, PatchError::MalformedFrontmatter(_)));
    }

    #[test]
    fn test_fields_with_continuations() {
        let l = lines("---\ntitle: A\ntags:\n  - one\n  - two\n\nstatus: draft\n---\n");
        let block = require(&l).unwrap();
        let fields = block.fields(&l);
        assert_eq!(
            fields,
            vec![
                FieldSpan { key: "title".into(), line: 1, end_line: 2 },
                FieldSpan { key: "tags".into(), line: 2, end_line: 5 },
                FieldSpan { key: "status".into(), line: 6, end_line: 7 },
            ]
        );
    }

    #[test]
    fn test_quoted_key_and_url_value() {
        let l = lines("---\n\"my key\": 1\nsource: https://example.com\n---\n");
        let block = require(&l).unwrap();
        let keys: Vec<_> = block.fields(&l).into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["my key", "source"]);
    }

    #[test]
    fn test_ensure_block_creates() {
        let mut doc = Document::parse("# Note\n");
        assert!(ensure_block(&mut doc).unwrap());
        assert_eq!(doc.render(), "---\n---\n# Note\n");
        assert!(!ensure_block(&mut doc).unwrap());
    }

    #[test]
    fn test_insert_key_before_close() {
        let mut doc = Document::parse("---\ntitle: A\n---\n");
        let span = insert_key(&mut doc, "status").unwrap();
        assert_eq!(span.line, 2);
        assert_eq!(doc.render(), "---\ntitle: A\nstatus:\n---\n");
    }

    #[test]
    fn test_add_tag_inline_list() {
        let mut doc = Document::parse("---\ntags: [a, \"b\"]\n---\n");
        assert!(add_tag(&mut doc, "c").unwrap());
        assert_eq!(doc.render(), "---\ntags: [a, b, c]\n---\n");
        assert!(!add_tag(&mut doc, "#c").unwrap());
    }

    #[test]
    fn test_add_tag_scalar() {
        let mut doc = Document::parse("---\ntags: project\n---\n");
        assert!(add_tag(&mut doc, "urgent").unwrap());
        assert_eq!(doc.render(), "---\ntags: [project, urgent]\n---\n");
    }

    #[test]
    fn test_add_tag_block_list_keeps_indent() {
        let mut doc = Document::parse("---\ntags:\n    - a\ntitle: T\n---\n");
        assert!(add_tag(&mut doc, "b").unwrap());
        assert_eq!(doc.render(), "---\ntags:\n    - a\n    - b\ntitle: T\n---\n");
        assert!(!add_tag(&mut doc, "a").unwrap());
    }

    #[test]
    fn test_add_tag_without_frontmatter() {
        let mut doc = Document::parse("Body\n");
        assert!(add_tag(&mut doc, "new").unwrap());
        assert_eq!(doc.render(), "---\ntags: [new]\n---\nBody\n");
    }

    #[test]
    fn test_add_tag_empty_rejected() {
        let mut doc = Document::parse("Body\n");
        assert!(matches!(
            add_tag(&mut doc, " # "),
            Err(PatchError::InvalidRequest { .. })
        ));
    }
}
