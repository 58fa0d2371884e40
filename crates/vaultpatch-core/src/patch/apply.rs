//! Rewrites a document at a resolved anchor.

use super::document::Document;
use super::error::PatchError;
use super::frontmatter::format_field;
use super::resolve::{Anchor, Resolution};
use super::target::{InsertionSpec, Position};

/// Apply `spec` at the anchor held by `resolution`.
///
/// Only `Resolution::Resolved` is accepted; the input document is left
/// untouched and the patched copy is returned.
pub fn apply(
    document: &Document,
    resolution: &Resolution,
    spec: &InsertionSpec,
) -> Result<Document, PatchError> {
    let Resolution::Resolved(anchor) = resolution else {
        return Err(PatchError::invalid("anchor not resolved"));
    };
    apply_at(document, anchor, spec)
}

pub(crate) fn apply_at(
    document: &Document,
    anchor: &Anchor,
    spec: &InsertionSpec,
) -> Result<Document, PatchError> {
    let content = spec.content_lines();
    if content.is_empty() && spec.position != Position::Replace {
        return Err(PatchError::invalid(
            "content must not be empty when inserting; use replace to clear a target",
        ));
    }

    let mut out = document.clone();
    match anchor {
        Anchor::Heading { entry, .. } => {
            let body_start = entry.start_line + 1;
            match spec.position {
                Position::Start => {
                    insert_block(&mut out, body_start, content, spec.trim_whitespace, true);
                }
                Position::End => {
                    let at = if spec.trim_whitespace {
                        last_content_end(document, body_start, entry.section_end_line)
                    } else {
                        entry.section_end_line
                    };
                    insert_block(&mut out, at, content, spec.trim_whitespace, at == body_start);
                }
                Position::Replace => {
                    let end = last_content_end(document, body_start, entry.body_end_line);
                    out.splice(body_start..end, Vec::new());
                    if !content.is_empty() {
                        insert_block(&mut out, body_start, content, spec.trim_whitespace, true);
                    }
                }
            }
        }
        Anchor::Block { id, line } => match spec.position {
            Position::Start => insert_block(&mut out, *line, content, spec.trim_whitespace, false),
            Position::End => insert_block(&mut out, line + 1, content, spec.trim_whitespace, false),
            Position::Replace => {
                let marker = format!("^{id}");
                let mut lines = content;
                match lines.last_mut() {
                    Some(last) if last.trim().is_empty() => *last = marker,
                    Some(last) => {
                        let kept = last.trim_end().to_string();
                        *last = format!("{kept} {marker}");
                    }
                    None => lines.push(marker),
                }
                out.splice(*line..line + 1, lines);
            }
        },
        Anchor::Frontmatter { field, .. } => {
            // Blank lines would end the YAML mapping early, so never add any.
            let content: Vec<String> = content
                .into_iter()
                .filter(|l| !(spec.trim_whitespace && l.trim().is_empty()))
                .collect();
            match spec.position {
                Position::Start => out.insert_lines(field.line, content),
                Position::End => out.insert_lines(field.end_line, content),
                Position::Replace => {
                    let replacement = replace_field(&field.key, content);
                    out.splice(field.line..field.end_line, replacement);
                }
            }
        }
    }
    Ok(out)
}

/// Exclusive end of the last non-blank line in `start..end`, or `start` if
/// the range holds only blank lines.
fn last_content_end(document: &Document, start: usize, end: usize) -> usize {
    (start..end)
        .rev()
        .find(|&i| !document.is_blank(i))
        .map_or(start, |i| i + 1)
}

/// Insert `content` at `at`. When trimming, separate it from non-blank
/// neighbours with one blank line; `after_heading` suppresses the separator
/// above, where the neighbour is the anchor heading itself.
fn insert_block(
    document: &mut Document,
    at: usize,
    mut content: Vec<String>,
    trim: bool,
    after_heading: bool,
) {
    if trim {
        let above_is_text = at > 0 && !document.is_blank(at - 1);
        if above_is_text && !after_heading {
            content.insert(0, String::new());
        }
        if at < document.len() && !document.is_blank(at) {
            content.push(String::new());
        }
    }
    document.insert_lines(at, content);
}

fn replace_field(key: &str, content: Vec<String>) -> Vec<String> {
    match content.as_slice() {
        [] => vec![format_field(key, "")],
        [single] => vec![format_field(key, single.trim())],
        _ => {
            let mut lines = vec![format_field(key, "")];
            lines.extend(content.into_iter().map(|l| {
                if l.starts_with([' ', '\t']) || l.is_empty() {
                    l
                } else {
                    format!("  {l}")
                }
            }));
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::index::HeadingIndex;
    use crate::patch::resolve::Resolver;
    use crate::patch::target::AnchorTarget;
    use pretty_assertions::assert_eq;

    fn patch(text: &str, target: AnchorTarget, spec: InsertionSpec) -> Result<String, PatchError> {
        let doc = Document::parse(text);
        let index = HeadingIndex::build(&doc);
        let resolution = Resolver::new(&doc, &index).resolve(&target)?;
        apply(&doc, &resolution, &spec).map(|d| d.render())
    }

    fn heading(text: &str) -> AnchorTarget {
        AnchorTarget::heading(text, true)
    }

    #[test]
    fn test_end_of_section_without_trim() {
        let out = patch(
            "# A\none\n# B\n",
            AnchorTarget::heading("A", false),
            InsertionSpec::new(Position::End, "two"),
        )
        .unwrap();
        assert_eq!(out, "# A\none\ntwo\n# B\n");
    }

    #[test]
    fn test_end_on_empty_section_lands_before_next_heading() {
        let out = patch(
            "## Empty\n## Next\n",
            AnchorTarget::heading("Empty", false),
            InsertionSpec::new(Position::End, "- item"),
        )
        .unwrap();
        assert_eq!(out, "## Empty\n- item\n## Next\n");
    }

    #[test]
    fn test_end_with_trim_keeps_trailing_blank_before_next_heading() {
        let out = patch(
            "## Tasks\n- a\n\n## Done\n",
            heading("Tasks"),
            InsertionSpec::new(Position::End, "\n- b\n\n").trimmed(true),
        )
        .unwrap();
        assert_eq!(out, "## Tasks\n- a\n\n- b\n\n## Done\n");
    }

    #[test]
    fn test_end_of_parent_includes_subsections() {
        let out = patch(
            "# A\n## A1\ntext\n# B\n",
            heading("A"),
            InsertionSpec::new(Position::End, "tail").trimmed(true),
        )
        .unwrap();
        assert_eq!(out, "# A\n## A1\ntext\n\ntail\n\n# B\n");
    }

    #[test]
    fn test_start_inserts_after_heading_line() {
        let out = patch(
            "# Log\nold entry\n",
            heading("Log"),
            InsertionSpec::new(Position::Start, "new entry").trimmed(true),
        )
        .unwrap();
        assert_eq!(out, "# Log\nnew entry\n\nold entry\n");
    }

    #[test]
    fn test_start_without_trim_is_verbatim() {
        let out = patch(
            "# Log\nold\n",
            AnchorTarget::heading("Log", false),
            InsertionSpec::new(Position::Start, "new\n"),
        )
        .unwrap();
        assert_eq!(out, "# Log\nnew\nold\n");
    }

    #[test]
    fn test_replace_keeps_subsections() {
        let out = patch(
            "# A\nold body\nmore\n\n## Child\nkept\n",
            heading("A"),
            InsertionSpec::new(Position::Replace, "fresh"),
        )
        .unwrap();
        assert_eq!(out, "# A\nfresh\n\n## Child\nkept\n");
    }

    #[test]
    fn test_replace_with_empty_clears_body() {
        let out = patch(
            "# A\nold\n# B\n",
            heading("A"),
            InsertionSpec::new(Position::Replace, ""),
        )
        .unwrap();
        assert_eq!(out, "# A\n# B\n");
    }

    #[test]
    fn test_empty_content_rejected_for_insert() {
        let err = patch("# A\n", heading("A"), InsertionSpec::new(Position::End, "")).unwrap_err();
        assert!(matches!(err, PatchError::InvalidRequest { .. }));
    }

    #[test]
    fn test_block_end_and_start() {
        let text = "para ^p1\nnext\n";
        let out = patch(
            text,
            AnchorTarget::block("p1"),
            InsertionSpec::new(Position::End, "after"),
        )
        .unwrap();
        assert_eq!(out, "para ^p1\nafter\nnext\n");

        let out = patch(
            text,
            AnchorTarget::block("p1"),
            InsertionSpec::new(Position::Start, "before").trimmed(true),
        )
        .unwrap();
        assert_eq!(out, "before\n\npara ^p1\nnext\n");
    }

    #[test]
    fn test_block_replace_keeps_marker() {
        let out = patch(
            "old text ^p1\n",
            AnchorTarget::block("^p1"),
            InsertionSpec::new(Position::Replace, "new text"),
        )
        .unwrap();
        assert_eq!(out, "new text ^p1\n");
    }

    #[test]
    fn test_frontmatter_replace_and_insert() {
        let text = "---\ntitle: T\nstatus: draft\n---\nbody\n";
        let out = patch(
            text,
            AnchorTarget::frontmatter("status"),
            InsertionSpec::new(Position::Replace, "done"),
        )
        .unwrap();
        assert_eq!(out, "---\ntitle: T\nstatus: done\n---\nbody\n");

        let out = patch(
            text,
            AnchorTarget::frontmatter("title"),
            InsertionSpec::new(Position::End, "\nauthor: me\n").trimmed(true),
        )
        .unwrap();
        assert_eq!(out, "---\ntitle: T\nauthor: me\nstatus: draft\n---\nbody\n");
    }

    #[test]
    fn test_frontmatter_replace_list_value() {
        let out = patch(
            "---\naliases: x\n---\n",
            AnchorTarget::frontmatter("aliases"),
            InsertionSpec::new(Position::Replace, "- one\n- two"),
        )
        .unwrap();
        assert_eq!(out, "---\naliases:\n  - one\n  - two\n---\n");
    }

    #[test]
    fn test_unresolved_rejected() {
        let doc = Document::parse("# A\n");
        let err = apply(
            &doc,
            &Resolution::NotFound(vec![]),
            &InsertionSpec::new(Position::End, "x"),
        )
        .unwrap_err();
        assert_eq!(err, PatchError::invalid("anchor not resolved"));
    }

    #[test]
    fn test_crlf_preserved_through_patch() {
        let out = patch(
            "# A\r\nbody\r\n",
            heading("A"),
            InsertionSpec::new(Position::End, "more"),
        )
        .unwrap();
        assert_eq!(out, "# A\r\nbody\r\nmore\r\n");
    }
}
