//! Heading index: ATX headings with their section boundaries.

use serde::Serialize;

use super::document::{Document, strip_indent};

/// Separator used when rendering a heading's ancestor path.
pub const PATH_SEPARATOR: &str = " > ";

const MAX_LEVEL: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    pub level: u8,
    pub text: String,
    pub start_line: usize,
    /// Exclusive end of the heading's own body, before its first subheading.
    pub body_end_line: usize,
    /// Exclusive end of the section, including subsections.
    pub section_end_line: usize,
    /// Index of the enclosing heading in the owning [`HeadingIndex`].
    pub parent: Option<usize>,
}

/// One row of a heading listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingSummary {
    pub level: u8,
    pub text: String,
    pub path: String,
    /// 1-based line number.
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingIndex {
    entries: Vec<HeadingEntry>,
}

impl HeadingIndex {
    /// Scan `document` once and record every heading.
    ///
    /// Open sections are tracked in a fixed array indexed by level. A heading
    /// of level L closes every open section of level L or deeper.
    pub fn build(document: &Document) -> Self {
        let lines = document.lines();
        let prose = document.prose_mask();
        let mut entries: Vec<HeadingEntry> = Vec::new();
        let mut open: [Option<usize>; MAX_LEVEL] = [None; MAX_LEVEL];

        for (i, line) in lines.iter().enumerate() {
            if !prose[i] {
                continue;
            }
            let Some((level, text)) = parse_heading(line) else {
                continue;
            };

            if let Some(prev) = entries.last_mut() {
                prev.body_end_line = prev.body_end_line.min(i);
            }

            let slot = usize::from(level) - 1;
            for open_slot in open.iter_mut().skip(slot) {
                if let Some(idx) = open_slot.take() {
                    entries[idx].section_end_line = i;
                }
            }
            let parent = open[..slot].iter().rev().find_map(|o| *o);

            open[slot] = Some(entries.len());
            entries.push(HeadingEntry {
                level,
                text: text.to_string(),
                start_line: i,
                body_end_line: lines.len(),
                section_end_line: lines.len(),
                parent,
            });
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[HeadingEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HeadingEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Texts from the outermost ancestor down to the entry itself.
    pub fn chain(&self, index: usize) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            let Some(entry) = self.entries.get(i) else {
                break;
            };
            chain.push(entry.text.as_str());
            cursor = entry.parent;
        }
        chain.reverse();
        chain
    }

    /// Ancestor path such as `"Projects > Active > Notes"`.
    pub fn path(&self, index: usize) -> String {
        self.chain(index)
            .iter()
            .map(|t| t.trim())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    /// Whether more than one heading has exactly this text.
    pub fn is_duplicated(&self, text: &str) -> bool {
        self.entries.iter().filter(|e| e.text == text).count() > 1
    }

    pub fn listing(&self) -> Vec<HeadingSummary> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| HeadingSummary {
                level: e.level,
                text: e.text.clone(),
                path: self.path(i),
                line: e.start_line + 1,
            })
            .collect()
    }
}

/// Parse an ATX heading line into its level and text.
///
/// `"## Title ##"` yields `(2, "Title")`; `"#tag"` and `"####### x"` are not
/// headings.
pub fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let rest = strip_indent(line)?;
    let hashes = rest.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > MAX_LEVEL {
        return None;
    }
    let after = &rest[hashes..];
    let text = match after.as_bytes().first() {
        None => "",
        Some(b' ' | b'\t') => &after[1..],
        Some(_) => return None,
    };
    Some((hashes as u8, strip_closing_sequence(text)))
}

fn strip_closing_sequence(text: &str) -> &str {
    let trimmed = text.trim_end_matches([' ', '\t']);
    if !trimmed.ends_with('#') {
        return text;
    }
    let without = trimmed.trim_end_matches('#');
    if without.is_empty() {
        return "";
    }
    if without.ends_with([' ', '\t']) {
        without.trim_end_matches([' ', '\t'])
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index(text: &str) -> HeadingIndex {
        HeadingIndex::build(&Document::parse(text))
    }

    #[test]
    fn test_parse_heading_variants() {
        assert_eq!(parse_heading("# Title"), Some((1, "Title")));
        assert_eq!(parse_heading("###\tTabbed"), Some((3, "Tabbed")));
        assert_eq!(parse_heading("   ## Indented"), Some((2, "Indented")));
        assert_eq!(parse_heading("## Closed ##"), Some((2, "Closed")));
        assert_eq!(parse_heading("## C#"), Some((2, "C#")));
        assert_eq!(parse_heading("## Notes "), Some((2, "Notes ")));
        assert_eq!(parse_heading("##"), Some((2, "")));
        assert_eq!(parse_heading("#tag"), None);
        assert_eq!(parse_heading("####### seven"), None);
        assert_eq!(parse_heading("    # code"), None);
        assert_eq!(parse_heading("plain"), None);
    }

    #[test]
    fn test_section_boundaries() {
        let idx = index("# A\ntext\n## B\nb\n### C\nc\n## D\n# E\n");
        let spans: Vec<_> = idx
            .entries()
            .iter()
            .map(|e| (e.text.as_str(), e.start_line, e.body_end_line, e.section_end_line, e.parent))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("A", 0, 2, 7, None),
                ("B", 2, 4, 6, Some(0)),
                ("C", 4, 6, 6, Some(1)),
                ("D", 6, 7, 7, Some(0)),
                ("E", 7, 8, 8, None),
            ]
        );
    }

    #[test]
    fn test_start_lines_strictly_increase_and_ends_bounded() {
        let idx = index("## x\n# y\n### z\n## w\n#### v\n# u\nend\n");
        let entries = idx.entries();
        for pair in entries.windows(2) {
            assert!(pair[0].start_line < pair[1].start_line);
        }
        for (i, e) in entries.iter().enumerate() {
            assert!(e.start_line < e.section_end_line);
            if let Some(next) = entries[i + 1..].iter().find(|n| n.level <= e.level) {
                assert!(e.section_end_line <= next.start_line);
            }
        }
    }

    #[test]
    fn test_skipped_levels_parent() {
        let idx = index("# Top\n### Deep\n## Mid\n");
        assert_eq!(idx.get(1).unwrap().parent, Some(0));
        assert_eq!(idx.get(2).unwrap().parent, Some(0));
        assert_eq!(idx.get(0).unwrap().section_end_line, 3);
        assert_eq!(idx.get(1).unwrap().section_end_line, 2);
    }

    #[test]
    fn test_code_and_frontmatter_ignored() {
        let idx = index("---\n# not: heading\n---\n# Real\n```\n# fake\n```\n");
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get(0).unwrap().start_line, 3);
    }

    #[test]
    fn test_paths_and_listing() {
        let idx = index("# Projects\n## Active\n### Notes\n# Archive\n## Notes\n");
        assert_eq!(idx.path(2), "Projects > Active > Notes");
        assert!(idx.is_duplicated("Notes"));
        assert!(!idx.is_duplicated("Active"));

        let listing = idx.listing();
        assert_eq!(listing.len(), 5);
        assert_eq!(
            listing[4],
            HeadingSummary {
                level: 2,
                text: "Notes".into(),
                path: "Archive > Notes".into(),
                line: 5,
            }
        );
    }

    #[test]
    fn test_no_headings() {
        assert!(index("just text\n").is_empty());
        assert!(index("").is_empty());
    }
}
