//! Target resolution against a document and its heading index.

use tracing::debug;

use super::document::Document;
use super::error::PatchError;
use super::frontmatter::{self, FieldSpan, FrontmatterBlock};
use super::index::{HeadingEntry, HeadingIndex, PATH_SEPARATOR};
use super::target::{AnchorTarget, MatchMode};

/// Default cap on suggestions attached to a not-found diagnostic.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

/// A located anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Heading { entry: HeadingEntry, path: String },
    Block { id: String, line: usize },
    Frontmatter { field: FieldSpan, block: FrontmatterBlock },
}

impl Anchor {
    /// Line the anchor starts on (0-based).
    pub fn line(&self) -> usize {
        match self {
            Self::Heading { entry, .. } => entry.start_line,
            Self::Block { line, .. } => *line,
            Self::Frontmatter { field, .. } => field.line,
        }
    }

    /// Short description used in diagnostics, e.g. `"A > Notes (line 3)"`.
    pub fn describe(&self) -> String {
        let line = self.line() + 1;
        match self {
            Self::Heading { path, .. } => format!("{path} (line {line})"),
            Self::Block { id, .. } => format!("^{id} (line {line})"),
            Self::Frontmatter { field, .. } => format!("{} (line {line})", field.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Anchor),
    Ambiguous(Vec<Anchor>),
    NotFound(Vec<String>),
}

impl Resolution {
    /// Convert a non-resolved outcome into the matching [`PatchError`].
    pub fn into_anchor(self, target: &AnchorTarget) -> Result<Anchor, PatchError> {
        match self {
            Self::Resolved(anchor) => Ok(anchor),
            Self::Ambiguous(candidates) => Err(PatchError::AmbiguousTarget {
                target: target.label().to_string(),
                candidates: candidates.iter().map(Anchor::describe).collect(),
            }),
            Self::NotFound(suggestions) => Err(PatchError::TargetNotFound {
                target: target.label().to_string(),
                suggestions,
            }),
        }
    }
}

pub struct Resolver<'a> {
    document: &'a Document,
    index: &'a HeadingIndex,
    max_suggestions: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Document, index: &'a HeadingIndex) -> Self {
        Self {
            document,
            index,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    pub fn resolve(&self, target: &AnchorTarget) -> Result<Resolution, PatchError> {
        let resolution = match target {
            AnchorTarget::Heading { text, mode } => self.resolve_heading(text, *mode)?,
            AnchorTarget::Block { id } => self.resolve_block(id)?,
            AnchorTarget::Frontmatter { key } => self.resolve_frontmatter(key)?,
        };
        let outcome = match &resolution {
            Resolution::Resolved(_) => "resolved",
            Resolution::Ambiguous(_) => "ambiguous",
            Resolution::NotFound(_) => "not_found",
        };
        debug!(kind = %target.kind(), requested = target.label(), outcome, "resolved patch target");
        Ok(resolution)
    }

    fn resolve_heading(&self, text: &str, mode: MatchMode) -> Result<Resolution, PatchError> {
        if text.trim().is_empty() {
            return Err(PatchError::InvalidRequest {
                message: "heading target must not be empty".into(),
                suggestions: self.index.listing().into_iter().map(|h| h.path).collect(),
            });
        }

        let segments = split_path(text);
        let mut found: Vec<Anchor> = Vec::new();
        for (i, entry) in self.index.entries().iter().enumerate() {
            let direct = mode.matches(&entry.text, text);
            let qualified = segments
                .as_deref()
                .is_some_and(|segs| self.chain_ends_with(i, segs, mode));
            if direct || qualified {
                found.push(Anchor::Heading {
                    entry: entry.clone(),
                    path: self.index.path(i),
                });
            }
        }

        Ok(match found.len() {
            0 => Resolution::NotFound(self.heading_suggestions(text)),
            1 => Resolution::Resolved(found.remove(0)),
            _ => Resolution::Ambiguous(found),
        })
    }

    fn chain_ends_with(&self, index: usize, segments: &[&str], mode: MatchMode) -> bool {
        let chain = self.index.chain(index);
        if chain.len() < segments.len() {
            return false;
        }
        chain
            .iter()
            .rev()
            .zip(segments.iter().rev())
            .all(|(have, want)| mode.matches(have, want))
    }

    fn heading_suggestions(&self, requested: &str) -> Vec<String> {
        let labels = self.index.entries().iter().enumerate().map(|(i, e)| {
            if self.index.is_duplicated(&e.text) {
                self.index.path(i)
            } else {
                e.text.clone()
            }
        });
        rank_suggestions(requested, labels, self.max_suggestions)
    }

    fn resolve_block(&self, id: &str) -> Result<Resolution, PatchError> {
        let id = id.trim().trim_start_matches('^');
        if id.is_empty() || id.contains(char::is_whitespace) {
            return Err(PatchError::invalid(format!(
                "block reference id {id:?} must be non-empty and contain no whitespace"
            )));
        }

        let marker = format!("^{id}");
        let prose = self.document.prose_mask();
        let mut found: Vec<Anchor> = self
            .document
            .lines()
            .iter()
            .enumerate()
            .filter(|(i, line)| prose[*i] && has_block_marker(line, &marker))
            .map(|(line, _)| Anchor::Block {
                id: id.to_string(),
                line,
            })
            .collect();

        Ok(match found.len() {
            0 => Resolution::NotFound(Vec::new()),
            1 => Resolution::Resolved(found.remove(0)),
            _ => Resolution::Ambiguous(found),
        })
    }

    fn resolve_frontmatter(&self, key: &str) -> Result<Resolution, PatchError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(PatchError::invalid("frontmatter key must not be empty"));
        }
        let lines = self.document.lines();
        let block = frontmatter::require(lines)?;
        let fields = block.fields(lines);

        let mut found: Vec<Anchor> = fields
            .iter()
            .filter(|f| f.key == key)
            .map(|f| Anchor::Frontmatter {
                field: f.clone(),
                block,
            })
            .collect();

        Ok(match found.len() {
            0 => Resolution::NotFound(rank_suggestions(
                key,
                fields.into_iter().map(|f| f.key),
                self.max_suggestions,
            )),
            1 => Resolution::Resolved(found.remove(0)),
            _ => Resolution::Ambiguous(found),
        })
    }
}

/// Split `"A > B"` on the `" > "` separator into trimmed segments. `None`
/// unless at least two non-empty segments are present, so heading text such
/// as `"Input -> Output"` or `"C++::Templates"` is never split.
pub fn split_path(text: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = text.split(PATH_SEPARATOR).map(str::trim).collect();
    (segments.len() >= 2 && segments.iter().all(|s| !s.is_empty())).then_some(segments)
}

fn has_block_marker(line: &str, marker: &str) -> bool {
    let line = line.trim_end();
    let Some(prefix) = line.strip_suffix(marker) else {
        return false;
    };
    prefix.is_empty() || prefix.ends_with(char::is_whitespace)
}

/// Rank `labels` by closeness to `requested`: substring relation first, then
/// edit distance, then original order. Duplicates are dropped.
fn rank_suggestions(
    requested: &str,
    labels: impl Iterator<Item = String>,
    max: usize,
) -> Vec<String> {
    let wanted = requested.trim().to_lowercase();
    let mut scored: Vec<(u8, usize, usize, String)> = Vec::new();
    for (order, label) in labels.enumerate() {
        if scored.iter().any(|(_, _, _, l)| *l == label) {
            continue;
        }
        let have = label.trim().to_lowercase();
        let related = !have.is_empty()
            && !wanted.is_empty()
            && (have.contains(&wanted) || wanted.contains(&have));
        let tier = if related { 0 } else { 1 };
        scored.push((tier, levenshtein(&have, &wanted), order, label));
    }
    scored.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
    scored.into_iter().take(max).map(|(.., l)| l).collect()
}

/// Levenshtein distance over chars with two rolling rows.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(text: &str, target: &AnchorTarget) -> Result<Resolution, PatchError> {
        let doc = Document::parse(text);
        let index = HeadingIndex::build(&doc);
        Resolver::new(&doc, &index).resolve(target)
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("projcets", "projects"), 2);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_exact_heading() {
        let res = resolve("# A\n## Tasks\n- x\n", &AnchorTarget::heading("Tasks", false)).unwrap();
        match res {
            Resolution::Resolved(Anchor::Heading { entry, path }) => {
                assert_eq!(entry.start_line, 1);
                assert_eq!(path, "A > Tasks");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_trimmed_matching_ignores_request_whitespace() {
        let doc = "## Tasks  \nbody\n";
        for request in ["Tasks", "  Tasks", "Tasks\t", " Tasks  "] {
            let res = resolve(doc, &AnchorTarget::heading(request, true)).unwrap();
            assert!(
                matches!(res, Resolution::Resolved(ref a) if a.line() == 0),
                "request {request:?} gave {res:?}"
            );
        }
        let exact = resolve(doc, &AnchorTarget::heading("Tasks", false)).unwrap();
        assert!(matches!(exact, Resolution::NotFound(_)));
    }

    #[test]
    fn test_duplicate_headings_are_ambiguous() {
        let res = resolve(
            "# A\n## Notes\n# B\n## Notes\n",
            &AnchorTarget::heading("Notes", false),
        )
        .unwrap();
        let Resolution::Ambiguous(candidates) = res else {
            panic!("expected ambiguity");
        };
        assert_eq!(candidates.len(), 2);
        assert_ne!(candidates[0].line(), candidates[1].line());
        assert_eq!(candidates[0].describe(), "A > Notes (line 2)");
    }

    #[test]
    fn test_qualified_path_disambiguates() {
        let text = "# A\n## Notes\n# B\n## Notes\n";
        let res = resolve(text, &AnchorTarget::heading("B > Notes", false)).unwrap();
        assert!(matches!(res, Resolution::Resolved(ref a) if a.line() == 3));
    }

    #[test]
    fn test_not_found_suggests_close_match() {
        let res = resolve(
            "# Projects\n# Archive\n# Inbox\n",
            &AnchorTarget::heading("Projcets", false),
        )
        .unwrap();
        let Resolution::NotFound(suggestions) = res else {
            panic!("expected not found");
        };
        assert_eq!(suggestions[0], "Projects");
    }

    #[test]
    fn test_suggestions_prefer_substrings_and_cap() {
        let text = "# Meeting Notes\n# Notes Archive\n# Nodes\n# A\n# B\n# C\n# D\n";
        let doc = Document::parse(text);
        let index = HeadingIndex::build(&doc);
        let res = Resolver::new(&doc, &index)
            .with_max_suggestions(3)
            .resolve(&AnchorTarget::heading("notes", false))
            .unwrap();
        assert_eq!(
            res,
            Resolution::NotFound(vec![
                "Meeting Notes".into(),
                "Notes Archive".into(),
                "Nodes".into(),
            ])
        );
    }

    #[test]
    fn test_suggestions_qualify_duplicates() {
        let res = resolve(
            "# A\n## Notes\n# B\n## Notes\n",
            &AnchorTarget::heading("Note", false),
        )
        .unwrap();
        let Resolution::NotFound(suggestions) = res else {
            panic!("expected not found");
        };
        assert_eq!(&suggestions[..2], &["A > Notes".to_string(), "B > Notes".to_string()]);
    }

    #[test]
    fn test_empty_heading_target_lists_headings() {
        let err = resolve("# A\n## B\n", &AnchorTarget::heading("  ", true)).unwrap_err();
        assert_eq!(err.suggestions(), &["A".to_string(), "A > B".to_string()]);
    }

    #[test]
    fn test_block_reference() {
        let text = "para one ^abc\nother^abc\n^def\n```\nx ^def\n```\n";
        let res = resolve(text, &AnchorTarget::block("^abc")).unwrap();
        assert!(matches!(res, Resolution::Resolved(Anchor::Block { line: 0, .. })));
        let res = resolve(text, &AnchorTarget::block("def")).unwrap();
        assert!(matches!(res, Resolution::Resolved(Anchor::Block { line: 2, .. })));
        let res = resolve(text, &AnchorTarget::block("zzz")).unwrap();
        assert_eq!(res, Resolution::NotFound(vec![]));
    }

    #[test]
    fn test_block_reference_duplicated() {
        let res = resolve("a ^x\nb ^x\n", &AnchorTarget::block("x")).unwrap();
        assert!(matches!(res, Resolution::Ambiguous(ref c) if c.len() == 2));
    }

    #[test]
    fn test_frontmatter_without_block_is_malformed() {
        let err = resolve("# Note\n", &AnchorTarget::frontmatter("status")).unwrap_err();
        assert!(matches!(err, PatchError::MalformedFrontmatter(_)));
    }

    #[test]
    fn test_frontmatter_field() {
        let text = "---\ntitle: T\nstatus: draft\n---\n";
        let res = resolve(text, &AnchorTarget::frontmatter("status")).unwrap();
        assert!(matches!(res, Resolution::Resolved(ref a) if a.line() == 2));

        let res = resolve(text, &AnchorTarget::frontmatter("statsu")).unwrap();
        assert_eq!(
            res,
            Resolution::NotFound(vec!["status".into(), "title".into()])
        );
    }

    #[test]
    fn test_into_anchor_maps_errors() {
        let target = AnchorTarget::heading("X", false);
        let err = Resolution::NotFound(vec!["Y".into()])
            .into_anchor(&target)
            .unwrap_err();
        assert_eq!(
            err,
            PatchError::TargetNotFound {
                target: "X".into(),
                suggestions: vec!["Y".into()]
            }
        );
    }

    #[test]
    fn test_literal_separator_text_resolves_directly() {
        let text = "# Work\n## Input -> Output\n## A > B\n";
        let arrow = resolve(text, &AnchorTarget::heading("Input -> Output", false)).unwrap();
        assert!(matches!(arrow, Resolution::Resolved(ref a) if a.line() == 1));
        let literal = resolve(text, &AnchorTarget::heading("A > B", false)).unwrap();
        assert!(matches!(literal, Resolution::Resolved(ref a) if a.line() == 2));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("A > B"), Some(vec!["A", "B"]));
        assert_eq!(split_path("A > B > C"), Some(vec!["A", "B", "C"]));
        assert_eq!(split_path("A::B"), None);
        assert_eq!(split_path("Input -> Output"), None);
        assert_eq!(split_path("a>b"), None);
        assert_eq!(split_path("Plain"), None);
        assert_eq!(split_path("> B"), None);
    }
}
