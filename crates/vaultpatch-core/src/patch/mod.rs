//! Heading-relative patch engine.
//!
//! A patch parses the note into lines, indexes its headings, resolves the
//! requested anchor, and splices the new content in. Everything here is
//! synchronous and free of I/O; callers fetch and write back the note.

pub mod apply;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod resolve;
pub mod target;

pub use apply::apply;
pub use document::{Document, LineEnding};
pub use error::{DiagnosticKind, PatchDiagnostic, PatchError};
pub use index::{HeadingEntry, HeadingIndex, HeadingSummary, PATH_SEPARATOR};
pub use resolve::{Anchor, DEFAULT_MAX_SUGGESTIONS, Resolution, Resolver};
pub use target::{AnchorTarget, InsertionSpec, MatchMode, Position, TargetKind};

use tracing::{debug, warn};

/// A complete patch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    pub target: AnchorTarget,
    pub spec: InsertionSpec,
    /// Create a missing heading or frontmatter key before patching.
    pub create_if_missing: bool,
}

/// Result of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    /// Where the content went, e.g. `"Projects > Tasks (line 4)"`.
    pub anchor: String,
    /// Whether the target had to be created.
    pub created: bool,
    pub changed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PatchEngine {
    max_suggestions: usize,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

impl PatchEngine {
    pub fn new(max_suggestions: usize) -> Self {
        Self { max_suggestions }
    }

    fn resolve(
        &self,
        document: &Document,
        index: &HeadingIndex,
        target: &AnchorTarget,
    ) -> Result<Resolution, PatchError> {
        Resolver::new(document, index)
            .with_max_suggestions(self.max_suggestions)
            .resolve(target)
    }

    /// Resolve `request.target` in `text` and apply the insertion.
    pub fn patch(&self, text: &str, request: &PatchRequest) -> Result<PatchOutcome, PatchError> {
        let result = self.patch_inner(text, request);
        if let Err(e) = &result {
            warn!(target_kind = %request.target.kind(), requested = request.target.label(), error = %e, "patch rejected");
        }
        result
    }

    fn patch_inner(&self, text: &str, request: &PatchRequest) -> Result<PatchOutcome, PatchError> {
        let target = &request.target;
        let mut document = Document::parse(text);
        let mut created = false;

        if request.create_if_missing && target.kind() == TargetKind::Frontmatter {
            created |= frontmatter::ensure_block(&mut document)?;
        }

        let index = HeadingIndex::build(&document);
        let anchor = match self.resolve(&document, &index, target)? {
            Resolution::NotFound(suggestions) if request.create_if_missing => {
                if !self.create_target(&mut document, &index, target)? {
                    return Err(PatchError::TargetNotFound {
                        target: target.label().to_string(),
                        suggestions,
                    });
                }
                created = true;
                let index = HeadingIndex::build(&document);
                self.resolve(&document, &index, target)?.into_anchor(target)?
            }
            other => other.into_anchor(target)?,
        };

        let patched = apply::apply_at(&document, &anchor, &request.spec)?;
        let text_out = patched.render();
        debug!(anchor = %anchor.describe(), created, "patch applied");

        Ok(PatchOutcome {
            changed: text_out != text,
            text: text_out,
            anchor: anchor.describe(),
            created,
        })
    }

    /// Add the missing target to `document`. Returns `false` when the target
    /// kind cannot be created.
    fn create_target(
        &self,
        document: &mut Document,
        index: &HeadingIndex,
        target: &AnchorTarget,
    ) -> Result<bool, PatchError> {
        match target {
            AnchorTarget::Heading { text, mode } => {
                let child = match resolve::split_path(text) {
                    Some(segments) => self.child_placement(document, index, &segments, *mode)?,
                    None => None,
                };
                // Unqualified text, or a path whose parent is absent, becomes
                // a top-level heading with the literal text.
                let (level, at, title) = child.unwrap_or_else(|| {
                    let title = match mode {
                        MatchMode::Exact => text.clone(),
                        MatchMode::Trimmed => text.trim().to_string(),
                    };
                    (1, document.len(), title)
                });

                let mut lines = Vec::new();
                if at > 0 && !document.is_blank(at - 1) {
                    lines.push(String::new());
                }
                lines.push(format!("{} {title}", "#".repeat(usize::from(level))));
                document.insert_lines(at, lines);
                debug!(heading = %title, level, line = at, "created heading");
                Ok(true)
            }
            AnchorTarget::Frontmatter { key } => {
                frontmatter::insert_key(document, key)?;
                debug!(key = %key, "created frontmatter key");
                Ok(true)
            }
            AnchorTarget::Block { .. } => Ok(false),
        }
    }

    /// Where a `Parent > Child` heading goes: one level below the parent, after
    /// the parent's last non-blank line. `None` when the parent is absent.
    fn child_placement(
        &self,
        document: &Document,
        index: &HeadingIndex,
        segments: &[&str],
        mode: MatchMode,
    ) -> Result<Option<(u8, usize, String)>, PatchError> {
        let Some((title, parents)) = segments.split_last() else {
            return Ok(None);
        };
        let parent = AnchorTarget::Heading {
            text: parents.join(PATH_SEPARATOR),
            mode,
        };
        let entry = match self.resolve(document, index, &parent)? {
            Resolution::Resolved(Anchor::Heading { entry, .. }) => entry,
            Resolution::Ambiguous(candidates) => {
                return Err(PatchError::AmbiguousTarget {
                    target: parent.label().to_string(),
                    candidates: candidates.iter().map(Anchor::describe).collect(),
                });
            }
            Resolution::NotFound(_) | Resolution::Resolved(_) => return Ok(None),
        };
        let at = (entry.start_line + 1..entry.section_end_line)
            .rev()
            .find(|&i| !document.is_blank(i))
            .map_or(entry.start_line + 1, |i| i + 1);
        Ok(Some(((entry.level + 1).min(6), at, title.to_string())))
    }

    /// The lines a target covers: a heading's whole section (excluding the
    /// heading line), a block line, or a frontmatter field.
    pub fn read_target(&self, text: &str, target: &AnchorTarget) -> Result<String, PatchError> {
        let document = Document::parse(text);
        let index = HeadingIndex::build(&document);
        let anchor = self.resolve(&document, &index, target)?.into_anchor(target)?;
        let range = match &anchor {
            Anchor::Heading { entry, .. } => entry.start_line + 1..entry.section_end_line,
            Anchor::Block { line, .. } => *line..line + 1,
            Anchor::Frontmatter { field, .. } => field.line..field.end_line,
        };
        Ok(document.text_of(range))
    }

    pub fn list_headings(&self, text: &str) -> Vec<HeadingSummary> {
        HeadingIndex::build(&Document::parse(text)).listing()
    }

    /// Add a tag to the note's frontmatter `tags` field.
    pub fn add_tag(&self, text: &str, tag: &str) -> Result<PatchOutcome, PatchError> {
        let mut document = Document::parse(text);
        let had_block = matches!(
            frontmatter::locate(document.lines()),
            frontmatter::FrontmatterState::Present(_)
        );
        let changed = frontmatter::add_tag(&mut document, tag)?;
        Ok(PatchOutcome {
            text: document.render(),
            anchor: "tags".to_string(),
            created: !had_block,
            changed,
        })
    }
}
