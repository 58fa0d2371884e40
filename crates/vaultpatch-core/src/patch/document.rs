//! Line-oriented view of a Markdown note.

/// Line terminator detected in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// A note split into lines.
///
/// Rendering a document that was not modified reproduces the input, except
/// that mixed line endings are normalized to the dominant style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    line_ending: LineEnding,
    trailing_newline: bool,
}

impl Document {
    /// Split raw note text into lines.
    pub fn parse(text: &str) -> Self {
        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        if text.is_empty() {
            return Self {
                lines: Vec::new(),
                line_ending,
                trailing_newline: true,
            };
        }

        let mut lines: Vec<String> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        let trailing_newline = text.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }

        Self {
            lines,
            line_ending,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Whether the line at `index` exists and contains only whitespace.
    pub fn is_blank(&self, index: usize) -> bool {
        self.lines
            .get(index)
            .is_some_and(|l| l.trim().is_empty())
    }

    /// Join lines `range` with `\n`, for reading back part of a note.
    pub fn text_of(&self, range: std::ops::Range<usize>) -> String {
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        self.lines[start..end].join("\n")
    }

    /// Replace lines `range` with `replacement`.
    pub(crate) fn splice(&mut self, range: std::ops::Range<usize>, replacement: Vec<String>) {
        self.lines.splice(range, replacement);
    }

    pub(crate) fn insert_lines(&mut self, at: usize, new_lines: Vec<String>) {
        self.splice(at..at, new_lines);
    }

    /// Render back to text using the original line ending.
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let eol = self.line_ending.as_str();
        let mut out = self.lines.join(eol);
        if self.trailing_newline {
            out.push_str(eol);
        }
        out
    }

    /// Mark each line as prose (`true`) or as part of the frontmatter block or
    /// a fenced code block (`false`). Headings and block references are only
    /// recognized on prose lines.
    pub fn prose_mask(&self) -> Vec<bool> {
        let mut mask = vec![true; self.lines.len()];

        let mut start = 0;
        if let super::frontmatter::FrontmatterState::Present(block) =
            super::frontmatter::locate(&self.lines)
        {
            for slot in mask.iter_mut().take(block.close_line + 1) {
                *slot = false;
            }
            start = block.close_line + 1;
        }

        let mut open_fence: Option<Fence> = None;
        for (i, line) in self.lines.iter().enumerate().skip(start) {
            match open_fence {
                Some(fence) => {
                    mask[i] = false;
                    if fence.is_closed_by(line) {
                        open_fence = None;
                    }
                }
                None => {
                    if let Some(fence) = Fence::opening(line) {
                        mask[i] = false;
                        open_fence = Some(fence);
                    }
                }
            }
        }

        mask
    }
}

/// An open fenced code block: its marker character and run length.
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn opening(line: &str) -> Option<Self> {
        let body = strip_indent(line)?;
        let marker = body.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = body.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        // Backtick fences may not carry backticks in their info string.
        if marker == '`' && body[len..].contains('`') {
            return None;
        }
        Some(Self { marker, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let Some(body) = strip_indent(line) else {
            return false;
        };
        let run = body.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && body[run * self.marker.len_utf8()..].trim().is_empty()
    }
}

/// Strip up to three spaces of indentation; `None` if the line is indented
/// further (an indented code line).
pub(crate) fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}
