//! Behavioural properties of the patch engine over a handful of notes.

use pretty_assertions::assert_eq;
use vaultpatch_core::patch::{
    AnchorTarget, Document, HeadingIndex, InsertionSpec, PatchEngine, PatchError, PatchRequest,
    Position, Resolution, Resolver,
};
use vaultpatch_core::path::normalize;

const NOTES: &[&str] = &[
    "",
    "plain text\nno headings\n",
    "# One\n## Two\n### Three\n## Four\n# Five\n",
    "---\ntitle: x\n---\n# A\ntext\n\n## B\n\n```\n# not a heading\n```\n### C\n#### D\n# E\n",
    "## Starts deep\n# Then shallow\n###### Six\n## Back\n",
    "# Same\n# Same\n## Same\n",
];

fn request(target: AnchorTarget, position: Position, content: &str, trim: bool) -> PatchRequest {
    PatchRequest {
        target,
        spec: InsertionSpec::new(position, content).trimmed(trim),
        create_if_missing: false,
    }
}

#[test]
fn test_index_lines_strictly_increase_and_sections_nest() {
    for note in NOTES {
        let doc = Document::parse(note);
        let index = HeadingIndex::build(&doc);
        let entries = index.entries();

        for pair in entries.windows(2) {
            assert!(pair[0].start_line < pair[1].start_line, "{note:?}");
        }
        for (i, entry) in entries.iter().enumerate() {
            let next_boundary = entries[i + 1..]
                .iter()
                .find(|e| e.level <= entry.level)
                .map_or(doc.len(), |e| e.start_line);
            assert_eq!(entry.section_end_line, next_boundary, "{note:?} entry {i}");
            assert!(entry.body_end_line <= entry.section_end_line);
            assert!(entry.body_end_line > entry.start_line);
        }
    }
}

#[test]
fn test_fenced_heading_is_not_indexed() {
    let doc = Document::parse(NOTES[3]);
    let index = HeadingIndex::build(&doc);
    let texts: Vec<&str> = index.entries().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "B", "C", "D", "E"]);
}

#[test]
fn test_trimmed_match_ignores_surrounding_whitespace() {
    let doc = Document::parse("# Intro\n##   Tasks  \nx\n");
    let index = HeadingIndex::build(&doc);
    let resolver = Resolver::new(&doc, &index);

    let expected = resolver
        .resolve(&AnchorTarget::heading("Tasks", true))
        .unwrap();
    for spelled in ["Tasks", "  Tasks", "Tasks\t", "\n Tasks \n"] {
        let got = resolver
            .resolve(&AnchorTarget::heading(spelled, true))
            .unwrap();
        assert_eq!(got, expected, "{spelled:?}");
    }
    assert!(matches!(expected, Resolution::Resolved(ref a) if a.line() == 1));
}

#[test]
fn test_end_on_empty_section_lands_before_next_heading() {
    let engine = PatchEngine::default();
    let verbatim = engine
        .patch(
            "# A\n# B\nb\n",
            &request(AnchorTarget::heading("A", false), Position::End, "new", false),
        )
        .unwrap();
    assert_eq!(verbatim.text, "# A\nnew\n# B\nb\n");

    let trimmed = engine
        .patch(
            "# A\n# B\nb\n",
            &request(AnchorTarget::heading("A", true), Position::End, "new", true),
        )
        .unwrap();
    assert_eq!(trimmed.text, "# A\nnew\n\n# B\nb\n");
}

#[test]
fn test_inserted_text_reads_back_once() {
    let engine = PatchEngine::default();
    let cases = [
        (Position::Start, "# Log\n- old\n## Sub\nx\n"),
        (Position::End, "# Log\n- old\n## Sub\nx\n"),
        (Position::Replace, "# Log\n- old\n## Sub\nx\n"),
        (Position::End, "# Log\n"),
    ];
    for (position, note) in cases {
        let target = AnchorTarget::heading("Log", true);
        let out = engine
            .patch(note, &request(target.clone(), position, "- marker", true))
            .unwrap();
        let section = engine.read_target(&out.text, &target).unwrap();
        assert_eq!(
            section.matches("- marker").count(),
            1,
            "{position:?} on {note:?}"
        );
    }
}

#[test]
fn test_duplicate_headings_are_ambiguous_with_distinct_lines() {
    let engine = PatchEngine::default();
    let err = engine
        .patch(
            "# Work\n## Notes\n# Home\n## Notes\n",
            &request(AnchorTarget::heading("Notes", false), Position::End, "x", false),
        )
        .unwrap_err();
    let PatchError::AmbiguousTarget { candidates, .. } = err else {
        panic!("expected ambiguity, got {err:?}");
    };
    assert_eq!(candidates, vec!["Work > Notes (line 2)", "Home > Notes (line 4)"]);
}

#[test]
fn test_misspelling_suggests_existing_heading() {
    let engine = PatchEngine::default();
    let err = engine
        .patch(
            "# Projects\n# Archive\n",
            &request(AnchorTarget::heading("Projcets", false), Position::End, "x", false),
        )
        .unwrap_err();
    assert!(matches!(err, PatchError::TargetNotFound { ref suggestions, .. } if suggestions[0] == "Projects"));
}

#[test]
fn test_normalize_example() {
    assert_eq!(normalize("Folder\\Sub//Note.md "), "Folder/Sub/Note.md");
}

#[test]
fn test_frontmatter_target_without_block_is_malformed() {
    let engine = PatchEngine::default();
    let err = engine
        .patch(
            "# Title\nbody\n",
            &request(AnchorTarget::frontmatter("status"), Position::Replace, "done", false),
        )
        .unwrap_err();
    assert!(matches!(err, PatchError::MalformedFrontmatter(_)));
}
