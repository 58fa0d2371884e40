//! Fuzz target for heading indexing, anchor resolution and patching.
//!
//! Run with: cargo +nightly fuzz run fuzz_heading_index
//!
//! The first byte picks the position and trim flag, the next byte is the
//! split point between the note text and the requested heading.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vaultpatch_core::patch::{
    AnchorTarget, Document, HeadingIndex, InsertionSpec, PatchEngine, PatchRequest, Position,
    Resolver,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let Ok(rest) = std::str::from_utf8(&data[2..]) else {
        return;
    };

    let mut split = (data[1] as usize) % (rest.len() + 1);
    while !rest.is_char_boundary(split) {
        split -= 1;
    }
    let (note, heading) = rest.split_at(split);

    let position = match data[0] % 3 {
        0 => Position::Start,
        1 => Position::End,
        _ => Position::Replace,
    };
    let trim = data[0] & 0x80 != 0;

    let doc = Document::parse(note);
    let index = HeadingIndex::build(&doc);
    let mut last = 0;
    for entry in index.entries() {
        assert!(entry.start_line >= last);
        assert!(entry.body_end_line <= entry.section_end_line);
        assert!(entry.section_end_line <= doc.len());
        last = entry.start_line + 1;
    }

    let target = AnchorTarget::heading(heading, trim);
    let _ = Resolver::new(&doc, &index).resolve(&target);

    let engine = PatchEngine::default();
    let request = PatchRequest {
        target: target.clone(),
        spec: InsertionSpec::new(position, "fuzz").trimmed(trim),
        create_if_missing: data[0] & 0x40 != 0,
    };
    if let Ok(outcome) = engine.patch(note, &request) {
        let _ = engine.read_target(&outcome.text, &target);
    }
});
