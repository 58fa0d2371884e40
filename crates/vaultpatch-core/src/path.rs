//! Vault-relative path normalization.

/// Canonicalize a user-supplied vault-relative path.
///
/// Backslashes become forward slashes, runs of slashes collapse to one, and
/// surrounding whitespace and slashes are trimmed. A path made only of
/// slashes refers to the vault root and normalizes to `""`. Never fails.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_slash = false;

    for ch in path.trim().chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        out.push(ch);
    }

    out.trim_matches('/').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mixed_separators_and_trailing_space() {
        assert_eq!(normalize("Folder\\Sub//Note.md "), "Folder/Sub/Note.md");
    }

    #[test]
    fn test_leading_and_trailing_slashes() {
        assert_eq!(normalize("/Daily/2024-01-01.md/"), "Daily/2024-01-01.md");
        assert_eq!(normalize("  //Inbox//  "), "Inbox");
    }

    #[test]
    fn test_root_reference() {
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize("\\\\"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_already_normal() {
        assert_eq!(normalize("Projects/Plan.md"), "Projects/Plan.md");
    }

    #[test]
    fn test_inner_spaces_kept() {
        assert_eq!(normalize(" My Notes\\\\Weekly Review.md"), "My Notes/Weekly Review.md");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("a\\\\b//c/ ");
        assert_eq!(normalize(&once), once);
    }
}
