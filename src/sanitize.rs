//! Markup scrubbing for user supplied strings.
//!
//! Titles and bodies keep ammonia's default tag allowlist (plus `tfoot`).
//! Board names and passwords are identifiers, so they are never rewritten:
//! if stripping all tags would change them they are rejected instead.

use ammonia::Builder;

/// Stored in place of content that scrubbed down to nothing.
pub const SCRUBBED_PLACEHOLDER: &str = "*Input text was scrubbed.*";

/// Sanitize a title or body. Never returns an empty string.
pub fn scrub_text(input: &str) -> String {
    let cleaned = Builder::default().add_tags(&["tfoot"]).clean(input).to_string();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        SCRUBBED_PLACEHOLDER.to_string()
    } else {
        cleaned.to_string()
    }
}

/// True when `input` is empty or is altered by stripping every tag.
pub fn is_bad_input(input: &str) -> bool {
    input.is_empty() || Builder::empty().clean(input).to_string() != input
}

pub fn normalize_board(board: &str) -> String {
    board.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_removed_with_its_content() {
        let out = scrub_text("Hello <script>alert(1)</script>world");
        assert!(!out.contains("script"));
        assert!(!out.contains("alert"));
        assert!(out.starts_with("Hello"));
    }

    #[test]
    fn allowed_markup_survives() {
        assert_eq!(scrub_text("<b>bold</b>"), "<b>bold</b>");
        let table = scrub_text("<table><tfoot><tr><td>x</td></tr></tfoot></table>");
        assert!(table.contains("<tfoot>"));
    }

    #[test]
    fn empty_after_scrub_gets_placeholder() {
        assert_eq!(scrub_text("<script>x</script>"), SCRUBBED_PLACEHOLDER);
        assert_eq!(scrub_text("   "), SCRUBBED_PLACEHOLDER);
    }

    #[test]
    fn identifiers_with_tags_are_bad() {
        assert!(is_bad_input(""));
        assert!(is_bad_input("<b>board</b>"));
        assert!(is_bad_input("pa<script>x</script>ss"));
        assert!(!is_bad_input("general"));
        assert!(!is_bad_input("hunter2"));
    }

    #[test]
    fn board_is_trimmed_and_lowercased() {
        assert_eq!(normalize_board("  Tech "), "tech");
    }
}
