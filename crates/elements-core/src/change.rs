//! Content change events, as delivered by `textDocument/didChange`.

use crate::position::{Range, range_to_bytes};

/// One edit in a change batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Replaced range in the text produced by the preceding change of the batch.
    /// `None` replaces the whole document.
    pub range: Option<Range>,
    /// Replacement text.
    pub text: String,
}

impl ChangeEvent {
    /// A ranged (incremental) change.
    pub fn ranged(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }

    /// A whole-document replacement.
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    /// Whether this change replaces the whole document.
    pub fn is_full_replacement(&self) -> bool {
        self.range.is_none()
    }
}

/// Apply a single change in place.
pub fn apply_change(text: &mut String, change: &ChangeEvent) {
    match change.range.as_ref() {
        Some(range) => {
            let span = range_to_bytes(text, range);
            text.replace_range(span, &change.text);
        }
        None => {
            text.clear();
            text.push_str(&change.text);
        }
    }
}

/// Apply a change batch in order and return the resulting text.
///
/// Each range is interpreted against the text produced by the changes before it.
pub fn apply_changes(text: &str, changes: &[ChangeEvent]) -> String {
    let mut out = text.to_string();
    for change in changes {
        apply_change(&mut out, change);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[test]
    fn test_apply_changes_sequentially() {
        let text = "<div>\n</div>\n";
        let changes = vec![
            // Turn `div` into `my-el` on line 0 ...
            ChangeEvent::ranged(range(0, 1, 0, 4), "my-el"),
            // ... then the closing tag, whose columns are unaffected.
            ChangeEvent::ranged(range(1, 2, 1, 5), "my-el"),
        ];
        assert_eq!(apply_changes(text, &changes), "<my-el>\n</my-el>\n");
    }

    #[test]
    fn test_later_change_sees_earlier_result() {
        let changes = vec![
            ChangeEvent::ranged(range(0, 0, 0, 0), "ab\n"),
            // Line 1 only exists after the first change.
            ChangeEvent::ranged(range(1, 0, 1, 1), "X"),
        ];
        assert_eq!(apply_changes("xyz", &changes), "ab\nXyz");
    }

    #[test]
    fn test_full_replacement_resets_text() {
        let changes = vec![
            ChangeEvent::ranged(range(0, 0, 0, 1), "Z"),
            ChangeEvent::full("fresh"),
            ChangeEvent::ranged(range(0, 5, 0, 5), "!"),
        ];
        assert_eq!(apply_changes("abc", &changes), "fresh!");
    }

    #[test]
    fn test_out_of_range_change_clamps() {
        let changes = vec![ChangeEvent::ranged(range(0, 2, 4, 0), "")];
        assert_eq!(apply_changes("abcdef", &changes), "ab");
    }
}
