use elements_core::change::ChangeEvent;
use elements_core::position::{advance_point, point_for_byte, range_to_bytes};
use std::ops::Range;
use tree_sitter::{InputEdit, Point};

/// Tree edits derived from a change batch, plus the text the batch produces.
#[derive(Debug, Clone)]
pub struct EditReplay {
    /// One edit per change, in batch order.
    pub edits: Vec<InputEdit>,
    /// Result of applying the batch to the starting text.
    pub text: String,
}

fn to_point((row, column): (usize, usize)) -> Point {
    Point { row, column }
}

/// Describe replacing `span` of `text` with `inserted` as a tree-sitter edit.
pub fn input_edit(text: &str, span: Range<usize>, inserted: &str) -> InputEdit {
    let start = point_for_byte(text, span.start);
    InputEdit {
        start_byte: span.start,
        old_end_byte: span.end,
        new_end_byte: span.start + inserted.len(),
        start_position: to_point(start),
        old_end_position: to_point(advance_point(start, &text[span.clone()])),
        new_end_position: to_point(advance_point(start, inserted)),
    }
}

/// Replay a change batch against `old`, computing a tree edit for every change.
///
/// Each change is resolved against the text produced by the preceding ones, so the edits can be
/// applied to a tree in order. Returns `None` if any change has no range: a whole-document
/// replacement cannot be described as an edit.
pub fn replay_edits(old: &str, changes: &[ChangeEvent]) -> Option<EditReplay> {
    let mut text = old.to_string();
    let mut edits = Vec::with_capacity(changes.len());

    for change in changes {
        let range = change.range.as_ref()?;
        let span = range_to_bytes(&text, range);
        edits.push(input_edit(&text, span.clone(), &change.text));
        text.replace_range(span, &change.text);
    }

    Some(EditReplay { edits, text })
}

/// Map a byte offset in the pre-edit text to the post-edit text.
///
/// Offsets inside the replaced span are reported as `None`.
pub fn shift_offset(offset: usize, edit: &InputEdit) -> Option<usize> {
    if offset <= edit.start_byte {
        Some(offset)
    } else if offset >= edit.old_end_byte {
        Some(offset - edit.old_end_byte + edit.new_end_byte)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elements_core::position::{Position, Range as LspRange};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replay_multiline_edit_points() {
        let old = "<a>\n<b>\n";
        let change = ChangeEvent::ranged(
            LspRange::new(Position::new(0, 1), Position::new(1, 2)),
            "x\nyy",
        );
        let replay = replay_edits(old, &[change]).unwrap();
        assert_eq!(replay.text, "<x\nyy>\n");

        let edit = replay.edits[0];
        assert_eq!(edit.start_byte, 1);
        assert_eq!(edit.old_end_byte, 6);
        assert_eq!(edit.new_end_byte, 5);
        assert_eq!(edit.start_position, Point { row: 0, column: 1 });
        assert_eq!(edit.old_end_position, Point { row: 1, column: 2 });
        assert_eq!(edit.new_end_position, Point { row: 1, column: 2 });
    }

    #[test]
    fn test_replay_is_sequential() {
        let changes = vec![
            ChangeEvent::ranged(LspRange::new(Position::new(0, 0), Position::new(0, 0)), "ab"),
            ChangeEvent::ranged(LspRange::new(Position::new(0, 2), Position::new(0, 2)), "cd"),
        ];
        let replay = replay_edits("", &changes).unwrap();
        assert_eq!(replay.text, "abcd");
        assert_eq!(replay.edits[1].start_byte, 2);
        assert_eq!(replay.edits[1].new_end_byte, 4);
    }

    #[test]
    fn test_full_replacement_has_no_edits() {
        assert!(replay_edits("abc", &[ChangeEvent::full("x")]).is_none());
    }

    #[test]
    fn test_shift_offset() {
        let edit = input_edit("0123456789", 2..4, "abcd");
        assert_eq!(shift_offset(1, &edit), Some(1));
        assert_eq!(shift_offset(2, &edit), Some(2));
        assert_eq!(shift_offset(3, &edit), None);
        assert_eq!(shift_offset(4, &edit), Some(6));
        assert_eq!(shift_offset(9, &edit), Some(11));
    }
}
