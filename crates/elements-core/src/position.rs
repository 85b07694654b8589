//! Line/character coordinates and byte offsets.
//!
//! Positions follow LSP conventions: lines and characters are 0-based, and characters are counted
//! in UTF-16 code units. A line break is exactly one `\n`; a `\r` in front of it is ordinary line
//! content.
//!
//! All conversions clamp instead of failing: a line past the end of the text maps to the end of
//! the text, and a character past the end of a line maps to the end of that line.

use std::ops::Range as ByteRange;

/// A cursor coordinate (UTF-16 based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number (0-based).
    pub line: u32,
    /// Character offset in UTF-16 code units (0-based).
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open span between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    /// Range start position (inclusive).
    pub start: Position,
    /// Range end position (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` lies inside the range (both ends inclusive, matching cursor semantics).
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Whether two ranges share at least one position.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Number of UTF-16 code units in `text`.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Byte offset of a UTF-16 column inside a single line, clamped to the line length.
pub fn utf16_to_byte_in_line(line: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in line.char_indices() {
        if units >= utf16_offset {
            return idx;
        }
        units += ch.len_utf16();
    }
    line.len()
}

/// UTF-16 column of a byte offset inside a single line.
pub fn byte_to_utf16_in_line(line: &str, byte_offset: usize) -> usize {
    let end = floor_char_boundary(line, byte_offset);
    utf16_len(&line[..end])
}

/// Largest char boundary that is `<= byte_offset` (and `<= text.len()`).
pub fn floor_char_boundary(text: &str, byte_offset: usize) -> usize {
    if byte_offset >= text.len() {
        return text.len();
    }
    let mut idx = byte_offset;
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Byte offset where `line` starts, or `None` if the text has fewer lines.
pub fn line_start_byte(text: &str, line: usize) -> Option<usize> {
    let mut start = 0;
    for _ in 0..line {
        let newline = text[start..].find('\n')?;
        start += newline + 1;
    }
    Some(start)
}

/// Byte span of `line` without its trailing `\n`.
pub fn line_byte_range(text: &str, line: usize) -> Option<ByteRange<usize>> {
    let start = line_start_byte(text, line)?;
    let end = text[start..].find('\n').map_or(text.len(), |i| start + i);
    Some(start..end)
}

/// Text of `line` without its trailing `\n`.
pub fn line_at(text: &str, line: usize) -> Option<&str> {
    line_byte_range(text, line).map(|r| &text[r])
}

/// Convert a position to a byte offset, clamping out-of-range lines and characters.
pub fn position_to_byte(text: &str, pos: Position) -> usize {
    let Some(line) = line_byte_range(text, pos.line as usize) else {
        return text.len();
    };
    line.start + utf16_to_byte_in_line(&text[line.clone()], pos.character as usize)
}

/// Convert a byte offset to a position, clamping to the end of the text.
pub fn byte_to_position(text: &str, byte_offset: usize) -> Position {
    let byte_offset = floor_char_boundary(text, byte_offset);
    let prefix = &text[..byte_offset];
    let line = prefix.bytes().filter(|b| *b == b'\n').count();
    let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
    Position::new(line as u32, utf16_len(&text[line_start..byte_offset]) as u32)
}

/// Convert a range to an ordered byte span.
pub fn range_to_bytes(text: &str, range: &Range) -> ByteRange<usize> {
    let start = position_to_byte(text, range.start);
    let end = position_to_byte(text, range.end);
    start.min(end)..start.max(end)
}

/// Convert a byte span to a range.
pub fn bytes_to_range(text: &str, span: ByteRange<usize>) -> Range {
    Range::new(
        byte_to_position(text, span.start),
        byte_to_position(text, span.end),
    )
}

/// Row and byte column of a byte offset, as used by tree-sitter points.
pub fn point_for_byte(text: &str, byte_offset: usize) -> (usize, usize) {
    let byte_offset = byte_offset.min(text.len());
    let prefix = &text.as_bytes()[..byte_offset];
    let row = prefix.iter().filter(|b| **b == b'\n').count();
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    (row, byte_offset - line_start)
}

/// Advance a `(row, byte column)` point over `inserted` text.
pub fn advance_point(point: (usize, usize), inserted: &str) -> (usize, usize) {
    let (mut row, mut column) = point;
    let mut parts = inserted.split('\n');
    if let Some(first) = parts.next() {
        column = column.saturating_add(first.len());
    }
    for part in parts {
        row = row.saturating_add(1);
        column = part.len();
    }
    (row, column)
}
