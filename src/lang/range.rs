//! Source ranges shared by reference origins and targets.

use std::ops::{Deref, Range};

use ropey::Rope;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Position;

/// A wrapper around `tower_lsp::lsp_types::Range` with containment helpers.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct SourceRange(pub tower_lsp::lsp_types::Range);

impl SourceRange {
    pub fn new(start: (u32, u32), end: (u32, u32)) -> SourceRange {
        tower_lsp::lsp_types::Range {
            start: Position {
                line: start.0,
                character: start.1,
            },
            end: Position {
                line: end.0,
                character: end.1,
            },
        }
        .into()
    }

    /// Creates a `SourceRange` from a byte offset range using rope for position calculation.
    pub fn from_byte_range(rope: &Rope, range: Range<usize>) -> SourceRange {
        let char_start = rope.byte_to_char(range.start);
        let char_end = rope.byte_to_char(range.end);

        let start_line = rope.char_to_line(char_start);
        let start_offset = char_start - rope.line_to_char(start_line);

        let end_line = rope.char_to_line(char_end);
        let end_offset = char_end - rope.line_to_char(end_line);

        SourceRange::new(
            (start_line as u32, start_offset as u32),
            (end_line as u32, end_offset as u32),
        )
    }

    pub fn contains(&self, position: Position) -> bool {
        (self.start.line < position.line
            || (self.start.line == position.line && self.start.character <= position.character))
            && (self.end.line > position.line
                || (self.end.line == position.line && self.end.character >= position.character))
    }

    pub fn includes(&self, other: &SourceRange) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }
}

impl std::hash::Hash for SourceRange {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.start.line.hash(state);
        self.0.start.character.hash(state);
        self.0.end.line.hash(state);
        self.0.end.character.hash(state);
    }
}

impl Deref for SourceRange {
    type Target = tower_lsp::lsp_types::Range;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<tower_lsp::lsp_types::Range> for SourceRange {
    fn from(range: tower_lsp::lsp_types::Range) -> Self {
        SourceRange(range)
    }
}

/// A range within one file of a module directory.
///
/// `filename` is relative to the module directory.
#[derive(Debug, Default, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct FileRange {
    pub filename: String,
    pub range: SourceRange,
}

impl FileRange {
    pub fn new(filename: impl Into<String>, range: SourceRange) -> FileRange {
        FileRange {
            filename: filename.into(),
            range,
        }
    }

    pub fn contains(&self, filename: &str, position: Position) -> bool {
        self.filename == filename && self.range.contains(position)
    }
}
