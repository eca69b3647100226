//! Source locations and source files.
//!
//! A [`SourceLocation`] is a pair of line/column positions delimiting the
//! text an element was built from. Locations are small and cheap to copy;
//! they flow from tokens through AST nodes into every semantic element.

use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A line/column position within a source file. Both are zero-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A half-open range of source text, `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        SourceLocation { start, end }
    }

    /// A location covering a single position.
    #[inline]
    pub const fn at(pos: Position) -> Self {
        SourceLocation {
            start: pos,
            end: pos,
        }
    }

    /// Merge two locations into one covering both.
    pub fn merge(&self, other: SourceLocation) -> SourceLocation {
        let start = if (self.start.line, self.start.column) < (other.start.line, other.start.column)
        {
            self.start
        } else {
            other.start
        };
        let end = if (self.end.line, self.end.column) > (other.end.line, other.end.column) {
            self.end
        } else {
            other.end
        };
        SourceLocation { start, end }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.start)
    }
}

/// A registered compilation input.
///
/// Loading is the driver's concern; the compiler core only needs the path
/// for diagnostics and the content for the parser collaborator.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: Id,
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(id: Id, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        SourceFile {
            id,
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both_locations() {
        let a = SourceLocation::new(Position::new(1, 4), Position::new(1, 9));
        let b = SourceLocation::new(Position::new(0, 2), Position::new(1, 6));
        let merged = a.merge(b);
        assert_eq!(merged.start, Position::new(0, 2));
        assert_eq!(merged.end, Position::new(1, 9));
    }

    #[test]
    fn display_is_one_based() {
        let loc = SourceLocation::at(Position::new(0, 0));
        assert_eq!(loc.to_string(), "1:1");
    }
}
