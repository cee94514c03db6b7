//! Source locations (spec.md §3 "Source location").
//!
//! A location is a pair of 1-based `(line, column)` areas. The parser produces
//! these; callers and error messages consume them. Kept deliberately tiny —
//! just two `u32` pairs — so every CST and CSSOM node can carry one by value
//! without indirection.

use std::fmt;

/// A single 1-based `(line, column)` position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A `(begin, end)` pair of [`Position`]s.
///
/// Invariant (spec.md §8): `begin.line <= end.line`, and when they're equal,
/// `begin.column <= end.column`. [`SourceLocation::new`] asserts this in debug
/// builds; callers that build one from already-validated parser state use
/// [`SourceLocation::new_unchecked`] to skip the check in hot paths.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub begin: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(begin: Position, end: Position) -> Self {
        debug_assert!(
            begin.line < end.line || (begin.line == end.line && begin.column <= end.column),
            "ill-formed source location: {:?} .. {:?}",
            begin,
            end
        );
        SourceLocation { begin, end }
    }

    pub fn new_unchecked(begin: Position, end: Position) -> Self {
        SourceLocation { begin, end }
    }

    /// A zero-width location at a single position, used when a node has no
    /// meaningful span of its own (e.g. a synthesized default case-flag).
    pub fn point(pos: Position) -> Self {
        SourceLocation {
            begin: pos,
            end: pos,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_line_col_pairs() {
        let loc = SourceLocation::new(Position::new(1, 1), Position::new(2, 5));
        assert_eq!(loc.to_string(), "1:1-2:5");
    }

    #[test]
    #[should_panic]
    fn rejects_end_before_begin_in_debug_builds() {
        SourceLocation::new(Position::new(3, 1), Position::new(2, 1));
    }
}
