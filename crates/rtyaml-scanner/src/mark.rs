//! Source positions.

use std::fmt;

/// A position in the decoded input.
///
/// All three fields are zero-based. `index` counts characters, not bytes, so
/// it can be handed to diagnostics renderers that work on char offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Mark {
    /// Character offset from the start of the stream.
    pub index: usize,
    /// Line number, starting at 0.
    pub line: usize,
    /// Column within the line, starting at 0.
    pub column: usize,
}

impl Mark {
    /// Create a mark from its parts.
    #[inline]
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }

    /// Character range from this mark up to `end`, for diagnostics.
    #[inline]
    pub fn range_to(&self, end: Mark) -> std::ops::Range<usize> {
        self.index..end.index.max(self.index)
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}
