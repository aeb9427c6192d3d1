//! Line/character positions and absolute offset ranges.

use serde::{Deserialize, Serialize};

/// Zero-based line and UTF-16 character offset, as used on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A line/character range. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty range at `position` (an insertion point).
    #[must_use]
    pub const fn point(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// Half-open interval `[start, end)` of UTF-16 code unit offsets into a
/// document's text.
///
/// Serialized as a two-element array, which is how lint backends report
/// fix ranges. No ordering between `start` and `end` is enforced here:
/// ranges come from the backend as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct OffsetRange {
    pub start: usize,
    pub end: usize,
}

impl OffsetRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// True when `self` ends after `next` starts.
    ///
    /// Callers pass ranges in start order, so this is the overlap test for
    /// two ranges with `self.start <= next.start`. Touching ranges
    /// (`self.end == next.start`) do not overlap.
    #[must_use]
    pub const fn overlaps_next(&self, next: &OffsetRange) -> bool {
        self.end > next.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl From<[usize; 2]> for OffsetRange {
    fn from([start, end]: [usize; 2]) -> Self {
        Self { start, end }
    }
}

impl From<OffsetRange> for [usize; 2] {
    fn from(range: OffsetRange) -> Self {
        [range.start, range.end]
    }
}
