use serde::{Deserialize, Serialize};

/// Half-open character interval `[start, start + length)` over a text.
///
/// Offsets count Unicode scalar values. `length == 0` is a caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub start: usize,
    pub length: usize,
}

impl SelectionRange {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn caret(at: usize) -> Self {
        Self::new(at, 0)
    }

    /// Build from `[start, end)`. Returns `None` when `end < start`.
    pub fn from_bounds(start: usize, end: usize) -> Option<Self> {
        end.checked_sub(start).map(|length| Self::new(start, length))
    }

    /// Exclusive end offset, saturating on overflow.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// Anchor used for travel accounting: the caret or the selection end.
    pub fn anchor(&self) -> usize {
        self.end()
    }

    pub fn is_caret(&self) -> bool {
        self.length == 0
    }

    /// Whether the range lies entirely inside a text of `text_len` characters.
    pub fn fits(&self, text_len: usize) -> bool {
        self.start
            .checked_add(self.length)
            .is_some_and(|end| end <= text_len)
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &SelectionRange) -> bool {
        self.start <= other.start && self.end() >= other.end()
    }

    /// Number of characters shared with `other`.
    pub fn overlap(&self, other: &SelectionRange) -> usize {
        let lo = self.start.max(other.start);
        let hi = self.end().min(other.end());
        hi.saturating_sub(lo)
    }
}

impl std::fmt::Display for SelectionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
