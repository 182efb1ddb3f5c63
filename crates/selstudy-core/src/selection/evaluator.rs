//! Target matching for a live selection.
//!
//! All functions are pure. The evaluator is built once per attempt from the
//! task text and target, and answers three questions for any range: is it the
//! target, where is the target, and does it only overshoot the target by
//! boundary characters (whitespace or punctuation).
//!
//! ```text
//! Active -> (GateBlocked <-> Active) -> Completed
//! ```
//!
//! `Completed` needs a qualifying match and an open gate at the time of the
//! selection change. The gate is not re-checked until the next change.

use serde::{Deserialize, Serialize};

use super::range::SelectionRange;

/// How a qualifying selection matched the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "range", rename_all = "snake_case")]
pub enum MatchKind {
    /// The selected text equals the target.
    Exact(SelectionRange),
    /// The selection overshot the target by boundary characters only; the
    /// range is the corrected target span.
    Snapped(SelectionRange),
}

impl MatchKind {
    pub fn range(&self) -> SelectionRange {
        match self {
            MatchKind::Exact(r) | MatchKind::Snapped(r) => *r,
        }
    }

    pub fn is_snapped(&self) -> bool {
        matches!(self, MatchKind::Snapped(_))
    }
}

/// State of the precision-method gate at the time of a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCheck {
    /// Standard or training task.
    NotRequired,
    /// Precision mode has been activated at least once.
    Satisfied,
    /// Precision mode has never been activated.
    Unsatisfied,
}

impl GateCheck {
    pub fn for_task(required: bool, precision_used: bool) -> Self {
        match (required, precision_used) {
            (false, _) => GateCheck::NotRequired,
            (true, true) => GateCheck::Satisfied,
            (true, false) => GateCheck::Unsatisfied,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, GateCheck::Unsatisfied)
    }
}

/// Result of evaluating one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    NoMatch,
    /// Qualifying match, but the precision gate is closed.
    GateBlocked(MatchKind),
    Complete(MatchKind),
}

impl Evaluation {
    /// Whether the selection was correct, regardless of the gate.
    pub fn is_correct(&self) -> bool {
        !matches!(self, Evaluation::NoMatch)
    }
}

/// Pure matcher over a text and a target string.
#[derive(Debug, Clone)]
pub struct SelectionEvaluator {
    text: Vec<char>,
    target: Vec<char>,
    case_sensitive: bool,
    expected: Option<SelectionRange>,
}

impl SelectionEvaluator {
    pub fn new(text: &str, target: &str, case_sensitive: bool) -> Self {
        let text: Vec<char> = text.chars().collect();
        let target: Vec<char> = target.chars().collect();
        let expected = find_first(&text, &target, case_sensitive);
        Self {
            text,
            target,
            case_sensitive,
            expected,
        }
    }

    /// Text length in characters.
    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    /// Whether the characters under `range` equal the target.
    ///
    /// Out-of-bounds ranges never match.
    pub fn is_exact_match(&self, range: SelectionRange) -> bool {
        if !range.fits(self.text.len()) || range.length != self.target.len() {
            return false;
        }
        let selected = &self.text[range.start..range.end()];
        !self.target.is_empty() && slices_match(selected, &self.target, self.case_sensitive)
    }

    /// First occurrence of the target, or `None` when the target is absent
    /// (or empty). A task without an expected range never completes.
    pub fn expected_range(&self) -> Option<SelectionRange> {
        self.expected
    }

    /// Snap a selection that overshoots the target by boundary characters.
    ///
    /// Returns the expected range when `current` strictly contains it and
    /// every extra character is whitespace or punctuation.
    pub fn snap_if_contained(&self, current: SelectionRange) -> Option<SelectionRange> {
        let expected = self.expected?;
        if !current.fits(self.text.len()) || !current.contains(&expected) || current == expected {
            return None;
        }
        let leading = &self.text[current.start..expected.start];
        let trailing = &self.text[expected.end()..current.end()];
        let only_boundary = leading
            .iter()
            .chain(trailing.iter())
            .all(|c| is_boundary_char(*c));
        only_boundary.then_some(expected)
    }

    /// Exact match first, then snap.
    pub fn qualifying_match(&self, current: SelectionRange) -> Option<MatchKind> {
        if self.is_exact_match(current) {
            return Some(MatchKind::Exact(current));
        }
        self.snap_if_contained(current).map(MatchKind::Snapped)
    }

    /// Evaluate a selection change against the method gate.
    pub fn evaluate(&self, current: SelectionRange, gate: GateCheck) -> Evaluation {
        match self.qualifying_match(current) {
            None => Evaluation::NoMatch,
            Some(m) if gate.is_open() => Evaluation::Complete(m),
            Some(m) => Evaluation::GateBlocked(m),
        }
    }
}

/// Whitespace or punctuation: characters a selection may overshoot by.
pub fn is_boundary_char(c: char) -> bool {
    c.is_whitespace() || is_punctuation(c)
}

fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '!' | '"' | '#' | '%' | '&' | '\'' | '(' | ')' | '*' | ',' | '-' | '.' | '/' | ':'
            | ';' | '?' | '@' | '[' | '\\' | ']' | '_' | '{' | '}'
            | '\u{00A1}' | '\u{00A7}' | '\u{00AB}' | '\u{00B6}' | '\u{00B7}' | '\u{00BB}'
            | '\u{00BF}'
            | '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{2043}'
            | '\u{2045}'..='\u{2051}'
            | '\u{2053}'..='\u{205E}'
            | '\u{3001}'..='\u{3003}'
            | '\u{3008}'..='\u{3011}'
            | '\u{3014}'..='\u{301F}'
            | '\u{FF01}'..='\u{FF03}'
            | '\u{FF05}'..='\u{FF0A}'
            | '\u{FF0C}'..='\u{FF0F}'
            | '\u{FF1A}' | '\u{FF1B}' | '\u{FF1F}' | '\u{FF20}'
    )
}

fn chars_match(a: char, b: char, case_sensitive: bool) -> bool {
    a == b || (!case_sensitive && a.to_lowercase().eq(b.to_lowercase()))
}

fn slices_match(a: &[char], b: &[char], case_sensitive: bool) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| chars_match(*x, *y, case_sensitive))
}

fn find_first(text: &[char], target: &[char], case_sensitive: bool) -> Option<SelectionRange> {
    if target.is_empty() || target.len() > text.len() {
        return None;
    }
    text.windows(target.len())
        .position(|window| slices_match(window, target, case_sensitive))
        .map(|start| SelectionRange::new(start, target.len()))
}
