//! Live selection matching against a task's target span.

pub mod evaluator;
pub mod range;

pub use evaluator::{is_boundary_char, Evaluation, GateCheck, MatchKind, SelectionEvaluator};
pub use range::SelectionRange;
