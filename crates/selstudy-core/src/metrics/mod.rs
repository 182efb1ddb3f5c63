//! Task-attempt metrics: gesture tallies, scoring and the per-attempt aggregator.

pub mod accuracy;
pub mod aggregator;
pub mod gesture;
pub mod outcome;

pub use accuracy::{accuracy_score, excess_travel, selection_speed};
pub use aggregator::{AttemptPhase, AttemptProgress, MetricsAggregator, PRECISION_HINT};
pub use gesture::{GestureEvent, GestureTally, Snapshot, SnapshotProvider};
pub use outcome::{CompletionStatus, MetricOutcome, TaskType};
