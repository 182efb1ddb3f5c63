use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::selection::SelectionRange;
use crate::task::MethodKind;

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
    Abandoned,
}

/// Whether the task counted toward the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Training,
    Trial,
}

/// Final record of one task attempt, posted to `/metrics`.
///
/// Produced exactly once per attempt by the aggregator. Field names follow
/// the collector's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOutcome {
    pub id: Uuid,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    pub task_id: Uuid,
    pub task_name: String,
    pub selection_method: MethodKind,
    pub task_type: TaskType,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(rename = "timeTaken_ms")]
    pub time_taken_ms: i64,
    pub total_adjustments: u32,
    pub excess_travel: usize,
    pub precision_activations: u32,
    /// Seconds spent in precision mode.
    pub precision_duration: f64,
    pub gesture_count: u32,
    pub long_press_count: u32,
    pub tap_count: u32,
    pub drag_count: u32,
    pub accuracy_score: f64,
    pub error_count: u32,
    /// Characters per second.
    pub average_selection_speed: f64,
    pub completion_status: CompletionStatus,
    pub final_selection_start: usize,
    pub final_selection_end: usize,
    pub text_length: usize,
}

impl MetricOutcome {
    pub fn final_range(&self) -> SelectionRange {
        SelectionRange::new(
            self.final_selection_start,
            self.final_selection_end.saturating_sub(self.final_selection_start),
        )
    }

    pub fn is_completed(&self) -> bool {
        self.completion_status == CompletionStatus::Completed
    }
}
