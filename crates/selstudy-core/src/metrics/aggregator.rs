//! Per-attempt metrics aggregator.
//!
//! One aggregator is constructed per task attempt and never reused: once it
//! reaches `Completed` every further event is ignored, and the next task gets
//! a fresh instance via [`MetricsAggregator::rebind`]. Nothing is reset by
//! hand, so no counter can leak from one attempt into the next.
//!
//! Events arrive on the interaction thread only; there is no internal locking.
//!
//! ## Usage
//!
//! ```ignore
//! let mut attempt = MetricsAggregator::new(task, session_id, Utc::now());
//! attempt.on_gesture(GestureEvent::LongPressBegan, Utc::now());
//! match attempt.on_selection_changed(range, Utc::now()) {
//!     AttemptProgress::Completed { outcome, .. } => session.submit_outcome(outcome),
//!     AttemptProgress::Blocked { hint, .. } => show(hint),
//!     _ => {}
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accuracy::{accuracy_score, excess_travel, selection_speed};
use super::gesture::{GestureEvent, GestureTally, Snapshot, SnapshotProvider};
use super::outcome::{CompletionStatus, MetricOutcome, TaskType};
use crate::selection::{Evaluation, GateCheck, MatchKind, SelectionEvaluator, SelectionRange};
use crate::task::{MethodKind, TaskSpec};

/// Hint shown when a precision task is matched before precision mode was used.
pub const PRECISION_HINT: &str = "Long-press to use Precision mode for this task.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Active,
    /// Last selection matched but the precision gate was closed.
    GateBlocked,
    /// Terminal.
    Completed,
}

/// What the caller should do after a selection change.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptProgress {
    /// Selection does not qualify yet.
    Pending,
    /// Selection qualifies but precision mode was never activated.
    Blocked {
        hint: &'static str,
        /// Corrected selection to show, when the match was a snap.
        snapped_to: Option<SelectionRange>,
    },
    /// The attempt finished; `outcome` is emitted exactly once.
    Completed {
        outcome: MetricOutcome,
        snapped_to: Option<SelectionRange>,
    },
    /// The attempt had already finished; the event was ignored.
    Finished,
}

/// Accumulates one attempt's interaction metrics.
pub struct MetricsAggregator {
    task: Arc<TaskSpec>,
    evaluator: SelectionEvaluator,
    session_id: String,
    participant_id: Option<String>,
    snapshot_provider: Option<Arc<dyn SnapshotProvider>>,

    started_at: DateTime<Utc>,
    phase: AttemptPhase,
    adjustments: u32,
    net_travel: usize,
    last_anchor: usize,
    last_range: Option<SelectionRange>,
    last_correct: bool,
    error_count: u32,
    gestures: GestureTally,
    precision_activations: u32,
    precision_duration: Duration,
    precision_since: Option<DateTime<Utc>>,
    precision_ever_used: bool,
    magnifier: Option<Snapshot>,
}

impl MetricsAggregator {
    /// Start a new attempt for `task` at `started_at`.
    pub fn new(task: Arc<TaskSpec>, session_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        let evaluator = task.evaluator();
        Self {
            task,
            evaluator,
            session_id: session_id.into(),
            participant_id: None,
            snapshot_provider: None,
            started_at,
            phase: AttemptPhase::Active,
            adjustments: 0,
            net_travel: 0,
            last_anchor: 0,
            last_range: None,
            last_correct: false,
            error_count: 0,
            gestures: GestureTally::default(),
            precision_activations: 0,
            precision_duration: Duration::zero(),
            precision_since: None,
            precision_ever_used: false,
            magnifier: None,
        }
    }

    pub fn with_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    pub fn with_snapshot_provider(mut self, provider: Arc<dyn SnapshotProvider>) -> Self {
        self.snapshot_provider = Some(provider);
        self
    }

    /// Consume this attempt and start a fresh one for `task`.
    ///
    /// Session, participant and snapshot provider carry over; every counter
    /// starts from zero.
    pub fn rebind(self, task: Arc<TaskSpec>, started_at: DateTime<Utc>) -> Self {
        let mut next = Self::new(task, self.session_id, started_at);
        next.participant_id = self.participant_id;
        next.snapshot_provider = self.snapshot_provider;
        next
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn task(&self) -> &TaskSpec {
        &self.task
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn adjustments(&self) -> u32 {
        self.adjustments
    }

    pub fn net_travel(&self) -> usize {
        self.net_travel
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn gestures(&self) -> GestureTally {
        self.gestures
    }

    pub fn precision_active(&self) -> bool {
        self.precision_since.is_some()
    }

    pub fn precision_ever_used(&self) -> bool {
        self.precision_ever_used
    }

    /// Corrective hint while the gate blocks a match.
    pub fn hint(&self) -> Option<&'static str> {
        (self.phase == AttemptPhase::GateBlocked).then_some(PRECISION_HINT)
    }

    /// Latest magnifier snapshot while precision mode is on.
    pub fn magnifier(&self) -> Option<&Snapshot> {
        self.magnifier.as_ref()
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Record a selection change and check for completion.
    pub fn on_selection_changed(&mut self, range: SelectionRange, at: DateTime<Utc>) -> AttemptProgress {
        if self.phase == AttemptPhase::Completed {
            return AttemptProgress::Finished;
        }

        let anchor = range.anchor();
        self.net_travel = self.net_travel.saturating_add(anchor.abs_diff(self.last_anchor));
        self.adjustments += 1;
        self.last_anchor = anchor;
        self.last_range = Some(range);

        if self.precision_active() {
            self.refresh_magnifier();
        }

        let gate = GateCheck::for_task(self.task.requires_precision_gate(), self.precision_ever_used);
        let evaluation = self.evaluator.evaluate(range, gate);

        let correct = evaluation.is_correct();
        if self.last_correct && !correct {
            self.error_count += 1;
        }
        self.last_correct = correct;

        match evaluation {
            Evaluation::NoMatch => {
                self.phase = AttemptPhase::Active;
                AttemptProgress::Pending
            }
            Evaluation::GateBlocked(m) => {
                tracing::debug!(task = %self.task.id, "match blocked until precision mode is used");
                self.phase = AttemptPhase::GateBlocked;
                AttemptProgress::Blocked {
                    hint: PRECISION_HINT,
                    snapped_to: snapped(&m),
                }
            }
            Evaluation::Complete(m) => {
                // Scored against the first occurrence, even when a later one matched.
                let target = self.evaluator.expected_range();
                let outcome = self.finish(m.range(), target, CompletionStatus::Completed, at);
                AttemptProgress::Completed {
                    outcome,
                    snapped_to: snapped(&m),
                }
            }
        }
    }

    /// Record a categorized gesture.
    ///
    /// Long-press begin/end switch precision mode on and off, but only on
    /// precision tasks; elsewhere the press is tallied and nothing else.
    pub fn on_gesture(&mut self, gesture: GestureEvent, at: DateTime<Utc>) {
        if self.phase == AttemptPhase::Completed {
            return;
        }
        self.gestures.record(gesture);

        match gesture {
            GestureEvent::LongPressBegan => {
                if self.task.method != MethodKind::Precision || self.precision_since.is_some() {
                    return;
                }
                self.precision_since = Some(at);
                self.precision_activations += 1;
                self.precision_ever_used = true;
                self.refresh_magnifier();
            }
            GestureEvent::LongPressEnded => self.close_precision(at),
            GestureEvent::Tap | GestureEvent::Drag => {}
        }
    }

    /// End the attempt without a qualifying match.
    ///
    /// Scores the last selection against the target. Returns `None` if the
    /// attempt already finished.
    pub fn abandon(&mut self, at: DateTime<Utc>) -> Option<MetricOutcome> {
        if self.phase == AttemptPhase::Completed {
            return None;
        }
        let last = self
            .last_range
            .unwrap_or_else(|| SelectionRange::caret(self.last_anchor));
        let target = self.evaluator.expected_range();
        Some(self.finish(last, target, CompletionStatus::Abandoned, at))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(
        &mut self,
        final_range: SelectionRange,
        target: Option<SelectionRange>,
        status: CompletionStatus,
        at: DateTime<Utc>,
    ) -> MetricOutcome {
        self.close_precision(at);
        self.phase = AttemptPhase::Completed;

        let elapsed = at - self.started_at;
        let accuracy = target.map(|t| accuracy_score(final_range, t)).unwrap_or(0.0);
        let outcome = MetricOutcome {
            id: Uuid::new_v4(),
            session_id: self.session_id.clone(),
            participant_id: self.participant_id.clone(),
            task_id: self.task.id,
            task_name: self.task.title.clone(),
            selection_method: self.task.method,
            task_type: if self.task.training {
                TaskType::Training
            } else {
                TaskType::Trial
            },
            started_at: self.started_at,
            ended_at: at,
            time_taken_ms: elapsed.num_milliseconds().max(0),
            total_adjustments: self.adjustments,
            excess_travel: excess_travel(self.adjustments, self.net_travel, final_range.length),
            precision_activations: self.precision_activations,
            precision_duration: duration_secs(self.precision_duration),
            gesture_count: self.gestures.total(),
            long_press_count: self.gestures.long_presses,
            tap_count: self.gestures.taps,
            drag_count: self.gestures.drags,
            accuracy_score: accuracy,
            error_count: self.error_count,
            average_selection_speed: selection_speed(final_range.length, elapsed),
            completion_status: status,
            final_selection_start: final_range.start,
            final_selection_end: final_range.end(),
            text_length: self.evaluator.text_len(),
        };

        tracing::info!(
            task = %self.task.title,
            method = %self.task.method,
            status = ?status,
            adjustments = outcome.total_adjustments,
            accuracy = outcome.accuracy_score,
            "attempt finished"
        );
        outcome
    }

    fn close_precision(&mut self, at: DateTime<Utc>) {
        if let Some(since) = self.precision_since.take() {
            let held = at - since;
            if held > Duration::zero() {
                self.precision_duration = self.precision_duration + held;
            }
            self.magnifier = None;
        }
    }

    fn refresh_magnifier(&mut self) {
        if let Some(provider) = &self.snapshot_provider {
            self.magnifier = provider.capture();
        }
    }
}

fn snapped(m: &MatchKind) -> Option<SelectionRange> {
    m.is_snapped().then(|| m.range())
}

fn duration_secs(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}
