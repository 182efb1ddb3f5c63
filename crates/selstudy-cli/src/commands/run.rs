//! Replay a scripted interaction against one task.
//!
//! The event file is a JSON array, for example:
//!
//! ```json
//! [
//!   { "type": "selection", "atMs": 0,   "start": 0, "length": 0 },
//!   { "type": "gesture",   "atMs": 400, "gesture": "longPressBegan" },
//!   { "type": "selection", "atMs": 900, "start": 3, "length": 6 },
//!   { "type": "gesture",   "atMs": 1200, "gesture": "longPressEnded" }
//! ]
//! ```
//!
//! An optional `{ "type": "abandon", "atMs": N }` ends the attempt without a
//! match; a script that simply runs out does the same at its last timestamp.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use clap::Args;
use serde::Deserialize;
use selstudy_core::metrics::{AttemptProgress, GestureEvent, MetricsAggregator};
use selstudy_core::task::ordered_for_arm;
use selstudy_core::{BestEffortDelivery, Config, MetricOutcome, SelectionRange, StudySession};

use super::connected_client;

#[derive(Args)]
pub struct RunArgs {
    /// Task number as shown by `tasks list`
    #[arg(long)]
    task: usize,
    /// JSON event script
    #[arg(long)]
    events: PathBuf,
    /// Counterbalance arm used to number the tasks
    #[arg(long, default_value_t = 0)]
    arm: u8,
    /// Session id recorded in the outcome
    #[arg(long, default_value = "local-cli")]
    session_id: String,
    /// Deliver the outcome to the collector (best effort)
    #[arg(long)]
    submit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ScriptedEvent {
    #[serde(rename_all = "camelCase")]
    Selection { at_ms: i64, start: usize, length: usize },
    #[serde(rename_all = "camelCase")]
    Gesture { at_ms: i64, gesture: GestureEvent },
    #[serde(rename_all = "camelCase")]
    Abandon { at_ms: i64 },
}

impl ScriptedEvent {
    fn at_ms(&self) -> i64 {
        match self {
            ScriptedEvent::Selection { at_ms, .. }
            | ScriptedEvent::Gesture { at_ms, .. }
            | ScriptedEvent::Abandon { at_ms } => *at_ms,
        }
    }
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.arm > 1 {
        return Err(format!("arm must be 0 or 1, got {}", args.arm).into());
    }
    let config = Config::load_or_default();
    let tasks = ordered_for_arm(config.tasks()?, args.arm);
    let task = args
        .task
        .checked_sub(1)
        .and_then(|i| tasks.get(i))
        .cloned()
        .ok_or_else(|| format!("no task {} (have {})", args.task, tasks.len()))?;

    let script = std::fs::read_to_string(&args.events)
        .map_err(|e| format!("cannot read {}: {e}", args.events.display()))?;
    let events: Vec<ScriptedEvent> = serde_json::from_str(&script)?;

    let task = Arc::new(task);
    eprintln!("task: {} (select \"{}\")", task.title, task.target);

    let started_at = Utc::now();
    let mut attempt = MetricsAggregator::new(task, args.session_id.clone(), started_at);
    if let Some(participant) = &config.study.participant_id {
        attempt = attempt.with_participant(participant.clone());
    }

    let outcome = play(&mut attempt, &events, started_at)?.ok_or("attempt produced no outcome")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if args.submit {
        let (_, client) = connected_client().await?;
        let session = StudySession::resume(
            client,
            args.session_id,
            config.study.participant_id.clone(),
            args.arm,
        );
        let delivery = session.submit_outcome(&outcome).await?;
        match delivery {
            BestEffortDelivery::Delivered { attempts } => {
                eprintln!("delivered after {attempts} attempt(s)")
            }
            BestEffortDelivery::Queued { attempts, reason } => {
                eprintln!("queued in outbox after {attempts} attempt(s): {reason}")
            }
            BestEffortDelivery::Dropped { reason } => return Err(reason.into()),
        }
    }
    Ok(())
}

/// `started_at` shifted by a script offset, or an error when out of range.
fn offset(started_at: DateTime<Utc>, at_ms: i64) -> Result<DateTime<Utc>, String> {
    TimeDelta::try_milliseconds(at_ms)
        .and_then(|d| started_at.checked_add_signed(d))
        .ok_or_else(|| format!("event offset {at_ms}ms is out of range"))
}

fn play(
    attempt: &mut MetricsAggregator,
    events: &[ScriptedEvent],
    started_at: DateTime<Utc>,
) -> Result<Option<MetricOutcome>, String> {
    let mut last_at = started_at;
    for event in events {
        let at = offset(started_at, event.at_ms())?;
        last_at = last_at.max(at);
        match event {
            ScriptedEvent::Selection { start, length, .. } => {
                let range = SelectionRange::new(*start, *length);
                match attempt.on_selection_changed(range, at) {
                    AttemptProgress::Pending => eprintln!("{:>6}ms  {range}  pending", event.at_ms()),
                    AttemptProgress::Blocked { hint, snapped_to } => {
                        let snap = snapped_to.map(|r| format!(" (snapped to {r})")).unwrap_or_default();
                        eprintln!("{:>6}ms  {range}  blocked{snap}: {hint}", event.at_ms());
                    }
                    AttemptProgress::Completed { outcome, snapped_to } => {
                        let snap = snapped_to.map(|r| format!(" (snapped to {r})")).unwrap_or_default();
                        eprintln!("{:>6}ms  {range}  completed{snap}", event.at_ms());
                        return Ok(Some(outcome));
                    }
                    AttemptProgress::Finished => {}
                }
            }
            ScriptedEvent::Gesture { gesture, .. } => {
                attempt.on_gesture(*gesture, at);
                eprintln!("{:>6}ms  {gesture:?}", event.at_ms());
            }
            ScriptedEvent::Abandon { .. } => break,
        }
    }

    eprintln!("attempt abandoned");
    Ok(attempt.abandon(last_at))
}
