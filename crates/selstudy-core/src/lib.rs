//! # Selstudy Core Library
//!
//! This library provides the core logic for a text-selection user study. It
//! implements a CLI-first philosophy where every operation is available via a
//! standalone CLI binary; an interactive front end only has to feed selection
//! changes and gestures into the same library.
//!
//! ## Architecture
//!
//! - **Selection**: Matching of live selection ranges against a task's target
//!   span, including snapping over-inclusive selections to the target
//! - **Metrics**: A per-attempt aggregator that turns the event stream into a
//!   single outcome record
//! - **Telemetry**: Delivery of outcomes to the remote collector with retry,
//!   a durable outbox, and replay on the next start
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SelectionEvaluator`]: Exact-match and snap logic
//! - [`MetricsAggregator`]: Attempt state machine producing [`MetricOutcome`]
//! - [`TelemetryClient`]: Awaited and best-effort collector calls
//! - [`DurableOutbox`]: File-backed queue of undelivered calls
//! - [`StudySession`]: Session identity, SUS submission and scoring
//! - [`Config`]: Application configuration management

pub mod error;
pub mod metrics;
pub mod selection;
pub mod session;
pub mod storage;
pub mod task;
pub mod telemetry;

pub use error::{ConfigError, CoreError, DeliveryError, PersistenceError, ValidationError};
pub use metrics::{
    AttemptPhase, AttemptProgress, CompletionStatus, GestureEvent, MetricOutcome, MetricsAggregator,
    Snapshot, SnapshotProvider, TaskType,
};
pub use selection::{MatchKind, SelectionEvaluator, SelectionRange};
pub use session::{sus_score, StudySession};
pub use storage::{data_dir, Config};
pub use task::{default_tasks, MethodKind, TaskSpec};
pub use telemetry::{
    BestEffortDelivery, DurableOutbox, HttpTransport, OutboxEntry, ReplaySummary, RetryPolicy,
    TelemetryClient, Transport,
};
