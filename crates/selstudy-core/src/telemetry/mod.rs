//! Telemetry delivery to the remote collector.
//!
//! Layers, bottom up: [`Transport`] (one POST), [`ScheduledRetry`] (backoff
//! with cancellation), [`DurableOutbox`] (file-backed queue of undelivered
//! calls) and [`TelemetryClient`] which ties them together.

pub mod client;
pub mod models;
pub mod outbox;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{BestEffortDelivery, TelemetryClient};
pub use models::{paths, Ack, SessionStartRequest, SessionStartResponse, SusSubmission};
pub use outbox::{DurableOutbox, OutboxEntry, ReplaySummary};
pub use retry::{RetryOutcome, RetryPolicy, ScheduledRetry};
pub use transport::{HttpTransport, Transport};
