//! Collector client: awaited calls and fire-and-forget delivery.
//!
//! `send` is one network call whose error the caller handles. `send_best_effort`
//! spawns a background task that retries on the configured schedule and hands
//! the payload to the [`DurableOutbox`] when the schedule runs out or the
//! client is shut down. It never reports failure to the interaction flow.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::models::Ack;
use super::outbox::{DurableOutbox, OutboxEntry, ReplaySummary};
use super::retry::{RetryOutcome, RetryPolicy, ScheduledRetry};
use super::transport::{HttpTransport, Transport};
use crate::error::{CoreError, DeliveryError};
use crate::storage::Config;

/// How a best-effort payload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffortDelivery {
    /// Accepted by the collector.
    Delivered { attempts: u32 },
    /// Every attempt failed; the payload now sits in the outbox.
    Queued { attempts: u32, reason: String },
    /// Could not be encoded or persisted and is lost.
    Dropped { reason: String },
}

impl BestEffortDelivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, BestEffortDelivery::Delivered { .. })
    }
}

#[derive(Clone)]
pub struct TelemetryClient {
    transport: Arc<dyn Transport>,
    outbox: Arc<DurableOutbox>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl std::fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("outbox", &self.outbox.path())
            .field("policy", &self.policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl TelemetryClient {
    pub fn new(transport: Arc<dyn Transport>, outbox: Arc<DurableOutbox>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            outbox,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// HTTP client and outbox as described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        let transport = HttpTransport::new(
            &config.collector.base_url,
            Duration::from_secs(config.collector.timeout_secs),
        )?;
        let outbox = DurableOutbox::shared(config.outbox_path()?);
        Ok(Self::new(Arc::new(transport), outbox, config.retry_policy()))
    }

    pub fn outbox(&self) -> &Arc<DurableOutbox> {
        &self.outbox
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Serialize `payload`, POST it once and decode the response.
    pub async fn send<Req, Resp>(&self, path: &str, payload: &Req) -> Result<Resp, DeliveryError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = encode(payload)?;
        tracing::debug!("telemetry: POST {path} ({} bytes)", body.len());
        let resp = self.transport.post(path, body).await?;
        decode(&resp)
    }

    /// Deliver `payload` in the background with retry and outbox fallback.
    ///
    /// The payload is encoded before this returns; the handle only matters to
    /// callers that want to wait for the result (tests, CLI teardown).
    pub fn send_best_effort<P>(&self, path: &str, payload: &P) -> JoinHandle<BestEffortDelivery>
    where
        P: Serialize + ?Sized,
    {
        let path = path.to_string();
        match encode(payload) {
            Ok(body) => {
                let client = self.clone();
                tokio::spawn(async move { client.deliver_or_queue(path, body).await })
            }
            Err(e) => {
                tracing::warn!("telemetry: dropping payload for {path}: {e}");
                tokio::spawn(async move { BestEffortDelivery::Dropped { reason: e.to_string() } })
            }
        }
    }

    /// Encode `payload` and put it straight into the outbox for the next replay.
    pub async fn queue<P>(&self, path: &str, payload: &P) -> Result<(), CoreError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode(payload)?;
        self.outbox.append(OutboxEntry::new(path, body)).await?;
        tracing::info!("telemetry: {path} queued in outbox");
        Ok(())
    }

    /// Attempt every queued outbox entry once. Store failures are logged and
    /// reported as an empty pass.
    pub async fn replay_outbox(&self) -> ReplaySummary {
        match self.outbox.replay_all(self.transport.as_ref()).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("outbox replay failed: {e}");
                ReplaySummary::default()
            }
        }
    }

    /// Stop pending retry schedules; their payloads go to the outbox.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn deliver_or_queue(&self, path: String, body: Vec<u8>) -> BestEffortDelivery {
        let retry = ScheduledRetry::new(self.policy, self.cancel.clone());
        let outcome = retry
            .run(|attempt| {
                let transport = self.transport.clone();
                let path = path.clone();
                let body = body.clone();
                async move {
                    tracing::debug!("telemetry: POST {path} attempt {attempt}");
                    let resp = transport.post(&path, body).await?;
                    decode::<Ack>(&resp)
                }
            })
            .await;

        let (attempts, reason) = match outcome {
            RetryOutcome::Delivered { attempts, .. } => {
                tracing::debug!("telemetry: delivered to {path} after {attempts} attempt(s)");
                return BestEffortDelivery::Delivered { attempts };
            }
            RetryOutcome::Exhausted { last_error, attempts } => (attempts, last_error.to_string()),
            RetryOutcome::Cancelled { attempts } => (attempts, DeliveryError::Cancelled.to_string()),
        };

        tracing::warn!("telemetry: {path} undelivered after {attempts} attempt(s) ({reason}); queueing in outbox");
        match self.outbox.append(OutboxEntry::new(path, body)).await {
            Ok(()) => BestEffortDelivery::Queued { attempts, reason },
            Err(e) => {
                tracing::warn!("{e}; payload dropped");
                BestEffortDelivery::Dropped { reason: e.to_string() }
            }
        }
    }
}

fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>, DeliveryError> {
    serde_json::to_vec(payload).map_err(|e| DeliveryError::Encoding(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DeliveryError> {
    serde_json::from_slice(bytes).map_err(|e| DeliveryError::Decoding(e.to_string()))
}
