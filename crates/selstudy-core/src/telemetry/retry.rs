//! Scheduled retry with exponential backoff and cancellation.
//!
//! Delays are `tokio::time::sleep`s inside the calling task, so they never
//! block the interaction thread and are driven by the paused clock in tests.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::DeliveryError;

/// Backoff schedule: one immediate attempt, then `max_retries` more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_retries,
            initial_delay,
            multiplier,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-based): `initial * multiplier^(retry-1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(retry.saturating_sub(1).min(16));
        self.initial_delay.saturating_mul(factor)
    }

    /// All retry delays in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_retries).map(|r| self.delay_for(r))
    }
}

/// Result of running an operation under a [`ScheduledRetry`].
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Delivered { value: T, attempts: u32 },
    Exhausted { last_error: DeliveryError, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Delivered { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, RetryOutcome::Delivered { .. })
    }
}

/// Runs an async operation on a retry schedule until it succeeds, the
/// schedule is exhausted, or the token is cancelled.
#[derive(Debug, Clone)]
pub struct ScheduledRetry {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ScheduledRetry {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op`, passing the 1-based attempt number.
    ///
    /// Non-retryable errors end the schedule early. Cancellation is observed
    /// before the first attempt and during every backoff sleep; an attempt
    /// already in flight runs to completion.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DeliveryError>>,
    {
        if self.cancel.is_cancelled() {
            return RetryOutcome::Cancelled { attempts: 0 };
        }

        let total = self.policy.total_attempts();
        let mut last_error = DeliveryError::Cancelled;

        for attempt in 1..=total {
            if attempt > 1 {
                let delay = self.policy.delay_for(attempt - 1);
                tracing::debug!(
                    "telemetry: retry attempt {}/{} after {:?}",
                    attempt - 1,
                    self.policy.max_retries,
                    delay
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        return RetryOutcome::Cancelled { attempts: attempt - 1 };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match op(attempt).await {
                Ok(value) => return RetryOutcome::Delivered { value, attempts: attempt },
                Err(e) if !e.is_retryable() => {
                    return RetryOutcome::Exhausted { last_error: e, attempts: attempt };
                }
                Err(e) => {
                    tracing::debug!("telemetry: attempt {attempt}/{total} failed: {e}");
                    last_error = e;
                }
            }
        }

        RetryOutcome::Exhausted {
            last_error,
            attempts: total,
        }
    }
}
