//! Study session: identity, counterbalancing and submissions.
//!
//! A session always has an id. When the collector cannot be reached at start
//! the session runs offline under a locally generated `local-<uuid>` id and
//! every later submission carries that id.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::metrics::{MetricOutcome, MetricsAggregator};
use crate::task::{ordered_for_arm, TaskSpec};
use crate::telemetry::{
    paths, Ack, BestEffortDelivery, SessionStartRequest, SessionStartResponse, SusSubmission,
    TelemetryClient,
};

/// Status text returned after an accepted SUS submission.
pub const SUS_SUBMITTED: &str = "Submitted!";

/// Number of items in the System Usability Scale questionnaire.
pub const SUS_ITEMS: usize = 10;

#[derive(Debug)]
pub struct StudySession {
    client: TelemetryClient,
    session_id: String,
    participant_id: Option<String>,
    counterbalance_arm: u8,
    offline: bool,
}

impl StudySession {
    /// Register a session with the collector, falling back to an offline id.
    ///
    /// `counterbalance_arm` must be 0 or 1; `None` picks one at random.
    ///
    /// # Errors
    /// Only for invalid input. Collector failures never fail the start.
    pub async fn start(
        client: TelemetryClient,
        participant_id: &str,
        counterbalance_arm: Option<u8>,
    ) -> Result<Self> {
        let participant_id = participant_id.trim();
        if participant_id.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "participantId".into(),
                message: "must not be empty".into(),
            }
            .into());
        }
        let arm = resolve_arm(counterbalance_arm)?;

        let request = SessionStartRequest {
            participant_id: participant_id.to_string(),
            counterbalance_arm: arm,
            started_at: Utc::now(),
        };
        let (session_id, offline) = match client
            .send::<_, SessionStartResponse>(paths::SESSION_START, &request)
            .await
        {
            Ok(resp) => (resp.session_id, false),
            Err(e) => {
                let local = format!("local-{}", Uuid::new_v4());
                tracing::warn!("session start failed ({e}); continuing offline as {local}");
                (local, true)
            }
        };
        tracing::info!("session {session_id} started for {participant_id} (arm {arm})");

        Ok(Self {
            client,
            session_id,
            participant_id: Some(participant_id.to_string()),
            counterbalance_arm: arm,
            offline,
        })
    }

    /// Reattach to a session started earlier, without contacting the collector.
    pub fn resume(
        client: TelemetryClient,
        session_id: impl Into<String>,
        participant_id: Option<String>,
        counterbalance_arm: u8,
    ) -> Self {
        let session_id = session_id.into();
        let offline = session_id.starts_with("local-");
        Self {
            client,
            session_id,
            participant_id,
            counterbalance_arm,
            offline,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    pub fn counterbalance_arm(&self) -> u8 {
        self.counterbalance_arm
    }

    /// True when the collector did not issue the session id.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn client(&self) -> &TelemetryClient {
        &self.client
    }

    /// Tasks in this session's counterbalanced order.
    pub fn ordered_tasks(&self, tasks: Vec<TaskSpec>) -> Vec<TaskSpec> {
        ordered_for_arm(tasks, self.counterbalance_arm)
    }

    /// Fresh aggregator for one attempt at `task`, starting now.
    pub fn begin_attempt(&self, task: Arc<TaskSpec>) -> MetricsAggregator {
        let attempt = MetricsAggregator::new(task, self.session_id.clone(), Utc::now());
        match &self.participant_id {
            Some(p) => attempt.with_participant(p.clone()),
            None => attempt,
        }
    }

    /// Queue an outcome for background delivery.
    pub fn submit_outcome(&self, outcome: &MetricOutcome) -> JoinHandle<BestEffortDelivery> {
        self.client.send_best_effort(paths::METRICS, outcome)
    }

    /// Validate and send a SUS questionnaire, waiting for the collector.
    ///
    /// A retryable failure still returns the error, but the submission is
    /// first written to the outbox so the next replay delivers it.
    ///
    /// # Errors
    /// Invalid responses, or any delivery failure. The error's display text
    /// is what the participant is shown.
    pub async fn submit_sus(&self, responses: &[u8]) -> Result<&'static str> {
        validate_sus_responses(responses)?;
        let submission = SusSubmission {
            session_id: self.session_id.clone(),
            responses: responses.to_vec(),
            submitted_at: Utc::now(),
        };
        if let Err(e) = self.client.send::<_, Ack>(paths::SUS, &submission).await {
            if e.is_retryable() {
                if let Err(queue_err) = self.client.queue(paths::SUS, &submission).await {
                    tracing::warn!("SUS for session {} lost: {queue_err}", self.session_id);
                }
            }
            return Err(e.into());
        }
        tracing::info!(
            "SUS submitted for session {} (score {:.1})",
            self.session_id,
            sus_score(responses)
        );
        Ok(SUS_SUBMITTED)
    }
}

fn resolve_arm(arm: Option<u8>) -> Result<u8, ValidationError> {
    match arm {
        Some(a @ (0 | 1)) => Ok(a),
        Some(other) => Err(ValidationError::InvalidValue {
            field: "counterbalanceArm".into(),
            message: format!("expected 0 or 1, got {other}"),
        }),
        None => Ok(rand::thread_rng().gen_range(0..=1)),
    }
}

/// Exactly ten answers, each on the 1..=5 Likert scale.
pub fn validate_sus_responses(responses: &[u8]) -> Result<(), ValidationError> {
    if responses.len() != SUS_ITEMS {
        return Err(ValidationError::InvalidValue {
            field: "responses".into(),
            message: format!("expected {SUS_ITEMS} answers, got {}", responses.len()),
        });
    }
    if let Some((index, _)) = responses
        .iter()
        .enumerate()
        .find(|(_, r)| !(1..=5).contains(*r))
    {
        return Err(ValidationError::OutOfBounds {
            collection: "SUS scale 1..=5".into(),
            index,
            len: SUS_ITEMS,
        });
    }
    Ok(())
}

/// Standard SUS score on 0..=100; 0 for malformed input.
///
/// Odd-numbered items contribute `r - 1`, even-numbered items `5 - r`.
pub fn sus_score(responses: &[u8]) -> f64 {
    if validate_sus_responses(responses).is_err() {
        return 0.0;
    }
    let sum: u32 = responses
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            if i % 2 == 0 {
                u32::from(r) - 1
            } else {
                5 - u32::from(r)
            }
        })
        .sum();
    f64::from(sum) * 2.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::task::default_tasks;
    use crate::telemetry::testing::FakeTransport;
    use crate::telemetry::{DurableOutbox, RetryPolicy};
    use tempfile::TempDir;

    fn client(transport: Arc<FakeTransport>, dir: &TempDir) -> TelemetryClient {
        let outbox = DurableOutbox::new(dir.path().join("outbox.json"));
        TelemetryClient::new(transport, Arc::new(outbox), RetryPolicy::default())
    }

    #[tokio::test]
    async fn start_uses_collector_session_id() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::scripted(
            vec![Ok(br#"{"sessionId":"srv-42"}"#.to_vec())],
            true,
        ));
        let session = StudySession::start(client(transport.clone(), &dir), "P01", Some(1))
            .await
            .unwrap();

        assert_eq!(session.session_id(), "srv-42");
        assert!(!session.is_offline());
        assert_eq!(session.counterbalance_arm(), 1);
        assert_eq!(transport.paths(), vec!["/sessions/start".to_string()]);
    }

    #[tokio::test]
    async fn start_falls_back_to_local_id() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_failing());
        let session = StudySession::start(client(transport.clone(), &dir), "P01", Some(0))
            .await
            .unwrap();

        assert!(session.session_id().starts_with("local-"));
        assert!(session.is_offline());
        // Awaited call: no retries.
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn start_rejects_blank_participant_and_bad_arm() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_ok());

        let err = StudySession::start(client(transport.clone(), &dir), "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = StudySession::start(client(transport.clone(), &dir), "P01", Some(2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("counterbalanceArm"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn random_arm_is_zero_or_one() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_failing());
        for _ in 0..10 {
            let session = StudySession::start(client(transport.clone(), &dir), "P01", None)
                .await
                .unwrap();
            assert!(session.counterbalance_arm() <= 1);
        }
    }

    #[tokio::test]
    async fn ordered_tasks_follow_arm() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_failing());
        let session = StudySession::start(client(transport, &dir), "P01", Some(1))
            .await
            .unwrap();
        let tasks = session.ordered_tasks(default_tasks());
        assert_eq!(tasks[0].target, "brown");
    }

    #[tokio::test]
    async fn begin_attempt_binds_session_and_participant() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_failing());
        let session = StudySession::start(client(transport, &dir), "P09", Some(0))
            .await
            .unwrap();
        let task = Arc::new(default_tasks().remove(0));
        let mut attempt = session.begin_attempt(task);
        let outcome = attempt.abandon(Utc::now()).unwrap();
        assert_eq!(outcome.session_id, session.session_id());
        assert_eq!(outcome.participant_id.as_deref(), Some("P09"));
    }

    #[test]
    fn resume_detects_offline_ids() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_ok());
        let offline = StudySession::resume(client(transport.clone(), &dir), "local-1234", None, 0);
        assert!(offline.is_offline());
        assert!(offline.participant_id().is_none());

        let online = StudySession::resume(client(transport, &dir), "srv-1", Some("P02".into()), 1);
        assert!(!online.is_offline());
        assert_eq!(online.participant_id(), Some("P02"));
    }

    #[tokio::test]
    async fn submit_sus_validates_before_sending() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_ok());
        let session = StudySession::start(client(transport.clone(), &dir), "P01", Some(0))
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let before = transport.call_count();

        assert!(session.submit_sus(&[3; 9]).await.is_err());
        assert!(session.submit_sus(&[3, 3, 3, 3, 3, 3, 3, 3, 3, 6]).await.is_err());
        assert_eq!(transport.call_count(), before);
    }

    #[tokio::test]
    async fn submit_sus_reports_status_text() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::scripted(
            vec![Ok(br#"{"sessionId":"s1"}"#.to_vec()), Ok(b"{}".to_vec()), Err(500)],
            true,
        ));
        let session = StudySession::start(client(transport.clone(), &dir), "P01", Some(0))
            .await
            .unwrap();

        let ok = session.submit_sus(&[4; 10]).await.unwrap();
        assert_eq!(ok, "Submitted!");

        let err = session.submit_sus(&[4; 10]).await.unwrap_err();
        assert!(err.to_string().ends_with("Server returned 500."));
        assert_eq!(transport.paths()[1], "/sus");
    }

    #[tokio::test]
    async fn failed_sus_is_kept_in_outbox() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::always_failing());
        let session = StudySession::resume(client(transport.clone(), &dir), "local-1", None, 0);

        let err = session.submit_sus(&[3; 10]).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(transport.call_count(), 1);

        let entries = session.client().outbox().entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].destination_path, "/sus");
        let body: serde_json::Value = serde_json::from_slice(&entries[0].payload).unwrap();
        assert_eq!(body["sessionId"], "local-1");
        assert_eq!(body["responses"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn queued_sus_is_delivered_by_replay() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::scripted(vec![Err(503)], true));
        let session = StudySession::resume(client(transport.clone(), &dir), "srv-9", None, 1);

        assert!(session.submit_sus(&[4; 10]).await.is_err());
        let summary = session.client().replay_outbox().await;
        assert_eq!(summary.delivered, 1);
        assert_eq!(transport.paths(), vec!["/sus".to_string(), "/sus".to_string()]);
        assert!(session.client().outbox().entries().await.is_empty());
    }

    #[test]
    fn sus_score_examples() {
        assert_eq!(sus_score(&[3; 10]), 50.0);
        assert_eq!(sus_score(&[5, 1, 5, 1, 5, 1, 5, 1, 5, 1]), 100.0);
        assert_eq!(sus_score(&[1, 5, 1, 5, 1, 5, 1, 5, 1, 5]), 0.0);
        assert_eq!(sus_score(&[4, 2, 4, 2, 4, 2, 4, 2, 4, 2]), 75.0);
    }

    #[test]
    fn sus_score_is_zero_for_malformed_input() {
        assert_eq!(sus_score(&[]), 0.0);
        assert_eq!(sus_score(&[5; 11]), 0.0);
        assert_eq!(sus_score(&[0, 5, 5, 5, 5, 5, 5, 5, 5, 5]), 0.0);
    }
}
