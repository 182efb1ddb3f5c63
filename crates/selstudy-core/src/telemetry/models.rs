//! Request and response bodies exchanged with the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collector endpoint paths.
pub mod paths {
    pub const SESSION_START: &str = "/sessions/start";
    pub const METRICS: &str = "/metrics";
    pub const SUS: &str = "/sus";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartRequest {
    pub participant_id: String,
    pub counterbalance_arm: u8,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartResponse {
    pub session_id: String,
}

/// System Usability Scale questionnaire answers, ten items in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SusSubmission {
    pub session_id: String,
    pub responses: Vec<u8>,
    pub submitted_at: DateTime<Utc>,
}

/// Any JSON object; the collector's acknowledgement body is not inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}
