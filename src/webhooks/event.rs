//! Event envelope posted to webhook subscribers.

use serde::{Deserialize, Serialize};

use crate::status::WorkerStatus;

/// Path appended to a subscriber's base URL for health events.
pub const STATUS_PATH: &str = "/v1/status";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEvent {
    pub jibri_id: String,
    pub status: WorkerStatus,
}

impl HealthEvent {
    pub fn new(jibri_id: impl Into<String>, status: WorkerStatus) -> Self {
        Self {
            jibri_id: jibri_id.into(),
            status,
        }
    }

    /// Canonical JSON body; identical for every subscriber of one update.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn url_for(subscriber: &str) -> String {
        format!("{}{}", subscriber.trim_end_matches('/'), STATUS_PATH)
    }
}
