//! Worker status snapshot reported to webhook subscribers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusyStatus {
    Idle,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub status: HealthStatus,
    /// Component id to detail string; ordered so serialization is canonical.
    pub details: BTreeMap<String, String>,
}

impl OverallHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            details: BTreeMap::new(),
        }
    }
}

/// Immutable snapshot handed to the webhook dispatcher by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub busy_status: BusyStatus,
    pub health: OverallHealth,
}

impl WorkerStatus {
    pub fn new(busy_status: BusyStatus, health: OverallHealth) -> Self {
        Self {
            busy_status,
            health,
        }
    }

    pub fn idle_healthy() -> Self {
        Self::new(BusyStatus::Idle, OverallHealth::healthy())
    }
}
