//! Normalized instance status vocabulary.
//!
//! Each compute provider exposes its own raw status strings. The rest of
//! the platform only ever sees [`InstanceStatus`]; the mapping functions
//! here are total: any raw value they do not recognize maps to
//! [`InstanceStatus::Unknown`], never to an error.

use serde::{Deserialize, Serialize};

/// Provider-independent instance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// The instance is up and reachable.
    Running,
    /// The provider accepted a start and the instance is booting.
    Provisioning,
    /// A stop has been requested and is in progress.
    Stopping,
    /// The instance is stopped, failed, or exited.
    Terminated,
    /// The instance record does not exist (yet, or any more).
    NotFound,
    /// No instance identity is configured.
    NotConfigured,
    /// The provider reported a status we do not recognize.
    Unknown,
    /// A status query itself failed.
    Error,
}

impl InstanceStatus {
    /// Map a raw GCE instance status onto the normalized vocabulary.
    ///
    /// GCE uses `PROVISIONING`/`STAGING` for boot phases and `TERMINATED`
    /// for a stopped VM.
    pub fn from_gce(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "RUNNING" => InstanceStatus::Running,
            "PROVISIONING" | "STAGING" | "PENDING" | "STARTING" => InstanceStatus::Provisioning,
            "STOPPING" | "SUSPENDING" => InstanceStatus::Stopping,
            "TERMINATED" | "STOPPED" | "SUSPENDED" => InstanceStatus::Terminated,
            _ => InstanceStatus::Unknown,
        }
    }

    /// Map a raw pod-service status onto the normalized vocabulary.
    ///
    /// Idle pods are still reachable, so `IDLE` counts as running.
    pub fn from_pod(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "RUNNING" | "IDLE" => InstanceStatus::Running,
            "STARTING" | "PENDING" | "CREATED" => InstanceStatus::Provisioning,
            "STOPPING" => InstanceStatus::Stopping,
            "STOPPED" | "FAILED" | "EXITED" => InstanceStatus::Terminated,
            _ => InstanceStatus::Unknown,
        }
    }

    /// The wire form used in JSON responses (e.g. `"RUNNING"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Running => "RUNNING",
            InstanceStatus::Provisioning => "PROVISIONING",
            InstanceStatus::Stopping => "STOPPING",
            InstanceStatus::Terminated => "TERMINATED",
            InstanceStatus::NotFound => "NOT_FOUND",
            InstanceStatus::NotConfigured => "NOT_CONFIGURED",
            InstanceStatus::Unknown => "UNKNOWN",
            InstanceStatus::Error => "ERROR",
        }
    }
}
