//! The on-demand compute lifecycle controller.
//!
//! Owns the idempotence discipline around `start`/`stop`, the idle
//! activity clock, and the mapping from provider snapshots to the HTTP
//! status surface. Transitions themselves are provider-driven: this
//! controller requests them and reports where the provider landed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use renderd_core::activity::{ActivityClock, ActivityReport};
use renderd_core::error::CoreError;
use renderd_core::metadata::{boot_items, WorkerAccess};
use renderd_core::status::InstanceStatus;
use serde::Serialize;

use crate::provider::ComputeProvider;

/// Boot configuration pushed on a manual start.
#[derive(Debug, Clone, Default)]
pub struct BootConfig {
    /// Public URL of the startup script the instance runs on boot.
    pub startup_script_url: Option<String>,
    /// Worker access-control and credential settings.
    pub access: WorkerAccess,
}

/// Result shape shared by all lifecycle-changing operations.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
    pub status: Option<InstanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<String>,
}

impl OperationOutcome {
    fn ok(message: impl Into<String>, status: Option<InstanceStatus>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status,
            pod_id: None,
        }
    }

    fn with_pod_id(mut self, pod_id: Option<String>) -> Self {
        self.pod_id = pod_id;
        self
    }
}

/// Snapshot returned by the `/status` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: InstanceStatus,
    pub external_ip: Option<String>,
    pub comfyui_url: Option<String>,
    pub last_activity: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<String>,
}

/// Serializes lifecycle decisions against the observed instance state.
pub struct LifecycleController {
    provider: Arc<dyn ComputeProvider>,
    clock: Arc<ActivityClock>,
    boot: BootConfig,
}

impl LifecycleController {
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        clock: Arc<ActivityClock>,
        boot: BootConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            boot,
        }
    }

    pub fn clock(&self) -> &ActivityClock {
        &self.clock
    }

    pub fn service_name(&self) -> &'static str {
        self.provider.service_name()
    }

    /// Side-effect-free status query.
    ///
    /// A provider "not found" is a normal `NOT_FOUND` report, not an
    /// error; only transport/API faults surface as `Err`.
    pub async fn status(&self) -> Result<StatusReport, CoreError> {
        let snapshot = self.provider.get_status().await?;
        Ok(StatusReport {
            status: snapshot.status,
            external_ip: snapshot.external_ip,
            comfyui_url: snapshot.endpoint_url,
            last_activity: self.clock.last_activity(),
            pod_id: snapshot.instance_id,
        })
    }

    /// Start the instance, pushing boot metadata first.
    ///
    /// Idempotent against the observed state: an instance that is
    /// already running or already booting is reported as success without
    /// issuing a second provider start. Fire-and-forget once the
    /// provider accepts: reports `PROVISIONING` without waiting for the
    /// boot to finish.
    pub async fn start(&self) -> Result<OperationOutcome, CoreError> {
        self.clock.touch();

        let snapshot = self.provider.get_status().await?;
        match snapshot.status {
            InstanceStatus::Running => {
                return Ok(OperationOutcome::ok(
                    "Instance is already running",
                    Some(InstanceStatus::Running),
                )
                .with_pod_id(snapshot.instance_id));
            }
            InstanceStatus::Provisioning => {
                return Ok(OperationOutcome::ok(
                    "Instance is already starting",
                    Some(InstanceStatus::Provisioning),
                )
                .with_pod_id(snapshot.instance_id));
            }
            _ => {}
        }

        if let Some(url) = &self.boot.startup_script_url {
            self.provider
                .push_metadata(&boot_items(url, &self.boot.access))
                .await?;
        }

        self.provider.start().await?;
        tracing::info!(status = ?snapshot.status, "Instance start accepted");

        // Re-query so a just-created pod reports its fresh identifier;
        // a failed follow-up query must not fail the start.
        let pod_id = match self.provider.get_status().await {
            Ok(after) => after.instance_id,
            Err(_) => snapshot.instance_id,
        };

        Ok(
            OperationOutcome::ok("Instance started successfully", Some(InstanceStatus::Provisioning))
                .with_pod_id(pod_id),
        )
    }

    /// Idempotent start without a metadata push.
    ///
    /// The dispatcher uses this after writing job hand-off metadata; a
    /// boot-metadata push here would overwrite the job pointer.
    pub async fn ensure_started(&self) -> Result<(), CoreError> {
        self.clock.touch();

        let snapshot = self.provider.get_status().await?;
        match snapshot.status {
            InstanceStatus::Running | InstanceStatus::Provisioning => Ok(()),
            _ => self.provider.start().await,
        }
    }

    /// Stop the instance. No-op success when already stopped, stopping,
    /// or not configured at all.
    pub async fn stop(&self) -> Result<OperationOutcome, CoreError> {
        let snapshot = self.provider.get_status().await?;
        match snapshot.status {
            InstanceStatus::Terminated | InstanceStatus::Stopping => {
                return Ok(OperationOutcome::ok(
                    "Instance is already stopped or stopping",
                    Some(snapshot.status),
                )
                .with_pod_id(snapshot.instance_id));
            }
            InstanceStatus::NotConfigured => {
                return Ok(OperationOutcome::ok(
                    "No instance configured",
                    Some(InstanceStatus::Terminated),
                ));
            }
            _ => {}
        }

        self.provider.stop().await?;
        tracing::info!("Instance stop accepted");

        Ok(
            OperationOutcome::ok("Instance stopped successfully", Some(InstanceStatus::Stopping))
                .with_pod_id(snapshot.instance_id),
        )
    }

    /// Reset the inactivity timer. Never touches the instance.
    pub fn keep_alive(&self) -> OperationOutcome {
        self.clock.touch();
        OperationOutcome::ok("Activity timer reset", None)
    }

    /// Pure activity computation.
    pub fn activity(&self) -> ActivityReport {
        self.clock.report()
    }

    /// Permanently destroy the instance, where the provider supports it.
    ///
    /// After a successful terminate the identity is gone, so a repeated
    /// call observes "nothing configured" and no-ops.
    pub async fn terminate(&self) -> Result<OperationOutcome, CoreError> {
        match self.provider.terminate().await? {
            Some(pod_id) => {
                tracing::info!(pod_id = %pod_id, "Instance terminated");
                Ok(OperationOutcome::ok(
                    "Pod terminated successfully",
                    Some(InstanceStatus::Terminated),
                )
                .with_pod_id(Some(pod_id)))
            }
            None => Ok(OperationOutcome::ok(
                "No pod to terminate",
                Some(InstanceStatus::Terminated),
            )),
        }
    }
}
