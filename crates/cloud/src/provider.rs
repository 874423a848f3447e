//! The compute-provider seam.
//!
//! The lifecycle controller and job dispatcher never talk to a cloud API
//! directly; they drive a [`ComputeProvider`]. Transitions are
//! provider-driven: the controller only *requests* a start or stop and
//! later observes where the provider landed via [`get_status`].
//!
//! [`get_status`]: ComputeProvider::get_status

use async_trait::async_trait;
use renderd_core::error::CoreError;
use renderd_core::metadata::MetadataItem;
use renderd_core::status::InstanceStatus;

/// Observed state of the target instance at one point in time.
#[derive(Debug, Clone)]
pub struct InstanceSnapshot {
    /// Normalized status.
    pub status: InstanceStatus,
    /// External IP or proxy host, when running.
    pub external_ip: Option<String>,
    /// Full worker endpoint URL (e.g. the ComfyUI UI), when running.
    pub endpoint_url: Option<String>,
    /// Provider-native identifier, when one is configured.
    pub instance_id: Option<String>,
}

impl InstanceSnapshot {
    /// A snapshot carrying only a status.
    pub fn bare(status: InstanceStatus) -> Self {
        Self {
            status,
            external_ip: None,
            endpoint_url: None,
            instance_id: None,
        }
    }
}

/// A single named remote compute resource.
///
/// Implementations serialize nothing themselves; callers own idempotence
/// against the observed status. `get_status` must report a provider
/// "not found" as a normal [`InstanceStatus::NotFound`] snapshot rather
/// than an error; an instance that does not exist yet is an expected
/// state, not a fault.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Query the instance record. Side-effect-free.
    async fn get_status(&self) -> Result<InstanceSnapshot, CoreError>;

    /// Ask the provider to start the instance. Returns once the provider
    /// has accepted the operation, not once the instance has booted.
    async fn start(&self) -> Result<(), CoreError>;

    /// Ask the provider to stop the instance.
    async fn stop(&self) -> Result<(), CoreError>;

    /// Replace the full boot-configuration metadata set.
    ///
    /// Full-replace, not merge: callers pass the complete desired key
    /// set. A concurrent writer racing on the provider's optimistic
    /// token surfaces as [`CoreError::Conflict`].
    async fn push_metadata(&self, items: &[MetadataItem]) -> Result<(), CoreError>;

    /// Irreversibly destroy the instance, returning the identifier that
    /// was destroyed. Providers without this capability return
    /// [`CoreError::Unsupported`].
    async fn terminate(&self) -> Result<Option<String>, CoreError> {
        Err(CoreError::Unsupported("terminate"))
    }

    /// Human-readable service name for health reporting.
    fn service_name(&self) -> &'static str;
}
