//! Boot-configuration metadata.
//!
//! Instance metadata is the only channel for telling a cold-starting
//! worker what to do. Writes are full-replacement: every push must carry
//! the complete desired key set, so the builders here assemble the whole
//! set rather than individual items.

use serde::{Deserialize, Serialize};

/// Key for the public URL of the boot script the instance runs on start.
pub const KEY_STARTUP_SCRIPT_URL: &str = "startup-script-url";
/// Key pointing the worker at its persisted job document.
pub const KEY_JOB_WORKFLOW: &str = "job_workflow";
/// Key naming the model the worker must fetch before rendering.
pub const KEY_MODEL_URI: &str = "model_uri";
/// Key naming the job-scoped output location for artifacts.
pub const KEY_OUTPUT_BUCKET: &str = "output_bucket";
/// Key restricting which client IP may reach the worker UI.
pub const KEY_ALLOWED_IP: &str = "allowed_ip";
/// Key carrying the worker endpoint's basic-auth user.
pub const KEY_AUTH_USER: &str = "auth_user";
/// Key carrying the worker endpoint's basic-auth password.
pub const KEY_AUTH_PASS: &str = "auth_pass";

/// One metadata key/value pair, in the provider wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Access-control and credential settings pushed on every start.
#[derive(Debug, Clone, Default)]
pub struct WorkerAccess {
    /// Client IP allowed to reach the worker UI, if restricted.
    pub allowed_ip: Option<String>,
    /// Basic-auth user for the worker endpoint.
    pub auth_user: Option<String>,
    /// Basic-auth password for the worker endpoint.
    pub auth_pass: Option<String>,
}

impl WorkerAccess {
    fn append_to(&self, items: &mut Vec<MetadataItem>) {
        if let Some(ip) = &self.allowed_ip {
            items.push(MetadataItem::new(KEY_ALLOWED_IP, ip));
        }
        if let Some(user) = &self.auth_user {
            items.push(MetadataItem::new(KEY_AUTH_USER, user));
        }
        if let Some(pass) = &self.auth_pass {
            items.push(MetadataItem::new(KEY_AUTH_PASS, pass));
        }
    }
}

/// Complete metadata set for a manual lifecycle start (no job attached).
pub fn boot_items(startup_script_url: &str, access: &WorkerAccess) -> Vec<MetadataItem> {
    let mut items = vec![MetadataItem::new(KEY_STARTUP_SCRIPT_URL, startup_script_url)];
    access.append_to(&mut items);
    items
}

/// Complete metadata set for a job hand-off.
///
/// `job_uri` points at the persisted job document, `output_uri` at the
/// job-scoped output prefix (job-id-scoped to avoid artifact collisions
/// between jobs).
pub fn job_items(
    startup_script_url: &str,
    job_uri: &str,
    model_uri: &str,
    output_uri: &str,
) -> Vec<MetadataItem> {
    vec![
        MetadataItem::new(KEY_STARTUP_SCRIPT_URL, startup_script_url),
        MetadataItem::new(KEY_JOB_WORKFLOW, job_uri),
        MetadataItem::new(KEY_MODEL_URI, model_uri),
        MetadataItem::new(KEY_OUTPUT_BUCKET, output_uri),
    ]
}
