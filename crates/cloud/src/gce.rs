//! Compute Engine adapter.
//!
//! Drives the Compute Engine v1 REST surface for a single pre-created
//! instance: status queries, start/stop, and fingerprint-guarded
//! full-replace metadata writes. Mutating calls return a zone operation
//! which is polled to completion before the call reports success.
//!
//! Credential acquisition is out of scope; the adapter is handed a
//! bearer token by its caller. The API base URL is configurable so tests
//! can point the adapter at a local stub.

use async_trait::async_trait;
use renderd_core::error::CoreError;
use renderd_core::metadata::MetadataItem;
use renderd_core::poll::PollPolicy;
use renderd_core::status::InstanceStatus;
use serde_json::{json, Value};

use crate::provider::{ComputeProvider, InstanceSnapshot};

/// Default Compute Engine API base.
pub const DEFAULT_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// Settings for the GCE adapter.
#[derive(Debug, Clone)]
pub struct GceConfig {
    /// API base URL (override in tests).
    pub api_base: String,
    /// Cloud project identifier.
    pub project: String,
    /// Zone the instance lives in.
    pub zone: String,
    /// Name of the pre-created GPU instance.
    pub instance: String,
    /// OAuth bearer token for the Compute API.
    pub access_token: String,
}

/// ComputeProvider over the Compute Engine REST API.
pub struct GceProvider {
    http: reqwest::Client,
    config: GceConfig,
    operation_wait: PollPolicy,
}

impl GceProvider {
    pub fn new(http: reqwest::Client, config: GceConfig) -> Self {
        Self::with_operation_wait(http, config, PollPolicy::operation_wait())
    }

    /// Override the operation-completion poll policy (tests).
    pub fn with_operation_wait(
        http: reqwest::Client,
        config: GceConfig,
        operation_wait: PollPolicy,
    ) -> Self {
        Self {
            http,
            config,
            operation_wait,
        }
    }

    fn instance_url(&self, suffix: &str) -> String {
        let GceConfig {
            api_base,
            project,
            zone,
            instance,
            ..
        } = &self.config;
        format!("{api_base}/projects/{project}/zones/{zone}/instances/{instance}{suffix}")
    }

    fn operation_url(&self, name: &str) -> String {
        let GceConfig {
            api_base,
            project,
            zone,
            ..
        } = &self.config;
        format!("{api_base}/projects/{project}/zones/{zone}/operations/{name}")
    }

    async fn get_instance(&self) -> Result<Option<Value>, CoreError> {
        let response = self
            .http
            .get(self.instance_url(""))
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Compute API request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_json(response).await?;
        Ok(Some(body))
    }

    /// POST to an instance sub-resource and wait for the zone operation.
    async fn mutate(&self, suffix: &str, body: Option<Value>) -> Result<(), CoreError> {
        let mut request = self
            .http
            .post(self.instance_url(suffix))
            .bearer_auth(&self.config.access_token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Compute API request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::NotFound("Instance".to_string()));
        }
        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(CoreError::Conflict(
                "Metadata fingerprint is stale; re-read and retry".to_string(),
            ));
        }

        let operation = read_json(response).await?;
        self.wait_for_operation(&operation).await
    }

    /// Poll a zone operation until it reports `DONE`.
    ///
    /// A `DONE` operation with an embedded `error` fails the call with
    /// that error.
    async fn wait_for_operation(&self, operation: &Value) -> Result<(), CoreError> {
        let name = operation["name"].as_str().ok_or_else(|| {
            CoreError::Provider("Compute API operation carried no name".to_string())
        })?;

        let mut attempts = 0u32;
        loop {
            let response = self
                .http
                .get(self.operation_url(name))
                .bearer_auth(&self.config.access_token)
                .send()
                .await
                .map_err(|e| CoreError::Provider(format!("Operation poll failed: {e}")))?;
            let result = read_json(response).await?;

            if result["status"].as_str() == Some("DONE") {
                if let Some(error) = result.get("error") {
                    if !error.is_null() {
                        return Err(CoreError::from_provider_message(classify_operation_error(
                            error,
                        )));
                    }
                }
                return Ok(());
            }

            attempts += 1;
            if !self.operation_wait.allows_attempt(attempts) {
                return Err(CoreError::DeadlineExceeded(format!("operation {name}")));
            }
            tokio::time::sleep(self.operation_wait.interval).await;
        }
    }
}

#[async_trait]
impl ComputeProvider for GceProvider {
    async fn get_status(&self) -> Result<InstanceSnapshot, CoreError> {
        let Some(instance) = self.get_instance().await? else {
            return Ok(InstanceSnapshot::bare(InstanceStatus::NotFound));
        };

        let raw = instance["status"].as_str().unwrap_or("UNKNOWN");
        let status = InstanceStatus::from_gce(raw);
        let external_ip = if status == InstanceStatus::Running {
            extract_nat_ip(&instance)
        } else {
            None
        };
        let endpoint_url = external_ip.as_ref().map(|ip| format!("http://{ip}:8188"));

        Ok(InstanceSnapshot {
            status,
            external_ip,
            endpoint_url,
            instance_id: Some(self.config.instance.clone()),
        })
    }

    async fn start(&self) -> Result<(), CoreError> {
        // Start takes an empty request body.
        self.mutate("/start", None).await
    }

    async fn stop(&self) -> Result<(), CoreError> {
        self.mutate("/stop", None).await
    }

    async fn push_metadata(&self, items: &[MetadataItem]) -> Result<(), CoreError> {
        // Read the current record to obtain the optimistic-concurrency
        // fingerprint; the write below fails with Conflict if another
        // writer lands in between.
        let instance = self
            .get_instance()
            .await?
            .ok_or_else(|| CoreError::NotFound("Instance".to_string()))?;
        let fingerprint = instance["metadata"]["fingerprint"]
            .as_str()
            .ok_or_else(|| {
                CoreError::Provider("Instance record carried no metadata fingerprint".to_string())
            })?;

        let body = json!({
            "fingerprint": fingerprint,
            "items": items,
        });
        self.mutate("/setMetadata", Some(body)).await
    }

    fn service_name(&self) -> &'static str {
        "ComfyUI Instance Manager"
    }
}

/// First external NAT IP from the instance's network interfaces.
fn extract_nat_ip(instance: &Value) -> Option<String> {
    instance["networkInterfaces"]
        .as_array()?
        .iter()
        .flat_map(|iface| {
            iface["accessConfigs"]
                .as_array()
                .into_iter()
                .flatten()
        })
        .find_map(|config| config["natIP"].as_str().map(str::to_string))
}

/// Flatten a zone-operation error block into one message.
fn classify_operation_error(error: &Value) -> String {
    let messages: Vec<&str> = error["errors"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|e| e["message"].as_str())
        .collect();
    if messages.is_empty() {
        error.to_string()
    } else {
        messages.join("; ")
    }
}

/// Parse a response body as JSON, surfacing API error messages.
async fn read_json(response: reqwest::Response) -> Result<Value, CoreError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| CoreError::Provider(format!("Compute API returned invalid JSON: {e}")))?;

    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Compute API returned {status}"));
        return Err(CoreError::from_provider_message(message));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_nat_ip() {
        let instance = json!({
            "networkInterfaces": [
                { "accessConfigs": [ {}, { "natIP": "34.1.2.3" } ] },
                { "accessConfigs": [ { "natIP": "34.9.9.9" } ] }
            ]
        });
        assert_eq!(extract_nat_ip(&instance).as_deref(), Some("34.1.2.3"));
    }

    #[test]
    fn nat_ip_absent_when_no_access_configs() {
        let instance = json!({ "networkInterfaces": [ {} ] });
        assert_eq!(extract_nat_ip(&instance), None);
    }

    #[test]
    fn operation_error_messages_are_joined() {
        let error = json!({
            "errors": [
                { "code": "QUOTA_EXCEEDED", "message": "Quota 'GPUS' exceeded" },
                { "message": "Limit: 1.0" }
            ]
        });
        assert_eq!(
            classify_operation_error(&error),
            "Quota 'GPUS' exceeded; Limit: 1.0"
        );
    }

    #[test]
    fn quota_operation_error_classifies_as_capacity() {
        let error = json!({ "errors": [ { "message": "Quota 'GPUS' exceeded" } ] });
        let err = CoreError::from_provider_message(classify_operation_error(&error));
        assert!(err.is_capacity());
    }
}
