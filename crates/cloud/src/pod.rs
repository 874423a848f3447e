//! Pod-service adapter.
//!
//! Drives a hosted GPU pod service (RunPod-style REST API) as the
//! compute provider. Unlike the GCE adapter the pod identity is mutable:
//! the adapter may start unconfigured, create a pod on demand from a
//! template, and permanently clear the stored identifier on terminate.

use async_trait::async_trait;
use renderd_core::error::CoreError;
use renderd_core::metadata::MetadataItem;
use renderd_core::status::InstanceStatus;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::provider::{ComputeProvider, InstanceSnapshot};

/// ComfyUI port exposed through the pod service proxy.
const COMFYUI_PORT: u16 = 8188;

/// Settings for the pod-service adapter.
#[derive(Debug, Clone)]
pub struct PodConfig {
    /// API base URL (override in tests).
    pub api_base: String,
    /// Provider API key.
    pub api_key: String,
    /// Identifier of an existing pod, if one is already provisioned.
    pub pod_id: Option<String>,
    /// Template to create a pod from when none is configured.
    pub template_id: Option<String>,
    /// GPU type requested on create.
    pub gpu_type: String,
    /// Container disk size on create, in GB.
    pub disk_size_gb: u32,
    /// Persistent volume to attach on create.
    pub volume_id: Option<String>,
    /// Name fragment used to find an existing pod as a last resort.
    pub pod_name: String,
    /// Proxy domain for synthesized endpoint URLs.
    pub proxy_domain: String,
    /// Custom domain that overrides the synthesized endpoint.
    pub custom_domain: Option<String>,
}

/// ComputeProvider over a pod-service REST API.
pub struct PodProvider {
    http: reqwest::Client,
    config: PodConfig,
    pod_id: Mutex<Option<String>>,
    /// Boot items held for the next pod create; the pod service has no
    /// per-boot metadata channel, so these become container env.
    pending_env: Mutex<Vec<MetadataItem>>,
}

impl PodProvider {
    pub fn new(http: reqwest::Client, config: PodConfig) -> Self {
        let pod_id = Mutex::new(config.pod_id.clone());
        Self {
            http,
            config,
            pod_id,
            pending_env: Mutex::new(Vec::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    async fn fetch_pod(&self, pod_id: &str) -> Result<Option<Value>, CoreError> {
        let response = self
            .http
            .get(self.url(&format!("/pods/{pod_id}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Pod API request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_json(response).await?;
        if body.is_null() {
            return Ok(None);
        }
        Ok(Some(body))
    }

    /// Resolve the target pod id, creating or discovering one if needed.
    ///
    /// Order: the configured/stored id if the pod still exists; a fresh
    /// pod from the template; an existing pod whose name contains the
    /// configured fragment.
    async fn resolve_or_create(&self) -> Result<String, CoreError> {
        let stored = self.pod_id.lock().await.clone();
        if let Some(id) = stored {
            if self.fetch_pod(&id).await?.is_some() {
                return Ok(id);
            }
            tracing::warn!(pod_id = %id, "Stored pod reference is stale");
        }

        if let Some(template_id) = &self.config.template_id {
            let id = self.create_pod(template_id).await?;
            *self.pod_id.lock().await = Some(id.clone());
            return Ok(id);
        }

        // Last resort: adopt an existing pod by name.
        let response = self
            .http
            .get(self.url("/pods"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Pod API request failed: {e}")))?;
        let pods = read_json(response).await?;
        let fragment = self.config.pod_name.to_lowercase();
        let found = pods
            .as_array()
            .into_iter()
            .flatten()
            .find(|pod| {
                pod["name"]
                    .as_str()
                    .is_some_and(|name| name.to_lowercase().contains(&fragment))
            })
            .and_then(|pod| pod["id"].as_str().map(str::to_string));

        match found {
            Some(id) => {
                tracing::info!(pod_id = %id, "Adopted existing pod by name");
                *self.pod_id.lock().await = Some(id.clone());
                Ok(id)
            }
            None => Err(CoreError::NotConfigured(
                "pod (no pod found and no template to create one)".to_string(),
            )),
        }
    }

    async fn create_pod(&self, template_id: &str) -> Result<String, CoreError> {
        let env: Vec<MetadataItem> = self.pending_env.lock().await.clone();
        let body = json!({
            "name": self.config.pod_name,
            "template_id": template_id,
            "gpu_type_id": self.config.gpu_type,
            "cloud_type": "SECURE",
            "container_disk_in_gb": self.config.disk_size_gb,
            "volume_id": self.config.volume_id,
            "env": env,
        });

        tracing::info!(template_id, gpu_type = %self.config.gpu_type, "Creating pod");
        let response = self
            .http
            .post(self.url("/pods"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Pod API request failed: {e}")))?;
        let pod = read_json(response).await?;

        let id = pod["id"]
            .as_str()
            .ok_or_else(|| CoreError::Provider("Pod create returned no id".to_string()))?
            .to_string();
        tracing::info!(pod_id = %id, "Created pod");
        Ok(id)
    }

    /// Worker endpoint for a running pod.
    ///
    /// The pod service fronts workloads with a per-pod proxy host; a
    /// configured custom domain overrides it, and a direct pod IP is the
    /// final fallback.
    fn endpoint_for(&self, pod_id: &str, pod: &Value) -> (Option<String>, Option<String>) {
        if let Some(domain) = &self.config.custom_domain {
            return (
                Some(format!("{pod_id}.proxy.{}", self.config.proxy_domain)),
                Some(format!("https://{domain}")),
            );
        }
        if !self.config.proxy_domain.is_empty() {
            let host = format!("{pod_id}.proxy.{}", self.config.proxy_domain);
            let url = format!(
                "https://{pod_id}-{COMFYUI_PORT}.proxy.{}",
                self.config.proxy_domain
            );
            return (Some(host), Some(url));
        }
        match pod["ip"].as_str() {
            Some(ip) => (
                Some(ip.to_string()),
                Some(format!("http://{ip}:{COMFYUI_PORT}")),
            ),
            None => (None, None),
        }
    }
}

#[async_trait]
impl ComputeProvider for PodProvider {
    async fn get_status(&self) -> Result<InstanceSnapshot, CoreError> {
        let Some(pod_id) = self.pod_id.lock().await.clone() else {
            return Ok(InstanceSnapshot::bare(InstanceStatus::NotConfigured));
        };

        let Some(pod) = self.fetch_pod(&pod_id).await? else {
            return Ok(InstanceSnapshot {
                status: InstanceStatus::NotFound,
                external_ip: None,
                endpoint_url: None,
                instance_id: Some(pod_id),
            });
        };

        let raw = pod["desiredStatus"].as_str().unwrap_or("UNKNOWN");
        let status = InstanceStatus::from_pod(raw);
        let (external_ip, endpoint_url) = if status == InstanceStatus::Running {
            self.endpoint_for(&pod_id, &pod)
        } else {
            (None, None)
        };

        Ok(InstanceSnapshot {
            status,
            external_ip,
            endpoint_url,
            instance_id: Some(pod_id),
        })
    }

    async fn start(&self) -> Result<(), CoreError> {
        let pod_id = self.resolve_or_create().await?;

        tracing::info!(pod_id = %pod_id, "Resuming pod");
        let response = self
            .http
            .post(self.url(&format!("/pods/{pod_id}/resume")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Pod API request failed: {e}")))?;
        read_json(response).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), CoreError> {
        let Some(pod_id) = self.pod_id.lock().await.clone() else {
            // Nothing to stop.
            return Ok(());
        };

        tracing::info!(pod_id = %pod_id, "Stopping pod");
        let response = self
            .http
            .post(self.url(&format!("/pods/{pod_id}/stop")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Pod API request failed: {e}")))?;
        read_json(response).await?;
        Ok(())
    }

    async fn push_metadata(&self, items: &[MetadataItem]) -> Result<(), CoreError> {
        // No per-boot metadata channel on the pod service; hold the items
        // and apply them as container env on the next create.
        *self.pending_env.lock().await = items.to_vec();
        Ok(())
    }

    async fn terminate(&self) -> Result<Option<String>, CoreError> {
        let mut stored = self.pod_id.lock().await;
        let Some(pod_id) = stored.clone() else {
            // Already gone; double-invocation is a no-op.
            return Ok(None);
        };

        tracing::info!(pod_id = %pod_id, "Terminating pod");
        let response = self
            .http
            .delete(self.url(&format!("/pods/{pod_id}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("Pod API request failed: {e}")))?;
        read_json(response).await?;

        // The identity is gone for good.
        *stored = None;
        Ok(Some(pod_id))
    }

    fn service_name(&self) -> &'static str {
        "ComfyUI Pod Manager"
    }
}

/// Parse a response body as JSON, surfacing API error messages.
async fn read_json(response: reqwest::Response) -> Result<Value, CoreError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| CoreError::Provider(format!("Pod API returned invalid JSON: {e}")))?;

    if !status.is_success() {
        let message = body["error"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Pod API returned {status}"));
        return Err(CoreError::from_provider_message(message));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(proxy_domain: &str, custom_domain: Option<&str>) -> PodProvider {
        PodProvider::new(
            reqwest::Client::new(),
            PodConfig {
                api_base: "http://localhost:0".to_string(),
                api_key: "k".to_string(),
                pod_id: None,
                template_id: None,
                gpu_type: "NVIDIA L40S".to_string(),
                disk_size_gb: 100,
                volume_id: None,
                pod_name: "comfyui".to_string(),
                proxy_domain: proxy_domain.to_string(),
                custom_domain: custom_domain.map(str::to_string),
            },
        )
    }

    #[test]
    fn endpoint_synthesized_from_proxy_domain() {
        let p = provider("runpod.net", None);
        let (host, url) = p.endpoint_for("abc123", &json!({}));
        assert_eq!(host.as_deref(), Some("abc123.proxy.runpod.net"));
        assert_eq!(url.as_deref(), Some("https://abc123-8188.proxy.runpod.net"));
    }

    #[test]
    fn custom_domain_overrides_proxy_url() {
        let p = provider("runpod.net", Some("render.example.com"));
        let (_, url) = p.endpoint_for("abc123", &json!({}));
        assert_eq!(url.as_deref(), Some("https://render.example.com"));
    }

    #[test]
    fn direct_ip_is_the_final_fallback() {
        let p = provider("", None);
        let (host, url) = p.endpoint_for("abc123", &json!({ "ip": "10.1.2.3" }));
        assert_eq!(host.as_deref(), Some("10.1.2.3"));
        assert_eq!(url.as_deref(), Some("http://10.1.2.3:8188"));

        let (host, url) = p.endpoint_for("abc123", &json!({}));
        assert_eq!(host, None);
        assert_eq!(url, None);
    }
}
