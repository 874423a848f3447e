//! Service configuration loaded from environment variables.
//!
//! All fields have defaults suitable for local development; production
//! overrides via environment. Malformed values fail fast at startup.

use std::time::Duration;

use renderd_core::location::StorageLocation;
use renderd_core::metadata::WorkerAccess;
use renderd_core::poll::PollPolicy;

/// Which compute provider backs the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// A pre-created Compute Engine VM.
    Gce,
    /// A hosted GPU pod service.
    Pod,
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8187`).
    pub port: u16,
    /// Allowed CORS origins, comma-separated in `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `1800`).
    ///
    /// Deliberately long: `/render` blocks for the full render, from
    /// tens of seconds to many minutes.
    pub request_timeout_secs: u64,
}

/// Compute Engine adapter settings.
#[derive(Debug, Clone)]
pub struct GceSettings {
    pub project: String,
    pub instance: String,
    pub zone: String,
    pub api_base: String,
    pub access_token: String,
}

/// Pod-service adapter settings.
#[derive(Debug, Clone)]
pub struct PodSettings {
    pub api_base: String,
    pub api_key: String,
    pub pod_id: Option<String>,
    pub template_id: Option<String>,
    pub gpu_type: String,
    pub disk_size_gb: u32,
    pub volume_id: Option<String>,
    pub pod_name: String,
    pub proxy_domain: String,
    pub custom_domain: Option<String>,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderKind,
    pub gce: GceSettings,
    pub pod: PodSettings,
    /// Where job documents are persisted.
    pub job_location: StorageLocation,
    /// Where the worker uploads artifacts and the completion marker.
    pub out_location: StorageLocation,
    /// Endpoint override for S3-compatible object storage.
    pub s3_endpoint: Option<String>,
    /// Public URL of the instance boot script.
    pub startup_script_url: String,
    /// Worker access-control and credential settings.
    pub worker_access: WorkerAccess,
    /// Idle threshold for the activity clock.
    pub inactivity_timeout: Duration,
    /// Completion-marker poll policy.
    pub completion_wait: PollPolicy,
    /// Lifetime of artifact read URLs.
    pub signed_url_expiry: Duration,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = env_or(name, default);
    raw.parse()
        .unwrap_or_else(|e| panic!("{name} must be valid: {e}"))
}

impl ServerConfig {
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `8187`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `1800`                  |
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", "8187"),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", "1800"),
        }
    }
}

impl AppConfig {
    /// Load the full configuration from the environment.
    ///
    /// Provider selection: `PROVIDER` is `gce` (default) or `pod`.
    /// Storage locations: `JOB_BUCKET` / `OUT_BUCKET` as `gs://` or
    /// `s3://` URIs.
    pub fn from_env() -> Self {
        let provider = match env_or("PROVIDER", "gce").to_lowercase().as_str() {
            "gce" => ProviderKind::Gce,
            "pod" => ProviderKind::Pod,
            other => panic!("PROVIDER must be 'gce' or 'pod', got '{other}'"),
        };

        let gce = GceSettings {
            project: env_or("GCP_PROJECT", ""),
            instance: env_or("GCE_INSTANCE", "gpu-sd-worker"),
            zone: env_or("GCE_ZONE", "us-central1-c"),
            api_base: env_or("GCE_API_BASE", renderd_cloud::gce::DEFAULT_API_BASE),
            access_token: env_or("GCP_ACCESS_TOKEN", ""),
        };

        let pod = PodSettings {
            api_base: env_or("POD_API_BASE", "https://rest.runpod.io/v1"),
            api_key: env_or("POD_API_KEY", ""),
            pod_id: env_opt("POD_ID"),
            template_id: env_opt("POD_TEMPLATE_ID"),
            gpu_type: env_or("POD_GPU_TYPE", "NVIDIA L40S"),
            disk_size_gb: env_parse("POD_DISK_SIZE_GB", "100"),
            volume_id: env_opt("POD_VOLUME_ID"),
            pod_name: env_or("POD_NAME", "comfyui"),
            proxy_domain: env_or("PROXY_DOMAIN", "runpod.net"),
            custom_domain: env_opt("COMFYUI_DOMAIN"),
        };

        let job_location: StorageLocation = env_or("JOB_BUCKET", "gs://sd-jobs")
            .parse()
            .unwrap_or_else(|e| panic!("JOB_BUCKET must be a valid location: {e}"));
        let out_location: StorageLocation = env_or("OUT_BUCKET", "gs://sd-outputs")
            .parse()
            .unwrap_or_else(|e| panic!("OUT_BUCKET must be a valid location: {e}"));

        let worker_access = WorkerAccess {
            allowed_ip: env_opt("ALLOWED_IP"),
            auth_user: Some(env_or("COMFYUI_AUTH_USER", "admin")),
            auth_pass: env_opt("COMFYUI_AUTH_PASS"),
        };

        let completion_wait = PollPolicy::new(
            Duration::from_secs(env_parse("COMPLETION_POLL_SECS", "5")),
            env_opt("COMPLETION_MAX_ATTEMPTS").map(|v| {
                v.parse()
                    .unwrap_or_else(|e| panic!("COMPLETION_MAX_ATTEMPTS must be a u32: {e}"))
            }),
        );

        Self {
            server: ServerConfig::from_env(),
            provider,
            gce,
            pod,
            job_location,
            out_location,
            s3_endpoint: env_opt("S3_ENDPOINT"),
            startup_script_url: env_or("STARTUP_SCRIPT_URL", ""),
            worker_access,
            inactivity_timeout: Duration::from_secs(env_parse("INACTIVITY_TIMEOUT_SECS", "1800")),
            completion_wait,
            signed_url_expiry: Duration::from_secs(
                env_parse::<u64>("SIGNED_URL_EXPIRY_MINUTES", "20") * 60,
            ),
        }
    }
}
