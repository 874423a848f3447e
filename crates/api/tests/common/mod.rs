//! Shared test harness for the API integration tests.
//!
//! Builds the production router via `build_app_router` so every test
//! exercises the same middleware stack (CORS, request ID, timeout,
//! tracing, panic recovery) that `main.rs` uses, with a scripted
//! compute provider and an in-memory object store behind it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use renderd_api::config::ServerConfig;
use renderd_api::router::build_app_router;
use renderd_api::state::AppState;
use renderd_cloud::dispatch::{DispatchConfig, JobDispatcher};
use renderd_cloud::lifecycle::{BootConfig, LifecycleController};
use renderd_cloud::memory::MemoryStore;
use renderd_cloud::provider::{ComputeProvider, InstanceSnapshot};
use renderd_core::activity::ActivityClock;
use renderd_core::error::CoreError;
use renderd_core::location::StorageLocation;
use renderd_core::metadata::MetadataItem;
use renderd_core::poll::PollPolicy;
use renderd_core::status::InstanceStatus;

/// Scripted compute provider for API tests.
///
/// Pops one status per `get_status` call (repeating the last when the
/// script runs dry), records every call, and can be armed to fail
/// specific operations.
pub struct MockProvider {
    statuses: Mutex<VecDeque<InstanceStatus>>,
    last_status: Mutex<InstanceStatus>,
    calls: Mutex<Vec<String>>,
    /// When set, `get_status` fails with a provider error.
    pub status_fails: AtomicBool,
    /// When set, `start` fails with a capacity error.
    pub start_hits_capacity: AtomicBool,
    /// Whether the provider supports `terminate`.
    pub supports_terminate: bool,
    terminate_results: Mutex<VecDeque<Option<String>>>,
}

impl MockProvider {
    pub fn with_statuses(statuses: &[InstanceStatus]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            last_status: Mutex::new(InstanceStatus::Running),
            calls: Mutex::new(Vec::new()),
            status_fails: AtomicBool::new(false),
            start_hits_capacity: AtomicBool::new(false),
            supports_terminate: false,
            terminate_results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn running() -> Self {
        Self::with_statuses(&[InstanceStatus::Running])
    }

    pub fn push_terminate_result(&self, result: Option<String>) {
        self.terminate_results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

#[async_trait]
impl ComputeProvider for MockProvider {
    async fn get_status(&self) -> Result<InstanceSnapshot, CoreError> {
        self.calls.lock().unwrap().push("get_status".to_string());
        if self.status_fails.load(Ordering::SeqCst) {
            return Err(CoreError::Provider("compute API returned 500".to_string()));
        }
        let status = match self.statuses.lock().unwrap().pop_front() {
            Some(status) => {
                *self.last_status.lock().unwrap() = status;
                status
            }
            None => *self.last_status.lock().unwrap(),
        };
        Ok(InstanceSnapshot {
            status,
            external_ip: Some("203.0.113.7".to_string()),
            endpoint_url: Some("http://203.0.113.7:8188".to_string()),
            instance_id: Some("pod-test".to_string()),
        })
    }

    async fn start(&self) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push("start".to_string());
        if self.start_hits_capacity.load(Ordering::SeqCst) {
            return Err(CoreError::from_provider_message(
                "There is insufficient capacity in the zone",
            ));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push("stop".to_string());
        Ok(())
    }

    async fn push_metadata(&self, _items: &[MetadataItem]) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push("push_metadata".to_string());
        Ok(())
    }

    async fn terminate(&self) -> Result<Option<String>, CoreError> {
        self.calls.lock().unwrap().push("terminate".to_string());
        if !self.supports_terminate {
            return Err(CoreError::Unsupported("terminate"));
        }
        Ok(self
            .terminate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(None))
    }

    fn service_name(&self) -> &'static str {
        "Test Manager"
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

pub fn jobs_location() -> StorageLocation {
    StorageLocation::new("gs", "test-jobs", "")
}

pub fn outputs_location() -> StorageLocation {
    StorageLocation::new("gs", "test-outputs", "")
}

/// The wired-up application plus handles to its fakes.
pub struct TestApp {
    pub app: Router,
    pub provider: Arc<MockProvider>,
    pub store: Arc<MemoryStore>,
    pub controller: Arc<LifecycleController>,
}

/// Wire the full application around the given provider.
///
/// `completion_wait` controls how the dispatcher polls for the
/// completion marker; tests that never complete should pass a bounded
/// policy.
pub fn build_test_app(provider: Arc<MockProvider>, completion_wait: PollPolicy) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ActivityClock::new(Duration::from_secs(1800)));

    let controller = Arc::new(LifecycleController::new(
        provider.clone() as Arc<dyn ComputeProvider>,
        clock,
        BootConfig {
            startup_script_url: Some("https://storage.test/startup.sh".to_string()),
            access: Default::default(),
        },
    ));

    let dispatcher = Arc::new(JobDispatcher::new(
        provider.clone() as Arc<dyn ComputeProvider>,
        Arc::clone(&controller),
        store.clone() as Arc<dyn renderd_cloud::store::ObjectStore>,
        DispatchConfig {
            jobs: jobs_location(),
            outputs: outputs_location(),
            startup_script_url: "https://storage.test/startup.sh".to_string(),
            completion_wait,
            signed_url_expiry: Duration::from_secs(20 * 60),
        },
    ));

    let config = test_config();
    let state = AppState {
        controller: Arc::clone(&controller),
        dispatcher,
        config: Arc::new(config.clone()),
    };

    TestApp {
        app: build_app_router(state, &config),
        provider,
        store,
        controller,
    }
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a bodiless POST request against the app.
pub async fn post(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a JSON POST request against the app.
pub async fn post_json(app: Router, uri: &str, body: &serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Expect an error body and return its `(status, code, error)` triple.
pub async fn error_parts(response: Response<Body>) -> (StatusCode, String, String) {
    let status = response.status();
    let json = body_json(response).await;
    (
        status,
        json["code"].as_str().unwrap_or_default().to_string(),
        json["error"].as_str().unwrap_or_default().to_string(),
    )
}
