use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use renderd_api::config::{AppConfig, ProviderKind};
use renderd_api::router::build_app_router;
use renderd_api::state::AppState;
use renderd_cloud::dispatch::{DispatchConfig, JobDispatcher};
use renderd_cloud::gce::{GceConfig, GceProvider};
use renderd_cloud::lifecycle::{BootConfig, LifecycleController};
use renderd_cloud::pod::{PodConfig, PodProvider};
use renderd_cloud::provider::ComputeProvider;
use renderd_cloud::s3::S3Store;
use renderd_core::activity::ActivityClock;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "renderd_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env();
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        provider = ?config.provider,
        "Loaded configuration"
    );

    // --- Compute provider ---
    let http = reqwest::Client::new();
    let provider: Arc<dyn ComputeProvider> = match config.provider {
        ProviderKind::Gce => Arc::new(GceProvider::new(
            http,
            GceConfig {
                api_base: config.gce.api_base.clone(),
                project: config.gce.project.clone(),
                zone: config.gce.zone.clone(),
                instance: config.gce.instance.clone(),
                access_token: config.gce.access_token.clone(),
            },
        )),
        ProviderKind::Pod => Arc::new(PodProvider::new(
            http,
            PodConfig {
                api_base: config.pod.api_base.clone(),
                api_key: config.pod.api_key.clone(),
                pod_id: config.pod.pod_id.clone(),
                template_id: config.pod.template_id.clone(),
                gpu_type: config.pod.gpu_type.clone(),
                disk_size_gb: config.pod.disk_size_gb,
                volume_id: config.pod.volume_id.clone(),
                pod_name: config.pod.pod_name.clone(),
                proxy_domain: config.pod.proxy_domain.clone(),
                custom_domain: config.pod.custom_domain.clone(),
            },
        )),
    };
    tracing::info!(service = provider.service_name(), "Compute provider ready");

    // --- Object store ---
    let store = Arc::new(S3Store::from_env(config.s3_endpoint.as_deref()).await);
    tracing::info!(
        jobs = %config.job_location.uri(""),
        outputs = %config.out_location.uri(""),
        "Object store ready"
    );

    // --- Lifecycle controller ---
    let clock = Arc::new(ActivityClock::new(config.inactivity_timeout));
    let startup_script_url = (!config.startup_script_url.is_empty())
        .then(|| config.startup_script_url.clone());
    let controller = Arc::new(LifecycleController::new(
        Arc::clone(&provider),
        clock,
        BootConfig {
            startup_script_url,
            access: config.worker_access.clone(),
        },
    ));

    // --- Job dispatcher ---
    let dispatcher = Arc::new(JobDispatcher::new(
        Arc::clone(&provider),
        Arc::clone(&controller),
        store,
        DispatchConfig {
            jobs: config.job_location.clone(),
            outputs: config.out_location.clone(),
            startup_script_url: config.startup_script_url.clone(),
            completion_wait: config.completion_wait,
            signed_url_expiry: config.signed_url_expiry,
        },
    ));

    // --- App state & router ---
    let state = AppState {
        controller,
        dispatcher,
        config: Arc::new(config.server.clone()),
    };
    let app = build_app_router(state, &config.server);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.server.host.parse().expect("Invalid HOST address"),
        config.server.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
