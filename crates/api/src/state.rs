use std::sync::Arc;

use renderd_cloud::dispatch::JobDispatcher;
use renderd_cloud::lifecycle::LifecycleController;

use crate::config::ServerConfig;

/// Shared application state available to all axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The compute lifecycle controller.
    pub controller: Arc<LifecycleController>,
    /// The render job dispatcher.
    pub dispatcher: Arc<JobDispatcher>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
