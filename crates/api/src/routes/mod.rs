pub mod lifecycle;
pub mod render;

use axum::Router;

use crate::state::AppState;

/// Build the full route tree.
///
/// Route hierarchy (everything is root-level; the service has no
/// versioned prefix):
///
/// ```text
/// /                 health check (GET)
/// /status           instance status (GET)
/// /start            boot the instance (POST)
/// /stop             stop the instance (POST)
/// /keep-alive       reset the inactivity timer (POST)
/// /activity         idle-clock report (GET)
/// /terminate        destroy the instance (POST)
/// /render           run a render job, blocking (POST)
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(lifecycle::router())
        .merge(render::router())
}
