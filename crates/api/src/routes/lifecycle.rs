use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Mount the lifecycle routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::lifecycle::health))
        .route("/status", get(handlers::lifecycle::status))
        .route("/start", post(handlers::lifecycle::start))
        .route("/stop", post(handlers::lifecycle::stop))
        .route("/keep-alive", post(handlers::lifecycle::keep_alive))
        .route("/activity", get(handlers::lifecycle::activity))
        .route("/terminate", post(handlers::lifecycle::terminate))
}
