use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Mount the render dispatch route.
pub fn router() -> Router<AppState> {
    Router::new().route("/render", post(handlers::render::render))
}
