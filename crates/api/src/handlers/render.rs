//! Handler for the `/render` endpoint.
//!
//! The request is validated at the HTTP edge so a malformed body is a
//! `400`, never a half-dispatched job. Everything after validation is
//! the dispatcher's protocol; this handler just blocks on it.

use axum::extract::State;
use axum::Json;
use renderd_cloud::dispatch::SubmitOutcome;
use renderd_core::job::RenderRequest;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /render -- run one render job end to end.
///
/// Blocks until the worker signals completion, so responses routinely
/// take minutes. Returns the job id and signed read URLs for the images.
pub async fn render(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> AppResult<Json<SubmitOutcome>> {
    if request.workflow.is_none() && request.prompt.is_none() {
        return Err(AppError::BadRequest(
            "Request must include a 'workflow' graph or a 'prompt'".to_string(),
        ));
    }
    if request.model_url.is_empty() {
        return Err(AppError::BadRequest(
            "Request must include a 'model_url'".to_string(),
        ));
    }

    Ok(Json(state.dispatcher.submit(&request).await?))
}
