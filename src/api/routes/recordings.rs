//! Saved recordings API routes.

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::recorder::{list_recordings, RecordingEntry};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct RecordingsQueryParams {
    /// Maximum number of entries (default 20)
    pub limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_recordings))
        .with_state(state)
}

/// GET /recordings - Saved recordings, newest first.
async fn get_recordings(
    State(state): State<AppState>,
    Query(params): Query<RecordingsQueryParams>,
) -> ApiResult<Json<Vec<RecordingEntry>>> {
    let entries = list_recordings(&state.recordings_dir, params.limit.unwrap_or(20))
        .map_err(ApiError::from)?;
    Ok(Json(entries))
}
