//! Logs API routes.

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::logs::{self, LogsOptions, LogsResult};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

/// Query parameters for logs.
#[derive(Debug, Deserialize, Default)]
pub struct LogsQueryParams {
    /// Number of log lines (default 30)
    pub lines: Option<usize>,
}

/// Create the logs router.
pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(get_logs)).with_state(state)
}

/// GET /logs - Get application logs.
async fn get_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsQueryParams>,
) -> ApiResult<Json<LogsResult>> {
    let options = LogsOptions::new(params.lines.unwrap_or(30));
    let result = logs::get_logs(&state.logging, &options).map_err(ApiError::from)?;
    Ok(Json(result))
}
