//! Recorder endpoints.
//!
//! Provides HTTP endpoints for:
//! - Reporting membership changes (POST /membership)
//! - Replacing the channel directory (POST /channels/sync)
//! - Getting recorder status (GET /status)

use crate::api::error::ApiResult;
use crate::api::AppState;
use crate::channel::{ChannelSnapshot, MembershipEvent};
use crate::recorder::RecorderPhase;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::debug;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(recorder_status))
        .route("/membership", post(membership))
        .route("/channels/sync", post(sync_channels))
        .with_state(state)
}

/// Queues a membership change. The response does not wait for the
/// resulting start or stop.
async fn membership(
    State(state): State<AppState>,
    Json(event): Json<MembershipEvent>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    debug!(
        "Membership change for {}: {:?} -> {:?}",
        event.member.user_id,
        event.before.as_ref().map(|c| c.id.as_str()),
        event.after.as_ref().map(|c| c.id.as_str())
    );
    state.controller.membership(event).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": true }))))
}

/// Replaces every known channel and re-evaluates them all.
async fn sync_channels(
    State(state): State<AppState>,
    Json(snapshots): Json<Vec<ChannelSnapshot>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let channels = snapshots.len();
    state.controller.sync_channels(snapshots).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "queued": true, "channels": channels })),
    ))
}

async fn recorder_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.status.get().await;

    Json(json!({
        "recording": status.phase == RecorderPhase::Recording,
        "phase": status.phase.as_str(),
        "channel": status.channel,
        "channel_name": status.channel_name,
        "started_at": status.started_at,
        "duration_seconds": status.duration_seconds(),
        "last_file": status.last_file,
        "last_error": status.last_error,
        "sessions_completed": status.sessions_completed,
    }))
}
