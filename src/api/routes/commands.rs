//! Chat command endpoint (POST /commands).

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::channel::ChannelId;
use crate::commands::{self, Command, CommandReply};
use crate::recorder::Requester;
use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;

/// A chat message that may contain a command.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub text: String,
    pub requester: Requester,
    /// Text channel the reply is posted to.
    pub reply_to: ChannelId,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/commands", post(run_command))
        .with_state(state)
}

async fn run_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> ApiResult<Json<CommandReply>> {
    let command = Command::parse(&state.command_prefix, &request.text)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown command: {}", request.text)))?;

    let reply = commands::dispatch(
        &state.controller,
        state.notifier.as_ref(),
        command,
        request.requester,
        &request.reply_to,
    )
    .await;
    Ok(Json(reply))
}
