//! Chat commands: `stop` and `forcestop`.
//!
//! Commands are parsed from message text with the configured prefix, applied
//! through the controller, and answered in the channel they came from.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::channel::{notify, ChannelId, NotificationSink, DEFAULT_TIMEOUT};
use crate::recorder::{
    notices, Applied, ControlError, ControllerHandle, Intent, Requester, SessionError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Stop the recording; the caller must be in the recorded channel.
    Stop,
    /// Stop the recording from anywhere; administrators only.
    ForceStop,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Stop => "stop",
            Command::ForceStop => "forcestop",
        }
    }

    /// Parse `{prefix}{name}`; anything after the name is ignored.
    pub fn parse(prefix: &str, text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix(prefix)?;
        let name = rest.split_whitespace().next()?;
        match name.to_ascii_lowercase().as_str() {
            "stop" => Some(Command::Stop),
            "forcestop" | "force-stop" => Some(Command::ForceStop),
            _ => None,
        }
    }

    fn into_intent(self, requester: Requester) -> Intent {
        match self {
            Command::Stop => Intent::ManualStop(requester),
            Command::ForceStop => Intent::ForceStop(requester),
        }
    }

    fn success_reply(&self) -> &'static str {
        match self {
            Command::Stop => notices::STOPPED_BY_COMMAND,
            Command::ForceStop => notices::FORCE_STOPPED,
        }
    }
}

/// Result of a command as shown to the requester.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReply {
    pub command: Command,
    /// Whether the recording was stopped.
    pub accepted: bool,
    pub message: String,
}

/// Apply a command and post the reply to `reply_to`.
pub async fn dispatch(
    controller: &ControllerHandle,
    notifier: &dyn NotificationSink,
    command: Command,
    requester: Requester,
    reply_to: &ChannelId,
) -> CommandReply {
    info!("Command {} from {}", command.name(), requester.user_id);
    let result = controller.submit(command.into_intent(requester)).await;
    let reply = reply_for(command, result);
    notify(notifier, reply_to, &reply.message, DEFAULT_TIMEOUT).await;
    reply
}

fn reply_for(command: Command, result: Result<Applied, ControlError>) -> CommandReply {
    let (accepted, message) = match result {
        Ok(Applied::Stopped(_)) => (true, command.success_reply().to_string()),
        // The session was torn down; the save failure is announced separately.
        Err(ControlError::Session(SessionError::Flush(_))) => {
            (true, command.success_reply().to_string())
        }
        Ok(Applied::Started(_)) | Ok(Applied::Ignored) => {
            (false, notices::NOT_RECORDING.to_string())
        }
        Err(ControlError::Session(SessionError::NotActive)) => {
            (false, notices::NOT_RECORDING.to_string())
        }
        Err(ControlError::PermissionDenied(message)) => (false, message),
        Err(e) => {
            warn!("Command {} failed: {}", command.name(), e);
            (false, format!("Could not {}: {}", command.name(), e))
        }
    };

    CommandReply {
        command,
        accepted,
        message,
    }
}
