use thiserror::Error;

pub use crate::audio::CaptureError;

/// Failures writing a finished recording to disk.
#[derive(Error, Debug)]
pub enum FlushError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Encode(#[from] hound::Error),

    #[error("Flush task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A recording is already in progress")]
    AlreadyActive,

    #[error("No recording in progress")]
    NotActive,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Recording could not be saved: {0}")]
    Flush(#[from] FlushError),
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recorder controller is not running")]
    Unavailable,
}

impl ControlError {
    pub fn is_not_active(&self) -> bool {
        matches!(self, ControlError::Session(SessionError::NotActive))
    }
}
