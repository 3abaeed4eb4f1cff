//! Presence-triggered recording.
//!
//! Membership changes feed the controller, which asks the monitor whether a
//! channel crossed the quorum and drives the single recording session
//! accordingly: start → capture → stop → write WAV.

pub mod controller;
pub mod error;
pub mod monitor;
pub mod notices;
pub mod session;
pub mod status;
pub mod writer;

#[cfg(test)]
mod scenarios;
#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    Applied, ControlRequest, ControllerHandle, Intent, RecorderController, Requester,
};
pub use error::{CaptureError, ControlError, FlushError, SessionError};
pub use monitor::{MembershipMonitor, QuorumDecision};
pub use session::{
    RecordingSession, SessionCapture, SessionEvent, SessionId, SessionOptions, StopReason,
    StopReport,
};
pub use status::{RecorderPhase, RecorderStatus, RecorderStatusHandle};
pub use writer::{list_recordings, FileWriter, RecordingEntry};
