//! The single recording session of the process.
//!
//! A session joins the voice channel, opens the capture device and runs a
//! capture loop on the blocking pool until it is stopped. The loop owns the
//! device and the frame buffer while it runs and hands both back when it
//! exits, so the device is never released under a pending read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audio::{CaptureBackend, CaptureConfig, CaptureDevice, FrameBuffer, PcmFrame};
use crate::channel::{
    bounded, notify, ChannelId, ChannelSnapshot, NotificationSink, VoiceLink, DEFAULT_TIMEOUT,
};

use super::error::{CaptureError, FlushError, SessionError};
use super::notices;
use super::writer::FileWriter;

pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Manual,
    AutoQuorumLoss,
    ForcedByAdmin,
    Error,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoQuorumLoss => "auto_quorum_loss",
            Self::ForcedByAdmin => "forced_by_admin",
            Self::Error => "error",
        }
    }
}

/// Raised by the capture loop outside of any controller request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CaptureFailed {
        session: SessionId,
        error: CaptureError,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub capture: CaptureConfig,
    pub quorum_threshold: usize,
    /// Upper bound for each join, leave and notice sent to the gateway.
    pub gateway_timeout: Duration,
}

impl SessionOptions {
    pub fn new(capture: CaptureConfig, quorum_threshold: usize) -> Self {
        Self {
            capture,
            quorum_threshold,
            gateway_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct StopReport {
    pub session: SessionId,
    pub reason: StopReason,
    pub channel: ChannelId,
    pub channel_name: String,
    /// `None` when nothing was captured.
    pub file: Option<PathBuf>,
    pub frames: usize,
    pub duration: chrono::Duration,
}

/// Device and buffer owned by the capture loop.
pub struct SessionCapture {
    device: Box<dyn CaptureDevice>,
    buffer: FrameBuffer,
}

impl SessionCapture {
    fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            buffer: FrameBuffer::new(),
        }
    }

    /// Blocking read of the next chunk.
    pub fn capture_step(&mut self) -> Result<PcmFrame, CaptureError> {
        self.device.read_chunk()
    }

    pub fn append_frame(&mut self, frame: PcmFrame) {
        self.buffer.push(frame);
    }

    fn run(mut self, cancel: &CancellationToken) -> CaptureOutcome {
        while !cancel.is_cancelled() {
            match self.capture_step() {
                Ok(frame) => self.append_frame(frame),
                Err(error) => {
                    return CaptureOutcome {
                        capture: self,
                        error: Some(error),
                    }
                }
            }
        }
        CaptureOutcome {
            capture: self,
            error: None,
        }
    }
}

struct CaptureOutcome {
    capture: SessionCapture,
    error: Option<CaptureError>,
}

struct ActiveSession {
    id: SessionId,
    channel: ChannelId,
    channel_name: String,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    capture: JoinHandle<CaptureOutcome>,
}

pub struct RecordingSession {
    backend: Arc<dyn CaptureBackend>,
    voice: Arc<dyn VoiceLink>,
    notifier: Arc<dyn NotificationSink>,
    writer: FileWriter,
    options: SessionOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
    active: Option<ActiveSession>,
    next_id: SessionId,
}

impl RecordingSession {
    /// Build an idle session. The receiver yields capture failures that
    /// happen between controller requests.
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        voice: Arc<dyn VoiceLink>,
        notifier: Arc<dyn NotificationSink>,
        writer: FileWriter,
        options: SessionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            backend,
            voice,
            notifier,
            writer,
            options,
            events,
            active: None,
            next_id: 0,
        };
        (session, events_rx)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn active_channel(&self) -> Option<&ChannelId> {
        self.active.as_ref().map(|a| &a.channel)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.started_at)
    }

    pub async fn start(&mut self, channel: &ChannelSnapshot) -> Result<SessionId, SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let channel_id = channel.id.clone();
        let joined = bounded(
            self.options.gateway_timeout,
            "voice join",
            self.voice.join(&channel_id),
        )
        .await;
        if let Err(e) = joined {
            // The adapter may still complete a join we stopped waiting for.
            self.leave_voice(&channel_id).await;
            return Err(CaptureError::Open(format!("could not join voice channel: {e:#}")).into());
        }

        let backend = Arc::clone(&self.backend);
        let config = self.options.capture;
        let opened = tokio::task::spawn_blocking(move || backend.open(&config))
            .await
            .unwrap_or_else(|e| Err(CaptureError::Open(format!("open task failed: {e}"))));

        let device = match opened {
            Ok(device) => device,
            Err(e) => {
                self.leave_voice(&channel_id).await;
                return Err(e.into());
            }
        };

        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let events = self.events.clone();
        let capture = SessionCapture::new(device);

        let handle = tokio::task::spawn_blocking(move || {
            let outcome = capture.run(&loop_cancel);
            if let Some(error) = &outcome.error {
                let _ = events.send(SessionEvent::CaptureFailed {
                    session: id,
                    error: error.clone(),
                });
            }
            outcome
        });

        self.active = Some(ActiveSession {
            id,
            channel: channel_id.clone(),
            channel_name: channel.display_name().to_string(),
            started_at: Utc::now(),
            cancel,
            capture: handle,
        });

        info!(
            "Session {} started recording channel {} ({})",
            id,
            channel.display_name(),
            channel_id
        );
        self.announce(
            &channel_id,
            &notices::recording_started(self.options.quorum_threshold),
        )
        .await;

        Ok(id)
    }

    /// Stop the active session, save what was captured and release
    /// everything. Returns `NotActive` when there is nothing to stop.
    pub async fn stop(&mut self, reason: StopReason) -> Result<StopReport, SessionError> {
        let Some(active) = self.active.take() else {
            return Err(SessionError::NotActive);
        };

        info!(
            "Stopping session {} in channel {} ({})",
            active.id,
            active.channel,
            reason.as_str()
        );

        active.cancel.cancel();
        let capture = match active.capture.await {
            Ok(outcome) => {
                if let Some(error) = &outcome.error {
                    warn!("Capture loop of session {} ended with: {}", active.id, error);
                }
                Some(outcome.capture)
            }
            Err(e) => {
                error!("Capture loop of session {} aborted: {}", active.id, e);
                None
            }
        };

        let (device, buffer) = match capture {
            Some(capture) => (Some(capture.device), capture.buffer),
            None => (None, FrameBuffer::new()),
        };
        let frames = buffer.len();

        let flushed = self.flush(buffer).await;

        // Cleanup runs whatever the flush returned.
        self.release(device, &active.channel).await;

        let duration = Utc::now() - active.started_at;
        let channel = &active.channel;
        self.announce(
            channel,
            &notices::recording_stopped(reason, self.options.quorum_threshold),
        )
        .await;

        match flushed {
            Ok(file) => {
                let follow_up = match &file {
                    Some(path) => notices::recording_saved(
                        &path
                            .file_stem()
                            .map(|s| s.to_string_lossy().to_string())
                            .unwrap_or_default(),
                    ),
                    None => notices::NOTHING_CAPTURED.to_string(),
                };
                self.announce(channel, &follow_up).await;

                info!(
                    "Session {} finished after {}s with {} frames",
                    active.id,
                    duration.num_seconds(),
                    frames
                );
                Ok(StopReport {
                    session: active.id,
                    reason,
                    channel: active.channel,
                    channel_name: active.channel_name,
                    file,
                    frames,
                    duration,
                })
            }
            Err(e) => {
                error!("Error saving recording of session {}: {}", active.id, e);
                self.announce(channel, notices::SAVE_FAILED).await;
                Err(SessionError::Flush(e))
            }
        }
    }

    async fn flush(&self, buffer: FrameBuffer) -> Result<Option<PathBuf>, FlushError> {
        if buffer.is_empty() {
            return Ok(None);
        }
        let writer = self.writer.clone();
        let config = self.options.capture;
        tokio::task::spawn_blocking(move || writer.write(&buffer, &config))
            .await
            .map_err(|e| FlushError::Task(e.to_string()))?
    }

    async fn release(&self, device: Option<Box<dyn CaptureDevice>>, channel: &ChannelId) {
        if let Some(mut device) = device {
            if let Err(e) = tokio::task::spawn_blocking(move || device.close()).await {
                warn!("Closing capture device failed: {}", e);
            }
        }
        self.leave_voice(channel).await;
        debug!("Released capture resources for channel {}", channel);
    }

    async fn leave_voice(&self, channel: &ChannelId) {
        let left = bounded(
            self.options.gateway_timeout,
            "voice leave",
            self.voice.leave(channel),
        )
        .await;
        if let Err(e) = left {
            warn!("Failed to leave voice channel {}: {:#}", channel, e);
        }
    }

    async fn announce(&self, channel: &ChannelId, text: &str) {
        notify(
            self.notifier.as_ref(),
            channel,
            text,
            self.options.gateway_timeout,
        )
        .await;
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            debug!("Dropping active session {}, cancelling capture", active.id);
            active.cancel.cancel();
        }
    }
}
