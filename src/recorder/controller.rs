//! Single owner of the recording session.
//!
//! Membership events, channel syncs and user commands arrive concurrently
//! from the API; they are queued and applied one at a time by the controller
//! task, so no two starts or stops against the session ever interleave.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelDirectory, ChannelId, ChannelSnapshot, MembershipEvent};

use super::error::{ControlError, SessionError};
use super::monitor::{MembershipMonitor, QuorumDecision};
use super::notices;
use super::session::{RecordingSession, SessionEvent, StopReason, StopReport};
use super::status::RecorderStatusHandle;

const QUEUE_DEPTH: usize = 64;

/// The user issuing a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Voice channel the user is connected to, when the platform reports it.
    #[serde(default)]
    pub voice_channel: Option<ChannelId>,
    #[serde(default)]
    pub is_admin: bool,
}

/// A start/stop request not yet applied to the session.
#[derive(Debug, Clone)]
pub enum Intent {
    Start(ChannelSnapshot),
    QuorumLost(ChannelId),
    ManualStop(Requester),
    ForceStop(Requester),
}

#[derive(Debug)]
pub enum Applied {
    Started(ChannelId),
    Stopped(StopReport),
    Ignored,
}

pub enum ControlRequest {
    Membership(MembershipEvent),
    SyncChannels(Vec<ChannelSnapshot>),
    Intent {
        intent: Intent,
        reply: oneshot::Sender<Result<Applied, ControlError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable sender side of the controller queue.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControllerHandle {
    pub async fn membership(&self, event: MembershipEvent) -> Result<(), ControlError> {
        self.send(ControlRequest::Membership(event)).await
    }

    pub async fn sync_channels(&self, snapshots: Vec<ChannelSnapshot>) -> Result<(), ControlError> {
        self.send(ControlRequest::SyncChannels(snapshots)).await
    }

    /// Apply an intent and wait for the outcome.
    pub async fn submit(&self, intent: Intent) -> Result<Applied, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlRequest::Intent { intent, reply }).await?;
        rx.await.map_err(|_| ControlError::Unavailable)?
    }

    /// Stop any active recording and end the controller task.
    pub async fn shutdown(&self) -> Result<(), ControlError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlRequest::Shutdown { reply }).await?;
        rx.await.map_err(|_| ControlError::Unavailable)
    }

    async fn send(&self, request: ControlRequest) -> Result<(), ControlError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| ControlError::Unavailable)
    }
}

pub struct RecorderController {
    session: RecordingSession,
    monitor: MembershipMonitor,
    directory: ChannelDirectory,
    status: RecorderStatusHandle,
}

impl RecorderController {
    pub fn new(
        session: RecordingSession,
        monitor: MembershipMonitor,
        status: RecorderStatusHandle,
    ) -> Self {
        Self {
            session,
            monitor,
            directory: ChannelDirectory::default(),
            status,
        }
    }

    /// Run the controller on its own task.
    pub fn spawn(
        self,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let task = tokio::spawn(self.run(rx, events));
        (ControllerHandle { tx }, task)
    }

    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<ControlRequest>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        self.reconcile_all().await;

        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => self.handle_session_event(event).await,
                request = requests.recv() => match request {
                    Some(ControlRequest::Membership(event)) => self.handle_membership(event).await,
                    Some(ControlRequest::SyncChannels(snapshots)) => self.sync_channels(snapshots).await,
                    Some(ControlRequest::Intent { intent, reply }) => {
                        let result = self.apply(intent).await;
                        let _ = reply.send(result);
                    }
                    Some(ControlRequest::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
            }
        }

        info!("Recorder controller stopped");
    }

    /// Evaluate every known channel once.
    pub async fn reconcile_all(&mut self) {
        let ids: Vec<ChannelId> = self
            .directory
            .snapshots()
            .into_iter()
            .map(|s| s.id)
            .collect();
        info!(
            "Checking {} known voice channels against a quorum of {}",
            self.directory.len(),
            self.monitor.threshold()
        );
        for id in ids {
            self.evaluate(&id).await;
        }
    }

    pub async fn handle_membership(&mut self, event: MembershipEvent) {
        debug!("Membership change for user {}", event.member.user_id);
        self.directory.apply(&event);
        let ids: Vec<ChannelId> = event
            .affected_channels()
            .into_iter()
            .map(|c| c.id.clone())
            .collect();
        for id in ids {
            self.evaluate(&id).await;
        }
    }

    /// Replace the directory with a full listing and re-evaluate.
    pub async fn sync_channels(&mut self, snapshots: Vec<ChannelSnapshot>) {
        self.directory.replace_all(snapshots);
        if self.directory.is_empty() {
            warn!("Channel sync listed no voice channels");
        }
        if let Some(active) = self.session.active_channel() {
            if self.directory.get(active).is_none() {
                // A recorded channel missing from the listing has no members.
                let empty = ChannelSnapshot {
                    id: active.clone(),
                    name: String::new(),
                    occupants: Vec::new(),
                };
                self.directory.upsert(empty);
            }
        }
        self.reconcile_all().await;
    }

    pub async fn apply(&mut self, intent: Intent) -> Result<Applied, ControlError> {
        match intent {
            Intent::Start(snapshot) => {
                if let Some(active) = self.session.active_channel() {
                    debug!(
                        "Ignoring start for channel {}: already recording {}",
                        snapshot.id, active
                    );
                    return Ok(Applied::Ignored);
                }
                self.start(snapshot).await
            }
            Intent::QuorumLost(channel) => {
                if self.session.active_channel() != Some(&channel) {
                    debug!("Ignoring quorum loss for channel {}: not recording it", channel);
                    return Ok(Applied::Ignored);
                }
                self.stop(StopReason::AutoQuorumLoss).await
            }
            Intent::ManualStop(requester) => {
                let Some(active) = self.session.active_channel() else {
                    return Err(SessionError::NotActive.into());
                };
                if !self.is_present(&requester, active) {
                    warn!(
                        "Rejected stop from {}: not in recording channel {}",
                        requester.user_id, active
                    );
                    return Err(ControlError::PermissionDenied(
                        notices::NOT_IN_CHANNEL.to_string(),
                    ));
                }
                info!("Stop requested by {}", requester.user_id);
                self.stop(StopReason::Manual).await
            }
            Intent::ForceStop(requester) => {
                if !self.session.is_active() {
                    return Err(SessionError::NotActive.into());
                }
                if !requester.is_admin {
                    warn!("Rejected force stop from non-admin {}", requester.user_id);
                    return Err(ControlError::PermissionDenied(notices::ADMIN_ONLY.to_string()));
                }
                info!("Force stop requested by {}", requester.user_id);
                self.stop(StopReason::ForcedByAdmin).await
            }
        }
    }

    pub async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CaptureFailed { session, error } => {
                if self.session.active_id() != Some(session) {
                    debug!("Ignoring capture failure of finished session {}", session);
                    return;
                }
                error!("Error in recording loop: {}", error);
                if let Err(e) = self.stop(StopReason::Error).await {
                    warn!("Stopping failed session {} reported: {}", session, e);
                    return;
                }
                self.status.set_error(error.to_string()).await;
            }
        }
    }

    /// Stop an active recording before the process exits.
    pub async fn shutdown(&mut self) {
        if !self.session.is_active() {
            return;
        }
        info!("Shutting down with an active recording, saving it");
        if let Err(e) = self.stop(StopReason::Manual).await {
            error!("Failed to stop recording during shutdown: {}", e);
        }
    }

    async fn evaluate(&mut self, id: &ChannelId) {
        let Some(snapshot) = self.directory.get(id).cloned() else {
            return;
        };
        let decision = self
            .monitor
            .evaluate(&snapshot, self.session.active_channel());

        let result = match decision {
            Some(QuorumDecision::Start(_)) => self.apply(Intent::Start(snapshot)).await,
            Some(QuorumDecision::Stop(channel, _)) => self.apply(Intent::QuorumLost(channel)).await,
            None => return,
        };

        if let Err(e) = result {
            warn!("Automatic transition for channel {} failed: {}", id, e);
        }
    }

    fn is_present(&self, requester: &Requester, active: &ChannelId) -> bool {
        match &requester.voice_channel {
            Some(channel) => channel == active,
            None => self
                .directory
                .get(active)
                .map(|c| c.contains(&requester.user_id))
                .unwrap_or(false),
        }
    }

    async fn start(&mut self, snapshot: ChannelSnapshot) -> Result<Applied, ControlError> {
        match self.session.start(&snapshot).await {
            Ok(_) => {
                let started_at = self.session.started_at().unwrap_or_else(chrono::Utc::now);
                self.status
                    .start_recording(
                        snapshot.id.clone(),
                        snapshot.display_name().to_string(),
                        started_at,
                    )
                    .await;
                Ok(Applied::Started(snapshot.id))
            }
            Err(e) => {
                error!("Error starting recording in {}: {}", snapshot.display_name(), e);
                self.status.set_error(e.to_string()).await;
                Err(e.into())
            }
        }
    }

    async fn stop(&mut self, reason: StopReason) -> Result<Applied, ControlError> {
        if !self.session.is_active() {
            return Err(SessionError::NotActive.into());
        }

        self.status.set_stopping().await;
        match self.session.stop(reason).await {
            Ok(report) => {
                self.status.finish(report.file.clone(), None).await;
                Ok(Applied::Stopped(report))
            }
            Err(e) => {
                // The session is torn down even when saving failed.
                self.status.finish(None, Some(e.to_string())).await;
                Err(e.into())
            }
        }
    }
}
