//! Recorder status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::channel::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderPhase {
    Idle,
    Recording,
    Stopping,
}

impl RecorderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
        }
    }
}

/// Snapshot of the recorder, readable by API handlers.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    pub phase: RecorderPhase,
    pub channel: Option<ChannelId>,
    pub channel_name: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_file: Option<PathBuf>,
    pub last_error: Option<String>,
    pub sessions_completed: u64,
}

impl Default for RecorderStatus {
    fn default() -> Self {
        Self {
            phase: RecorderPhase::Idle,
            channel: None,
            channel_name: None,
            started_at: None,
            last_file: None,
            last_error: None,
            sessions_completed: 0,
        }
    }
}

impl RecorderStatus {
    /// Seconds since the current recording started.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Shared view of the recorder. Only the controller writes to it.
#[derive(Clone, Default)]
pub struct RecorderStatusHandle {
    inner: Arc<RwLock<RecorderStatus>>,
}

impl RecorderStatusHandle {
    pub async fn get(&self) -> RecorderStatus {
        self.inner.read().await.clone()
    }

    pub async fn start_recording(
        &self,
        channel: ChannelId,
        channel_name: String,
        started_at: chrono::DateTime<chrono::Utc>,
    ) {
        let mut status = self.inner.write().await;
        status.phase = RecorderPhase::Recording;
        status.channel = Some(channel);
        status.channel_name = Some(channel_name);
        status.started_at = Some(started_at);
        status.last_error = None;
    }

    pub async fn set_stopping(&self) {
        self.inner.write().await.phase = RecorderPhase::Stopping;
    }

    pub async fn finish(&self, file: Option<PathBuf>, error: Option<String>) {
        let mut status = self.inner.write().await;
        status.phase = RecorderPhase::Idle;
        status.channel = None;
        status.channel_name = None;
        status.started_at = None;
        if file.is_some() {
            status.last_file = file;
        }
        status.last_error = error;
        status.sessions_completed += 1;
    }

    pub async fn set_error(&self, error: String) {
        self.inner.write().await.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_as_str() {
        assert_eq!(RecorderPhase::Idle.as_str(), "idle");
        assert_eq!(RecorderPhase::Recording.as_str(), "recording");
        assert_eq!(RecorderPhase::Stopping.as_str(), "stopping");
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&RecorderPhase::Recording).unwrap();
        assert_eq!(json, "\"recording\"");
    }

    #[tokio::test]
    async fn test_start_then_finish_resets_channel() {
        let handle = RecorderStatusHandle::default();
        handle
            .start_recording(ChannelId::new("7"), "Lobby".to_string(), chrono::Utc::now())
            .await;

        let status = handle.get().await;
        assert_eq!(status.phase, RecorderPhase::Recording);
        assert_eq!(status.channel, Some(ChannelId::new("7")));
        assert!(status.duration_seconds().is_some());

        handle
            .finish(Some(PathBuf::from("/tmp/a.wav")), None)
            .await;
        let status = handle.get().await;
        assert_eq!(status.phase, RecorderPhase::Idle);
        assert!(status.channel.is_none());
        assert!(status.started_at.is_none());
        assert_eq!(status.last_file, Some(PathBuf::from("/tmp/a.wav")));
        assert_eq!(status.sessions_completed, 1);
    }

    #[tokio::test]
    async fn test_finish_without_file_keeps_previous_file() {
        let handle = RecorderStatusHandle::default();
        handle.finish(Some(PathBuf::from("/tmp/a.wav")), None).await;
        handle.finish(None, Some("boom".to_string())).await;

        let status = handle.get().await;
        assert_eq!(status.last_file, Some(PathBuf::from("/tmp/a.wav")));
        assert_eq!(status.last_error, Some("boom".to_string()));
    }
}
