//! Scripted capture devices, a recording gateway and a running recorder
//! built from both, shared by the recorder tests.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::audio::{
    CaptureBackend, CaptureConfig, CaptureDevice, CaptureError, PcmFrame, SampleFormat,
};
use crate::channel::{
    ChannelId, ChannelSnapshot, MembershipEvent, NotificationSink, Occupant, VoiceLink,
};

use super::controller::{ControllerHandle, RecorderController};
use super::monitor::MembershipMonitor;
use super::session::{RecordingSession, SessionOptions};
use super::status::{RecorderStatus, RecorderStatusHandle};
use super::writer::FileWriter;

pub const CHUNK_FRAMES: usize = 4;

pub fn test_config() -> CaptureConfig {
    CaptureConfig {
        sample_rate: 8000,
        channels: 1,
        sample_format: SampleFormat::Int16,
        chunk_frames: CHUNK_FRAMES,
    }
}

/// Devices yield frames whose samples all equal the frame index.
#[derive(Default)]
pub struct CountingBackend {
    pub fail_open: bool,
    /// Fail the read after this many frames.
    pub fail_after: Option<usize>,
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub reads_after_close: Arc<AtomicUsize>,
}

impl CountingBackend {
    pub fn failing_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::default()
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for CountingBackend {
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        if self.fail_open {
            return Err(CaptureError::DeviceNotFound("test".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingDevice {
            next: 0,
            samples: config.chunk_frames * config.channels as usize,
            fail_after: self.fail_after,
            closed: false,
            closes: Arc::clone(&self.closes),
            reads_after_close: Arc::clone(&self.reads_after_close),
        }))
    }
}

struct CountingDevice {
    next: usize,
    samples: usize,
    fail_after: Option<usize>,
    closed: bool,
    closes: Arc<AtomicUsize>,
    reads_after_close: Arc<AtomicUsize>,
}

impl CaptureDevice for CountingDevice {
    fn read_chunk(&mut self) -> Result<PcmFrame, CaptureError> {
        if self.closed {
            self.reads_after_close.fetch_add(1, Ordering::SeqCst);
            return Err(CaptureError::Closed);
        }
        if self.fail_after == Some(self.next) {
            return Err(CaptureError::Read("device unplugged".to_string()));
        }
        std::thread::sleep(Duration::from_millis(1));
        let value = self.next as i16;
        self.next += 1;
        Ok(PcmFrame::new(
            std::iter::repeat(value.to_le_bytes())
                .take(self.samples)
                .flatten()
                .collect(),
        ))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Records every notice and voice request. The `stall_*` flags make the
/// matching call record itself and then never complete.
#[derive(Default)]
pub struct RecordingGateway {
    pub fail_join: bool,
    pub stall_join: bool,
    pub stall_leave: bool,
    pub stall_notices: bool,
    pub notices: Mutex<Vec<(ChannelId, String)>>,
    pub joins: AtomicUsize,
    pub leaves: AtomicUsize,
}

impl RecordingGateway {
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn notices_to(&self, channel: &str) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id.as_str() == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn leaves(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }
}

async fn stall_if(stall: bool) {
    if stall {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl NotificationSink for RecordingGateway {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.notices
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        stall_if(self.stall_notices).await;
        Ok(())
    }
}

#[async_trait]
impl VoiceLink for RecordingGateway {
    async fn join(&self, _channel: &ChannelId) -> Result<()> {
        if self.fail_join {
            anyhow::bail!("missing voice permission");
        }
        stall_if(self.stall_join).await;
        self.joins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn leave(&self, _channel: &ChannelId) -> Result<()> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        stall_if(self.stall_leave).await;
        Ok(())
    }
}

/// A spawned controller writing into a temporary directory.
pub struct Recorder {
    pub handle: ControllerHandle,
    pub task: JoinHandle<()>,
    pub status: RecorderStatusHandle,
    pub gateway: Arc<RecordingGateway>,
    pub backend: Arc<CountingBackend>,
    pub dir: TempDir,
}

impl Recorder {
    pub fn spawn(backend: CountingBackend, threshold: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(RecordingGateway::default());
        let backend = Arc::new(backend);
        let (session, events) = RecordingSession::new(
            backend.clone(),
            gateway.clone(),
            gateway.clone(),
            FileWriter::new(dir.path(), "meeting"),
            SessionOptions::new(test_config(), threshold),
        );
        let status = RecorderStatusHandle::default();
        let controller =
            RecorderController::new(session, MembershipMonitor::new(threshold), status.clone());
        let (handle, task) = controller.spawn(events);

        Self {
            handle,
            task,
            status,
            gateway,
            backend,
            dir,
        }
    }

    pub fn recordings(&self) -> Vec<PathBuf> {
        wav_files(self.dir.path())
    }

    /// Poll the status until `check` holds or a few seconds pass.
    pub async fn wait_for(&self, check: impl Fn(&RecorderStatus) -> bool) -> RecorderStatus {
        for _ in 0..300 {
            let status = self.status.get().await;
            if check(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("recorder never reached the expected state: {:?}", self.status.get().await);
    }
}

pub fn members(channel: &str, count: usize) -> ChannelSnapshot {
    let occupants = (0..count)
        .map(|i| Occupant::member(format!("user{i}")))
        .collect();
    ChannelSnapshot::new(channel, format!("{channel} voice"), occupants)
}

/// `user` joined `channel`, leaving it with `count` members.
pub fn joined(channel: &str, user: usize, count: usize) -> MembershipEvent {
    MembershipEvent {
        member: Occupant::member(format!("user{user}")),
        before: None,
        after: Some(members(channel, count)),
    }
}

/// `user` left `channel`, leaving it with `count` members.
pub fn left(channel: &str, user: usize, count: usize) -> MembershipEvent {
    MembershipEvent {
        member: Occupant::member(format!("user{user}")),
        before: Some(members(channel, count)),
        after: None,
    }
}

pub fn wav_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("wav"))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Read back every sample of a written recording.
pub fn read_samples(path: &Path) -> Vec<i16> {
    let mut reader = hound::WavReader::open(path).unwrap();
    reader.samples::<i16>().map(|s| s.unwrap()).collect()
}
