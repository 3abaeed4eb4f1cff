//! Capture device contract.
//!
//! A backend opens a device with a fixed [`CaptureConfig`]; the device then
//! hands out fixed-size PCM chunks through blocking reads until it is closed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::CaptureError;

/// Sample encoding of the captured PCM bytes (little endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Int16,
    Float32,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::Int16 => 2,
            SampleFormat::Float32 => 4,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        (self.bytes_per_sample() * 8) as u16
    }
}

/// Process-wide capture parameters, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    /// Frames (one sample per channel) per chunk.
    pub chunk_frames: usize,
}

impl CaptureConfig {
    /// Size in bytes of one interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }

    /// Size in bytes of every chunk returned by [`CaptureDevice::read_chunk`].
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_frames * self.frame_bytes()
    }

    /// Playback time covered by one chunk.
    pub fn chunk_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.chunk_frames as f64 / self.sample_rate as f64)
    }
}

/// One chunk of raw interleaved PCM, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFrame(Vec<u8>);

impl PcmFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An open capture handle. Dropped or closed handles must not be read again.
pub trait CaptureDevice: Send {
    /// Block until one full chunk is available.
    fn read_chunk(&mut self) -> Result<PcmFrame, CaptureError>;

    /// Release the device. Safe to call more than once.
    fn close(&mut self);
}

/// Opens capture devices. Shared by every session of the process.
pub trait CaptureBackend: Send + Sync {
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}
