//! Serializes a finished frame buffer to a WAV file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use hound::{WavSpec, WavWriter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::audio::{CaptureConfig, FrameBuffer, SampleFormat};

use super::error::FlushError;

const EXTENSION: &str = "wav";

#[derive(Debug, Clone)]
pub struct FileWriter {
    dir: PathBuf,
    prefix: String,
}

impl FileWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every frame in order to a new file.
    ///
    /// Returns `Ok(None)` without touching the disk when the buffer is empty.
    pub fn write(
        &self,
        buffer: &FrameBuffer,
        config: &CaptureConfig,
    ) -> Result<Option<PathBuf>, FlushError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.next_path(Local::now());

        if let Err(e) = write_wav(&path, buffer, config) {
            if path.exists() {
                if let Err(remove_err) = std::fs::remove_file(&path) {
                    warn!("Failed to remove partial recording {:?}: {}", path, remove_err);
                }
            }
            return Err(e);
        }

        info!(
            "Saved recording to {:?} ({} frames, {} bytes)",
            path,
            buffer.len(),
            buffer.total_bytes()
        );
        Ok(Some(path))
    }

    fn next_path(&self, now: DateTime<Local>) -> PathBuf {
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let path = self
            .dir
            .join(format!("{}_{}.{}", self.prefix, timestamp, EXTENSION));

        // Two sessions inside the same second get a counter suffix.
        if path.exists() {
            for i in 1.. {
                let alt_path = self
                    .dir
                    .join(format!("{}_{}_{}.{}", self.prefix, timestamp, i, EXTENSION));
                if !alt_path.exists() {
                    return alt_path;
                }
            }
        }

        path
    }
}

fn write_wav(path: &Path, buffer: &FrameBuffer, config: &CaptureConfig) -> Result<(), FlushError> {
    let spec = WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: config.sample_format.bits_per_sample(),
        sample_format: match config.sample_format {
            SampleFormat::Int16 => hound::SampleFormat::Int,
            SampleFormat::Float32 => hound::SampleFormat::Float,
        },
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in buffer.frames() {
        match config.sample_format {
            SampleFormat::Int16 => {
                for bytes in frame.as_bytes().chunks_exact(2) {
                    writer.write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))?;
                }
            }
            SampleFormat::Float32 => {
                for bytes in frame.as_bytes().chunks_exact(4) {
                    writer.write_sample(f32::from_le_bytes([
                        bytes[0], bytes[1], bytes[2], bytes[3],
                    ]))?;
                }
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// A saved recording on disk.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Saved recordings in `dir`, newest first.
pub fn list_recordings(dir: &Path, limit: usize) -> Result<Vec<RecordingEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        let metadata = entry.metadata()?;
        entries.push(RecordingEntry {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            path,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
    entries.truncate(limit);
    Ok(entries)
}
