use crate::audio::{CaptureConfig, SampleFormat};
use crate::global;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recorder: RecorderConfig,
    pub audio: AudioConfig,
    pub commands: CommandsConfig,
    pub gateway: GatewayConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Minimum number of non-bot members that keeps a recording running.
    pub quorum_threshold: usize,
    /// File name prefix for saved recordings.
    pub file_prefix: String,
    /// Output directory. Empty means `{data_dir}/recordings`.
    pub recordings_dir: String,
    /// How long shutdown waits for an active recording to be saved.
    pub shutdown_grace_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    /// Frames per chunk read from the device.
    pub chunk_frames: usize,
    /// Input device name. Empty means the host default.
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the chat platform adapter. Empty logs notices instead.
    pub webhook_url: String,
    /// How long one join, leave or notice may take before it is abandoned.
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory. Empty means `{data_dir}/logs`.
    pub dir: String,
    pub file_name: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            quorum_threshold: 3,
            file_prefix: "nouncil_recording".to_string(),
            recordings_dir: String::new(),
            shutdown_grace_seconds: 10,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            sample_format: SampleFormat::Int16,
            chunk_frames: 1024,
            device: String::new(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_seconds: 10,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3747,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            file_name: "bot.log".to_string(),
        }
    }
}

impl AudioConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_format: self.sample_format,
            chunk_frames: self.chunk_frames,
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        non_empty(&self.device)
    }
}

impl RecorderConfig {
    pub fn recordings_dir(&self) -> Result<PathBuf> {
        match non_empty(&self.recordings_dir) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => global::recordings_dir(),
        }
    }
}

impl GatewayConfig {
    pub fn webhook_url(&self) -> Option<&str> {
        non_empty(&self.webhook_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl LoggingConfig {
    pub fn dir(&self) -> Result<PathBuf> {
        match non_empty(&self.dir) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => global::logs_dir(),
        }
    }

    pub fn file_path(&self) -> Result<PathBuf> {
        Ok(self.dir()?.join(&self.file_name))
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&global::config_file()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = self.to_toml()?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.recorder.quorum_threshold == 0 {
            bail!("recorder.quorum_threshold must be at least 1");
        }
        if self.recorder.file_prefix.trim().is_empty() {
            bail!("recorder.file_prefix must not be empty");
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be greater than 0");
        }
        if self.audio.channels == 0 {
            bail!("audio.channels must be greater than 0");
        }
        if self.audio.chunk_frames == 0 {
            bail!("audio.chunk_frames must be greater than 0");
        }
        if self.gateway.timeout_seconds == 0 {
            bail!("gateway.timeout_seconds must be greater than 0");
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
