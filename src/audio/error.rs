use thiserror::Error;

/// Failures opening or reading the capture device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("No audio input device available: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open capture device: {0}")]
    Open(String),

    #[error("Failed to read from capture device: {0}")]
    Read(String),

    #[error("Capture stream closed")]
    Closed,
}
