pub mod capture;
pub mod cpal_device;
pub mod error;
pub mod frame_buffer;

pub use capture::{CaptureBackend, CaptureConfig, CaptureDevice, PcmFrame, SampleFormat};
pub use cpal_device::CpalBackend;
pub use error::CaptureError;
pub use frame_buffer::FrameBuffer;
