//! Host input capture via cpal.
//!
//! cpal streams are not `Send` on every platform, so each open device parks
//! its stream on a dedicated thread. Callback data crosses back over a
//! channel and is re-chunked into fixed-size frames by `read_chunk`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info};

use super::capture::{CaptureBackend, CaptureConfig, CaptureDevice, PcmFrame, SampleFormat};
use super::error::CaptureError;

type Chunk = Result<Vec<u8>, String>;

/// Shortest wait for callback data before the stream counts as stalled.
const MIN_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `read_chunk` waits for data before giving up on the stream.
fn stall_timeout(config: &CaptureConfig) -> Duration {
    (config.chunk_duration() * 8).max(MIN_STALL_TIMEOUT)
}

/// Opens the default (or a named) host input device.
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new(device_name: Option<&str>) -> Self {
        Self {
            device_name: device_name.map(str::to_string),
        }
    }
}

impl CaptureBackend for CpalBackend {
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let (data_tx, data_rx) = mpsc::channel::<Chunk>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let device_name = self.device_name.clone();
        let stream_config = *config;

        let worker = std::thread::Builder::new()
            .name("nouncil-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), &stream_config, data_tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Park until close() or the device handle is dropped.
                let _ = stop_rx.recv();
                debug!("Stopping capture stream");
                drop(stream);
            })
            .map_err(|e| CaptureError::Open(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::Open("capture thread exited early".to_string()));
            }
        }

        Ok(Box::new(CpalDevice {
            data: data_rx,
            pending: Vec::new(),
            chunk_bytes: config.chunk_bytes(),
            stall_timeout: stall_timeout(config),
            stop: Some(stop_tx),
            worker: Some(worker),
        }))
    }
}

struct CpalDevice {
    data: Receiver<Chunk>,
    pending: Vec<u8>,
    chunk_bytes: usize,
    stall_timeout: Duration,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureDevice for CpalDevice {
    fn read_chunk(&mut self) -> Result<PcmFrame, CaptureError> {
        if self.stop.is_none() {
            return Err(CaptureError::Closed);
        }

        while self.pending.len() < self.chunk_bytes {
            match self.data.recv_timeout(self.stall_timeout) {
                Ok(Ok(bytes)) => self.pending.extend_from_slice(&bytes),
                Ok(Err(message)) => return Err(CaptureError::Read(message)),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::Read(format!(
                        "capture stream stalled: no audio for {}ms",
                        self.stall_timeout.as_millis()
                    )))
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Closed),
            }
        }

        let rest = self.pending.split_off(self.chunk_bytes);
        let chunk = std::mem::replace(&mut self.pending, rest);
        Ok(PcmFrame::new(chunk))
    }

    fn close(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Capture thread panicked while closing");
            }
        }
        self.pending.clear();
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if self.stop.is_some() {
            debug!("Dropping open capture device, cleaning up");
            self.close();
        }
    }
}

fn open_stream(
    device_name: Option<&str>,
    config: &CaptureConfig,
    tx: Sender<Chunk>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Open(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceNotFound("no default input".to_string()))?,
    };

    info!(
        "Capturing from device: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let native_format = device
        .default_input_config()
        .map_err(|e| CaptureError::Open(e.to_string()))?
        .sample_format();

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let target = config.sample_format;
    let stream = match native_format {
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, target, tx),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, target, tx),
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, target, tx),
        other => {
            return Err(CaptureError::Open(format!(
                "unsupported native sample format {other:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| CaptureError::Open(e.to_string()))?;

    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    target: SampleFormat,
    tx: Sender<Chunk>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    i16: FromSample<T>,
    f32: FromSample<T>,
{
    let err_tx = tx.clone();
    let err_fn = move |err: cpal::StreamError| {
        error!("Capture stream error: {}", err);
        let _ = err_tx.send(Err(err.to_string()));
    };

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(Ok(encode(data, target)));
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::Open(e.to_string()))
}

fn encode<T>(data: &[T], target: SampleFormat) -> Vec<u8>
where
    T: Sample,
    i16: FromSample<T>,
    f32: FromSample<T>,
{
    let mut out = Vec::with_capacity(data.len() * target.bytes_per_sample());
    match target {
        SampleFormat::Int16 => {
            for &sample in data {
                out.extend_from_slice(&i16::from_sample(sample).to_le_bytes());
            }
        }
        SampleFormat::Float32 => {
            for &sample in data {
                out.extend_from_slice(&f32::from_sample(sample).to_le_bytes());
            }
        }
    }
    out
}
