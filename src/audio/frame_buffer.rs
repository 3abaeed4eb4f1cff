use super::capture::PcmFrame;

/// Ordered PCM chunks captured during one session.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<PcmFrame>,
    total_bytes: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: PcmFrame) {
        self.total_bytes += frame.len();
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn frames(&self) -> impl Iterator<Item = &PcmFrame> {
        self.frames.iter()
    }
}
