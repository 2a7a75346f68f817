use std::time::Duration;

use super::frame::AudioFrame;
use crate::config::SttConfig;

/// How an uploaded file is cut into frames for the streaming recognizer
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Bytes per frame (default: 8192)
    pub chunk_bytes: usize,
    /// Pause between frames, approximating live capture (default: 50ms)
    pub delay: Duration,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: 8192,
            delay: Duration::from_millis(50),
        }
    }
}

impl ChunkConfig {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            chunk_bytes: config.stream_chunk_bytes.max(1),
            delay: Duration::from_millis(config.stream_chunk_delay_ms),
        }
    }

    /// Number of frames `len` bytes split into
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_bytes.max(1))
    }
}

/// Split `bytes` into ordered frames of at most `chunk_bytes`.
///
/// Every frame is non-empty; only the last one may be shorter.
pub fn split_frames(bytes: &[u8], chunk_bytes: usize) -> impl Iterator<Item = AudioFrame> + '_ {
    bytes
        .chunks(chunk_bytes.max(1))
        .filter_map(|chunk| AudioFrame::new(chunk.to_vec()))
}
