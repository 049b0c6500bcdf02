//! Video frame type.

use std::time::{SystemTime, UNIX_EPOCH};

/// Decoded RGB video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3).
    pub data: Vec<u8>,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Capture timestamp (milliseconds since the Unix epoch).
    pub timestamp_ms: u64,
    /// Frame sequence number assigned by the backend.
    pub sequence: u64,
}

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            data,
            width,
            height,
            timestamp_ms,
            sequence,
        }
    }

    /// Frame dimensions as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the RGB pixel at (x, y).
    ///
    /// `None` outside the declared dimensions, and also when the buffer is
    /// shorter than the dimensions imply (a backend may deliver metadata-only
    /// frames).
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(idx..idx + 3)?.try_into().ok()
    }
}
