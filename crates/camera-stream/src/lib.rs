//! Camera acquisition decoupled from frame processing.
//!
//! A background capture thread continuously overwrites a shared
//! latest-frame slot; consumers read whatever is newest without ever
//! blocking on camera I/O. This is a latest-value cache, not a queue:
//! frames may be skipped or re-read depending on relative cadence.

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{CameraBackend, FrameSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera device {0}")]
    Open(u32),

    #[error("Camera produced no frame during warm-up")]
    Startup,

    #[error("Read failed: {0}")]
    Read(String),
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device index (0 = default webcam).
    pub device_id: u32,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Target FPS.
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}
