//! Monitoring session configuration.
//!
//! Loading this from a file is the embedding application's concern; the
//! core only consumes the values.

use alerting::AlertConfig;
use camera_stream::CameraConfig;
use serde::{Deserialize, Serialize};

/// Configuration consumed by the monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// EAR below which eyes count as closed.
    pub ear_threshold: f64,
    /// MAR above which the mouth counts as open.
    pub mar_threshold: f64,
    /// Continuous eye closure that counts as drowsiness (seconds).
    pub drowsy_time_seconds: f64,
    /// Nominal blink duration (milliseconds).
    pub blink_time_ms: f64,
    /// Minimum frames a mouth opening must persist to be a yawn.
    pub min_yawn_frames: u32,
    /// Yawns inside the trailing fatigue window that indicate fatigue.
    pub yawn_consecutive_threshold: usize,
    /// Degrees of downward pitch that count as head-down.
    pub pitch_threshold: f64,
    /// Degrees of roll that count as head-tilted.
    pub roll_threshold: f64,
    /// Alert dispatch settings.
    pub alert: AlertConfig,
    /// Camera settings; `fps` also drives the frame-count thresholds.
    pub camera: CameraConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            mar_threshold: 0.75,
            drowsy_time_seconds: 2.0,
            blink_time_ms: 100.0,
            min_yawn_frames: 15,
            yawn_consecutive_threshold: 3,
            pitch_threshold: 15.0,
            roll_threshold: 20.0,
            alert: AlertConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Consecutive closed frames that count as drowsiness, at the
    /// configured frame rate. Never less than one frame.
    pub fn drowsy_frames_threshold(&self) -> u32 {
        ((self.drowsy_time_seconds * f64::from(self.camera.fps)) as u32).max(1)
    }

    /// Frame-count equivalent of the nominal blink duration.
    pub fn blink_frames_threshold(&self) -> u32 {
        (((self.blink_time_ms / 1000.0) * f64::from(self.camera.fps)) as u32).max(1)
    }
}
