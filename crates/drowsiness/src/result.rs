//! Per-frame detection results.

use serde::{Deserialize, Serialize};

/// Everything the pipeline learned from a single frame.
///
/// All fields are functions of that frame's landmarks and the trackers'
/// prior state; a frame without a face leaves everything at its neutral
/// default except `processing_time_ms`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether a face was found in this frame.
    pub face_detected: bool,

    // Eye metrics
    pub ear: f64,
    pub left_ear: f64,
    pub right_ear: f64,
    pub eyes_closed: bool,
    pub blink_count: u64,

    // Yawn metrics
    pub mar: f64,
    pub is_yawning: bool,
    pub yawn_count: u64,

    // Head pose
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub head_down: bool,
    pub head_tilted: bool,

    // Fused assessment
    pub drowsiness_score: f64,
    pub is_drowsy: bool,
    pub is_fatigued: bool,

    /// Time spent processing this frame.
    pub processing_time_ms: f64,
}
