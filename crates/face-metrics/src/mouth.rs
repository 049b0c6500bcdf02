//! Yawn detection over per-frame MAR values.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::geometry::mouth_aspect_ratio;
use crate::Point2;

/// Capacity of the recent-yawn frame-index window.
pub const RECENT_YAWN_CAPACITY: usize = 100;

/// Trailing window, in frames, over which yawn density indicates fatigue
/// (~3 seconds at 30 fps).
pub const FATIGUE_WINDOW_FRAMES: u64 = 90;

/// Per-frame mouth measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YawnMetrics {
    pub mar: f64,
    pub is_yawning: bool,
    /// Consecutive frames the mouth has been open, including this one.
    pub yawn_duration_frames: u32,
    pub total_yawns: u64,
}

/// Debounced yawn state machine with a fatigue-pattern detector.
///
/// A mouth opening only registers as a yawn once it has persisted for
/// `min_yawn_frames`; the yawn is counted when the mouth closes again.
/// Completed yawns are remembered by frame index so that a burst of yawns
/// inside [`FATIGUE_WINDOW_FRAMES`] can flag fatigue.
pub struct YawnDetector {
    mar_threshold: f64,
    min_yawn_frames: u32,
    consecutive_yawns_alert: usize,
    yawn_frame_count: u32,
    total_yawns: u64,
    is_yawning: bool,
    recent_yawns: VecDeque<u64>,
    frame_number: u64,
}

impl YawnDetector {
    pub fn new(mar_threshold: f64, min_yawn_frames: u32, consecutive_yawns_alert: usize) -> Self {
        info!(mar_threshold, min_yawn_frames, "yawn detector initialized");
        Self {
            mar_threshold,
            min_yawn_frames,
            consecutive_yawns_alert,
            yawn_frame_count: 0,
            total_yawns: 0,
            is_yawning: false,
            recent_yawns: VecDeque::with_capacity(RECENT_YAWN_CAPACITY),
            frame_number: 0,
        }
    }

    /// Process one frame's mouth landmarks (12 outer + 8 inner points).
    pub fn process_mouth(&mut self, mouth: &[Point2]) -> YawnMetrics {
        self.frame_number += 1;

        let mar = mouth_aspect_ratio(mouth);
        let currently_open = mar > self.mar_threshold;

        if currently_open {
            self.yawn_frame_count += 1;
        } else {
            // A debounced yawn that just ended counts once, on close.
            if self.is_yawning && self.yawn_frame_count >= self.min_yawn_frames {
                self.total_yawns += 1;
                if self.recent_yawns.len() == RECENT_YAWN_CAPACITY {
                    self.recent_yawns.pop_front();
                }
                self.recent_yawns.push_back(self.frame_number);
                info!(total = self.total_yawns, "yawn detected");
            }
            self.yawn_frame_count = 0;
        }

        self.is_yawning = currently_open && self.yawn_frame_count >= self.min_yawn_frames;

        YawnMetrics {
            mar,
            is_yawning: self.is_yawning,
            yawn_duration_frames: self.yawn_frame_count,
            total_yawns: self.total_yawns,
        }
    }

    /// True when enough yawns landed inside the trailing fatigue window.
    ///
    /// Entries age out implicitly: the density query filters by frame-index
    /// distance, and the window capacity bounds memory.
    pub fn is_fatigue_indicated(&self) -> bool {
        let recent = self
            .recent_yawns
            .iter()
            .filter(|&&frame| self.frame_number - frame < FATIGUE_WINDOW_FRAMES)
            .count();
        recent >= self.consecutive_yawns_alert
    }

    /// Estimated yawns per minute at the given frame rate.
    pub fn yawn_frequency(&self, fps: f64) -> f64 {
        if fps <= 0.0 || (self.frame_number as f64) < fps {
            // Need at least a second of footage.
            return 0.0;
        }
        let minutes = self.frame_number as f64 / (fps * 60.0);
        self.total_yawns as f64 / minutes
    }

    pub fn total_yawns(&self) -> u64 {
        self.total_yawns
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Restore the detector to its freshly constructed state.
    pub fn reset(&mut self) {
        self.yawn_frame_count = 0;
        self.total_yawns = 0;
        self.is_yawning = false;
        self.recent_yawns.clear();
        self.frame_number = 0;
        info!("yawn detector reset");
    }
}
