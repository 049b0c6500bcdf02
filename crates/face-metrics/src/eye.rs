//! Eye-closure tracking over per-frame EAR values.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geometry::eye_aspect_ratio;
use crate::Point2;

/// Default number of EAR samples kept for the drowsiness score.
pub const DEFAULT_HISTORY_SIZE: usize = 30;

/// Per-frame eye measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeMetrics {
    pub left_ear: f64,
    pub right_ear: f64,
    pub avg_ear: f64,
    pub is_closed: bool,
    /// Consecutive frames the eyes have been closed, including this one.
    pub closure_duration_frames: u32,
}

/// Direction the recent EAR signal is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarTrend {
    Stable,
    Declining,
    Recovering,
}

/// Converts noisy per-frame EAR values into closure and blink state.
///
/// A closure shorter than the drowsy threshold counts as a blink when the
/// eyes reopen; a closure that reaches the threshold marks drowsiness for
/// as long as it persists. The threshold itself is a frame count derived
/// by the caller from a time duration and the active frame rate.
pub struct EyeTracker {
    ear_threshold: f64,
    drowsy_frames_threshold: u32,
    history: VecDeque<f64>,
    history_size: usize,
    closed_frame_count: u32,
    blink_count: u64,
    is_blinking: bool,
}

impl EyeTracker {
    pub fn new(ear_threshold: f64, drowsy_frames_threshold: u32) -> Self {
        Self::with_history_size(ear_threshold, drowsy_frames_threshold, DEFAULT_HISTORY_SIZE)
    }

    pub fn with_history_size(
        ear_threshold: f64,
        drowsy_frames_threshold: u32,
        history_size: usize,
    ) -> Self {
        info!(ear_threshold, drowsy_frames_threshold, "eye tracker initialized");
        Self {
            ear_threshold,
            drowsy_frames_threshold,
            history: VecDeque::with_capacity(history_size),
            history_size,
            closed_frame_count: 0,
            blink_count: 0,
            is_blinking: false,
        }
    }

    /// Process one frame's eye landmarks.
    pub fn process_eyes(&mut self, left_eye: &[Point2; 6], right_eye: &[Point2; 6]) -> EyeMetrics {
        let left_ear = eye_aspect_ratio(left_eye);
        let right_ear = eye_aspect_ratio(right_eye);
        let avg_ear = (left_ear + right_ear) / 2.0;

        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(avg_ear);

        let is_closed = avg_ear < self.ear_threshold;

        if is_closed {
            self.closed_frame_count += 1;
        } else {
            // Reopening after a short closure is a blink, not drowsiness.
            if self.is_blinking
                && self.closed_frame_count > 0
                && self.closed_frame_count < self.drowsy_frames_threshold
            {
                self.blink_count += 1;
                debug!(total = self.blink_count, "blink detected");
            }
            self.closed_frame_count = 0;
        }

        self.is_blinking = is_closed;

        EyeMetrics {
            left_ear,
            right_ear,
            avg_ear,
            is_closed,
            closure_duration_frames: self.closed_frame_count,
        }
    }

    /// True while the current closure has lasted at least the drowsy threshold.
    pub fn is_drowsy(&self) -> bool {
        self.closed_frame_count >= self.drowsy_frames_threshold
    }

    /// Drowsiness score in [0, 100].
    ///
    /// Half the score rewards how often the recent history sat below the
    /// threshold, the other half the length of the current closure.
    pub fn drowsiness_score(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }

        let below = self
            .history
            .iter()
            .filter(|&&ear| ear < self.ear_threshold)
            .count();
        let history_score = (below as f64 / self.history.len() as f64) * 50.0;

        let closure_factor =
            (self.closed_frame_count as f64 / self.drowsy_frames_threshold as f64).min(1.0);
        let closure_score = closure_factor * 50.0;

        (history_score + closure_score).min(100.0)
    }

    /// Compare the newest ten samples against the oldest ten.
    pub fn ear_trend(&self) -> EarTrend {
        if self.history.len() < 10 {
            return EarTrend::Stable;
        }

        let older: f64 = self.history.iter().take(10).sum::<f64>() / 10.0;
        let recent: f64 = self.history.iter().rev().take(10).sum::<f64>() / 10.0;

        let diff = recent - older;
        if diff < -0.02 {
            EarTrend::Declining
        } else if diff > 0.02 {
            EarTrend::Recovering
        } else {
            EarTrend::Stable
        }
    }

    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn closed_frame_count(&self) -> u32 {
        self.closed_frame_count
    }

    /// Restore the tracker to its freshly constructed state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.closed_frame_count = 0;
        self.blink_count = 0;
        self.is_blinking = false;
        info!("eye tracker reset");
    }
}
