//! The fusion orchestrator and session lifecycle.

use std::time::Instant;

use alerting::{AlertBackend, AlertDispatcher, AlertKind};
use camera_stream::{FrameSource, VideoFrame};
use face_metrics::{EyeTracker, LandmarkSet, YawnDetector};
use head_pose::HeadPoseEstimator;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{DetectionResult, MonitorConfig};

/// Score contribution of an active fatigue pattern.
const FATIGUE_SCORE_WEIGHT: f64 = 30.0;
/// Score contribution of a head-down pose.
const HEAD_DOWN_SCORE_WEIGHT: f64 = 20.0;

/// External face/landmark detector.
///
/// Absence of a face is a valid, frequent outcome, not an error.
pub trait LandmarkProvider: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Option<LandmarkSet>;
}

/// Session statistics, derived from the counters rather than stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStats {
    pub frames_processed: u64,
    pub elapsed_seconds: f64,
    pub avg_fps: f64,
    pub blink_count: u64,
    pub yawn_count: u64,
    pub alert_count: u64,
}

/// Per-session drowsiness orchestrator.
///
/// Fuses the eye tracker, yawn detector, and head-pose estimator into a
/// single score per processed frame and drives the alert dispatcher:
/// drowsiness overrides fatigue, both override silence.
pub struct DrowsinessMonitor {
    config: MonitorConfig,
    provider: Box<dyn LandmarkProvider>,
    eye_tracker: EyeTracker,
    yawn_detector: YawnDetector,
    head_pose: HeadPoseEstimator,
    dispatcher: AlertDispatcher,
    frame_count: u64,
    started_at: Instant,
}

impl DrowsinessMonitor {
    pub fn new(config: MonitorConfig, provider: Box<dyn LandmarkProvider>) -> Self {
        let dispatcher = AlertDispatcher::new(config.alert.clone());
        Self::build(config, provider, dispatcher)
    }

    /// Monitor with an audio backend for the alert playback tier.
    pub fn with_alert_backend(
        config: MonitorConfig,
        provider: Box<dyn LandmarkProvider>,
        backend: Box<dyn AlertBackend>,
    ) -> Self {
        let dispatcher = AlertDispatcher::with_backend(config.alert.clone(), backend);
        Self::build(config, provider, dispatcher)
    }

    fn build(
        config: MonitorConfig,
        provider: Box<dyn LandmarkProvider>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        info!("initializing drowsiness monitor");

        let eye_tracker = EyeTracker::new(config.ear_threshold, config.drowsy_frames_threshold());
        let yawn_detector = YawnDetector::new(
            config.mar_threshold,
            config.min_yawn_frames,
            config.yawn_consecutive_threshold,
        );
        let head_pose = HeadPoseEstimator::new(
            config.pitch_threshold,
            config.roll_threshold,
            config.camera.width,
            config.camera.height,
        );

        Self {
            config,
            provider,
            eye_tracker,
            yawn_detector,
            head_pose,
            dispatcher,
            frame_count: 0,
            started_at: Instant::now(),
        }
    }

    /// Process a single frame.
    pub fn process_frame(&mut self, frame: &VideoFrame) -> DetectionResult {
        let frame_start = Instant::now();
        self.frame_count += 1;

        let mut result = DetectionResult::default();

        let Some(landmarks) = self.provider.detect(frame) else {
            // Face absence is not an alert condition; leave everything
            // neutral and keep whatever alert state already exists.
            result.processing_time_ms = frame_start.elapsed().as_secs_f64() * 1000.0;
            return result;
        };
        result.face_detected = true;

        let eye_metrics = self
            .eye_tracker
            .process_eyes(&landmarks.left_eye(), &landmarks.right_eye());
        result.ear = eye_metrics.avg_ear;
        result.left_ear = eye_metrics.left_ear;
        result.right_ear = eye_metrics.right_ear;
        result.eyes_closed = eye_metrics.is_closed;
        result.blink_count = self.eye_tracker.blink_count();

        let yawn_metrics = self.yawn_detector.process_mouth(&landmarks.mouth());
        result.mar = yawn_metrics.mar;
        result.is_yawning = yawn_metrics.is_yawning;
        result.yawn_count = yawn_metrics.total_yawns;

        let pose = self
            .head_pose
            .estimate_pose(&landmarks, Some(frame.dimensions()));
        result.pitch = pose.pitch;
        result.yaw = pose.yaw;
        result.roll = pose.roll;
        result.head_down = pose.is_head_down;
        result.head_tilted = pose.is_head_tilted;

        // Fusion: eye closure carries the score; yawn bursts and a
        // drooping head add fixed contributions, capped at 100.
        let eye_score = self.eye_tracker.drowsiness_score();
        let fatigued = self.yawn_detector.is_fatigue_indicated();
        let fatigue_score = if fatigued { FATIGUE_SCORE_WEIGHT } else { 0.0 };
        let head_score = if pose.is_head_down {
            HEAD_DOWN_SCORE_WEIGHT
        } else {
            0.0
        };

        result.drowsiness_score = (eye_score + fatigue_score + head_score).min(100.0);
        result.is_drowsy = self.eye_tracker.is_drowsy() || pose.is_head_down;
        result.is_fatigued = fatigued;

        // Alert policy: drowsy overrides fatigue; both override silence.
        if result.is_drowsy {
            self.dispatcher.trigger(AlertKind::Drowsiness);
        } else if result.is_fatigued {
            self.dispatcher.trigger(AlertKind::Fatigue);
        } else if !result.eyes_closed && !result.is_yawning {
            self.dispatcher.stop();
        }

        result.processing_time_ms = frame_start.elapsed().as_secs_f64() * 1000.0;
        result
    }

    /// Pull the newest captured frame and process it; `None` when the
    /// source has nothing yet.
    pub fn process_latest(&mut self, source: &FrameSource) -> Option<DetectionResult> {
        let frame = source.latest()?;
        Some(self.process_frame(&frame))
    }

    pub fn is_alerting(&self) -> bool {
        self.dispatcher.is_alerting()
    }

    /// Whether the embedding UI should render a visual alert this frame.
    pub fn should_show_visual(&self) -> bool {
        self.dispatcher.should_show_visual()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn stats(&self) -> MonitorStats {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        MonitorStats {
            frames_processed: self.frame_count,
            elapsed_seconds: elapsed,
            avg_fps: if elapsed > 0.0 {
                self.frame_count as f64 / elapsed
            } else {
                0.0
            },
            blink_count: self.eye_tracker.blink_count(),
            yawn_count: self.yawn_detector.total_yawns(),
            alert_count: self.dispatcher.alert_count(),
        }
    }

    /// Reset all per-session tracking state.
    pub fn reset(&mut self) {
        self.eye_tracker.reset();
        self.yawn_detector.reset();
        self.dispatcher.reset();
        self.frame_count = 0;
        self.started_at = Instant::now();
        info!("monitor reset");
    }

    /// Release the dispatcher's resources.
    pub fn cleanup(&mut self) {
        self.dispatcher.cleanup();
        info!("monitor cleaned up");
    }
}
