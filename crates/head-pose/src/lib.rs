//! Head pose estimation from facial landmarks.
//!
//! Recovers pitch/yaw/roll by solving the perspective-n-point problem
//! between six fixed anthropometric 3D reference points and their 2D
//! landmark correspondences, using a synthetic camera matrix derived from
//! the frame dimensions. Pose is advisory: solve failures produce a
//! neutral zeroed estimate, never an error.

pub mod euler;
pub mod pnp;

pub use pnp::{solve_pnp, PnpSolution};

use face_metrics::LandmarkSet;
use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 3D reference points of a generic face, in millimetres, face-centered:
/// nose tip, chin, left/right eye outer corner, left/right mouth corner.
/// From anthropometric data.
pub const MODEL_POINTS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -330.0, -65.0],
    [-225.0, 170.0, -135.0],
    [225.0, 170.0, -135.0],
    [-150.0, -150.0, -125.0],
    [150.0, -150.0, -125.0],
];

/// Indices of the corresponding points in the 68-point landmark layout.
pub const POSE_LANDMARK_INDICES: [usize; 6] = [30, 8, 36, 45, 48, 54];

/// Per-frame head orientation, recomputed from scratch every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseMetrics {
    /// Up/down rotation (nodding), degrees.
    pub pitch: f64,
    /// Left/right rotation, degrees.
    pub yaw: f64,
    /// Tilt (ear toward shoulder), degrees.
    pub roll: f64,
    pub is_head_down: bool,
    pub is_head_tilted: bool,
}

/// Head pose estimator over 2D-3D point correspondences.
///
/// The camera matrix approximates a webcam: focal length equal to the
/// frame width, principal point at the frame center, zero lens distortion.
/// It is recomputed whenever the frame dimensions change.
pub struct HeadPoseEstimator {
    pitch_threshold: f64,
    roll_threshold: f64,
    frame_width: u32,
    frame_height: u32,
    intrinsics: Matrix3<f64>,
}

impl HeadPoseEstimator {
    pub fn new(pitch_threshold: f64, roll_threshold: f64, frame_width: u32, frame_height: u32) -> Self {
        info!(
            pitch_threshold,
            roll_threshold, "head pose estimator initialized"
        );
        Self {
            pitch_threshold,
            roll_threshold,
            frame_width,
            frame_height,
            intrinsics: Self::intrinsics_for(frame_width, frame_height),
        }
    }

    fn intrinsics_for(width: u32, height: u32) -> Matrix3<f64> {
        let focal = f64::from(width);
        let cx = f64::from(width) / 2.0;
        let cy = f64::from(height) / 2.0;
        Matrix3::new(focal, 0.0, cx, 0.0, focal, cy, 0.0, 0.0, 1.0)
    }

    /// Recompute the camera matrix if the frame size changed.
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        if width != self.frame_width || height != self.frame_height {
            self.frame_width = width;
            self.frame_height = height;
            self.intrinsics = Self::intrinsics_for(width, height);
        }
    }

    /// Estimate head pose for one frame's landmarks.
    ///
    /// `frame_size` is (width, height); pass it when it may differ from the
    /// configured dimensions. On solve failure the estimate is zeroed with
    /// both flags false.
    pub fn estimate_pose(
        &mut self,
        landmarks: &LandmarkSet,
        frame_size: Option<(u32, u32)>,
    ) -> PoseMetrics {
        if let Some((width, height)) = frame_size {
            self.set_frame_size(width, height);
        }

        let object: Vec<Vector3<f64>> = MODEL_POINTS
            .iter()
            .map(|&[x, y, z]| Vector3::new(x, y, z))
            .collect();
        let image: Vec<Vector2<f64>> = POSE_LANDMARK_INDICES
            .iter()
            .map(|&idx| {
                let p = landmarks.point(idx);
                Vector2::new(p.x, p.y)
            })
            .collect();

        let Some(solution) = solve_pnp(&object, &image, &self.intrinsics) else {
            warn!("pose solve failed, returning neutral estimate");
            return PoseMetrics::default();
        };

        let (pitch, yaw, roll) = euler::rotation_to_euler_degrees(&solution.rotation);

        PoseMetrics {
            pitch,
            yaw,
            roll,
            is_head_down: pitch < -self.pitch_threshold,
            is_head_tilted: roll.abs() > self.roll_threshold,
        }
    }
}
