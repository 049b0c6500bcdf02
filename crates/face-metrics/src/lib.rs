//! Facial landmark data model and per-signal trackers.
//!
//! Works on the 68-point landmark layout produced by an external detector:
//! - Eye Aspect Ratio (EAR) for blink and eye-closure tracking
//! - Mouth Aspect Ratio (MAR) for yawn detection and fatigue patterns
//!
//! The detector itself is out of scope; this crate consumes its output.

pub mod eye;
pub mod geometry;
pub mod mouth;

pub use eye::{EarTrend, EyeMetrics, EyeTracker};
pub use geometry::{eye_aspect_ratio, mouth_aspect_ratio};
pub use mouth::{YawnDetector, YawnMetrics};

use serde::{Deserialize, Serialize};

/// Number of points in the landmark layout.
pub const LANDMARK_COUNT: usize = 68;

/// A 2D landmark point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Index ranges of the facial feature regions in the 68-point layout.
pub mod regions {
    use std::ops::Range;

    pub const JAW: Range<usize> = 0..17;
    pub const RIGHT_EYEBROW: Range<usize> = 17..22;
    pub const LEFT_EYEBROW: Range<usize> = 22..27;
    pub const NOSE: Range<usize> = 27..36;
    pub const RIGHT_EYE: Range<usize> = 36..42;
    pub const LEFT_EYE: Range<usize> = 42..48;
    pub const OUTER_MOUTH: Range<usize> = 48..60;
    pub const INNER_MOUTH: Range<usize> = 60..68;
}

/// One frame's worth of facial landmarks.
///
/// Produced by the external detector, consumed read-only. Absence of a face
/// is represented by `Option<LandmarkSet>` at the call sites, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Point2; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Point2; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from a slice; returns `None` unless exactly 68 points are given.
    pub fn from_slice(points: &[Point2]) -> Option<Self> {
        let points: [Point2; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    pub fn points(&self) -> &[Point2; LANDMARK_COUNT] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Point2 {
        self.points[index]
    }

    /// Six left-eye points (subject's left).
    pub fn left_eye(&self) -> [Point2; 6] {
        let mut eye = [Point2::default(); 6];
        for (slot, idx) in eye.iter_mut().zip(regions::LEFT_EYE) {
            *slot = self.points[idx];
        }
        eye
    }

    /// Six right-eye points (subject's right).
    pub fn right_eye(&self) -> [Point2; 6] {
        let mut eye = [Point2::default(); 6];
        for (slot, idx) in eye.iter_mut().zip(regions::RIGHT_EYE) {
            *slot = self.points[idx];
        }
        eye
    }

    /// Combined mouth landmarks: 12 outer points followed by 8 inner points.
    pub fn mouth(&self) -> [Point2; 20] {
        let mut mouth = [Point2::default(); 20];
        for (slot, idx) in mouth
            .iter_mut()
            .zip(regions::OUTER_MOUTH.chain(regions::INNER_MOUTH))
        {
            *slot = self.points[idx];
        }
        mouth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_set() -> LandmarkSet {
        let mut points = [Point2::default(); LANDMARK_COUNT];
        for (i, p) in points.iter_mut().enumerate() {
            *p = Point2::new(i as f64, i as f64 * 2.0);
        }
        LandmarkSet::new(points)
    }

    #[test]
    fn test_from_slice_requires_exact_count() {
        let points = vec![Point2::default(); LANDMARK_COUNT];
        assert!(LandmarkSet::from_slice(&points).is_some());
        assert!(LandmarkSet::from_slice(&points[..67]).is_none());
    }

    #[test]
    fn test_eye_subsets_use_expected_indices() {
        let set = numbered_set();

        let right = set.right_eye();
        assert_eq!(right[0].x, 36.0);
        assert_eq!(right[5].x, 41.0);

        let left = set.left_eye();
        assert_eq!(left[0].x, 42.0);
        assert_eq!(left[5].x, 47.0);
    }

    #[test]
    fn test_mouth_stacks_outer_then_inner() {
        let set = numbered_set();
        let mouth = set.mouth();

        assert_eq!(mouth.len(), 20);
        assert_eq!(mouth[0].x, 48.0);
        assert_eq!(mouth[11].x, 59.0);
        assert_eq!(mouth[12].x, 60.0);
        assert_eq!(mouth[19].x, 67.0);
    }

    #[test]
    fn test_point_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }
}
