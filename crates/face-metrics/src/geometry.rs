//! Aspect-ratio formulas over landmark subsets.
//!
//! Both ratios share the same structure: averaged vertical point-pair
//! distances over twice the horizontal span. A zero horizontal span is
//! degenerate geometry and yields 0.0 rather than a division error.

use crate::Point2;

/// Eye Aspect Ratio for a single eye.
///
/// `EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)` where p1/p4 are the eye
/// corners, p2/p3 the upper lid, and p5/p6 the lower lid.
///
/// Low values indicate a closed eye; open eyes typically sit above ~0.2.
pub fn eye_aspect_ratio(eye: &[Point2; 6]) -> f64 {
    let vertical_a = eye[1].distance(&eye[5]);
    let vertical_b = eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);

    if horizontal == 0.0 {
        return 0.0;
    }

    (vertical_a + vertical_b) / (2.0 * horizontal)
}

/// Mouth Aspect Ratio over the combined mouth landmarks.
///
/// Expects the 12 outer points followed by the 8 inner points. The inner
/// lip contour gives the more reliable opening measurement (points 62-66
/// and 63-65 over the 60-64 corner span). When only the outer contour is
/// available the outer pairs 50-58 and 52-56 over the 48-54 span are used
/// instead.
///
/// High values indicate a wide-open mouth (potential yawn).
pub fn mouth_aspect_ratio(mouth: &[Point2]) -> f64 {
    let (vertical_a, vertical_b, horizontal) = if mouth.len() >= 20 {
        let inner = &mouth[12..];
        (
            inner[2].distance(&inner[6]),
            inner[3].distance(&inner[5]),
            inner[0].distance(&inner[4]),
        )
    } else if mouth.len() >= 12 {
        (
            mouth[2].distance(&mouth[10]),
            mouth[4].distance(&mouth[8]),
            mouth[0].distance(&mouth[6]),
        )
    } else {
        return 0.0;
    };

    if horizontal == 0.0 {
        return 0.0;
    }

    (vertical_a + vertical_b) / (2.0 * horizontal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn open_eye() -> [Point2; 6] {
        [
            Point2::new(0.0, 10.0),
            Point2::new(5.0, 5.0),
            Point2::new(15.0, 5.0),
            Point2::new(20.0, 10.0),
            Point2::new(15.0, 15.0),
            Point2::new(5.0, 15.0),
        ]
    }

    fn closed_eye() -> [Point2; 6] {
        [
            Point2::new(0.0, 10.0),
            Point2::new(5.0, 9.0),
            Point2::new(15.0, 9.0),
            Point2::new(20.0, 10.0),
            Point2::new(15.0, 11.0),
            Point2::new(5.0, 11.0),
        ]
    }

    #[test]
    fn test_ear_open_eye() {
        let ear = eye_aspect_ratio(&open_eye());
        assert!(ear > 0.2, "expected EAR > 0.2 for open eye, got {ear}");
    }

    #[test]
    fn test_ear_closed_eye() {
        let ear = eye_aspect_ratio(&closed_eye());
        assert!(ear < 0.2, "expected EAR < 0.2 for closed eye, got {ear}");
    }

    #[test]
    fn test_ear_zero_width_is_zero() {
        let degenerate = [
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 5.0),
            Point2::new(10.0, 5.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 15.0),
            Point2::new(10.0, 15.0),
        ];
        assert_eq!(eye_aspect_ratio(&degenerate), 0.0);
    }

    #[test]
    fn test_mar_prefers_inner_mouth() {
        // Outer contour wide open, inner contour closed: the inner points win.
        let mut mouth = vec![Point2::default(); 20];
        mouth[0] = Point2::new(0.0, 0.0);
        mouth[2] = Point2::new(10.0, -30.0);
        mouth[4] = Point2::new(20.0, -30.0);
        mouth[6] = Point2::new(30.0, 0.0);
        mouth[8] = Point2::new(20.0, 30.0);
        mouth[10] = Point2::new(10.0, 30.0);
        // Inner corners span 20px, verticals 2px.
        mouth[12] = Point2::new(5.0, 0.0);
        mouth[14] = Point2::new(12.0, -1.0);
        mouth[15] = Point2::new(18.0, -1.0);
        mouth[16] = Point2::new(25.0, 0.0);
        mouth[17] = Point2::new(18.0, 1.0);
        mouth[18] = Point2::new(12.0, 1.0);

        let mar = mouth_aspect_ratio(&mouth);
        assert!(mar < 0.2, "inner-mouth MAR should be small, got {mar}");
    }

    #[test]
    fn test_mar_outer_fallback() {
        let mut mouth = vec![Point2::default(); 12];
        mouth[0] = Point2::new(0.0, 0.0);
        mouth[2] = Point2::new(10.0, -20.0);
        mouth[4] = Point2::new(20.0, -20.0);
        mouth[6] = Point2::new(30.0, 0.0);
        mouth[8] = Point2::new(20.0, 20.0);
        mouth[10] = Point2::new(10.0, 20.0);

        let mar = mouth_aspect_ratio(&mouth);
        // Verticals are 40px each over a 30px span: (40 + 40) / 60.
        assert!((mar - 80.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_mar_zero_width_is_zero() {
        let mouth = vec![Point2::new(5.0, 5.0); 20];
        assert_eq!(mouth_aspect_ratio(&mouth), 0.0);

        let outer_only = vec![Point2::new(5.0, 5.0); 12];
        assert_eq!(mouth_aspect_ratio(&outer_only), 0.0);
    }

    #[test]
    fn test_mar_too_few_points_is_zero() {
        let mouth = vec![Point2::new(1.0, 2.0); 5];
        assert_eq!(mouth_aspect_ratio(&mouth), 0.0);
    }

    proptest! {
        #[test]
        fn prop_ear_translation_invariant(dx in -500.0f64..500.0, dy in -500.0f64..500.0) {
            let base = open_eye();
            let translated: Vec<Point2> = base
                .iter()
                .map(|p| Point2::new(p.x + dx, p.y + dy))
                .collect();
            let translated: [Point2; 6] = translated.try_into().unwrap();

            let diff = (eye_aspect_ratio(&base) - eye_aspect_ratio(&translated)).abs();
            prop_assert!(diff < 1e-9);
        }

        #[test]
        fn prop_ear_finite_for_arbitrary_geometry(
            xs in proptest::array::uniform6(-1000.0f64..1000.0),
            ys in proptest::array::uniform6(-1000.0f64..1000.0),
        ) {
            let mut eye = [Point2::default(); 6];
            for i in 0..6 {
                eye[i] = Point2::new(xs[i], ys[i]);
            }
            let ear = eye_aspect_ratio(&eye);
            prop_assert!(ear.is_finite());
            prop_assert!(ear >= 0.0);
        }
    }
}
