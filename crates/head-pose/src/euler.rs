//! Rotation-matrix to Euler-angle decomposition.

use nalgebra::Matrix3;

/// Magnitude of the yaw component below which the decomposition is singular.
const GIMBAL_EPS: f64 = 1e-6;

/// Decompose a rotation matrix into (pitch, yaw, roll) in radians.
///
/// Convention: `R = Rz(yaw) * Ry(pitch) * Rx(roll)`. Near gimbal lock
/// (pitch approaching ±90°, where `sqrt(R00² + R10²)` vanishes) yaw and
/// roll become coupled; the reduced two-angle formula is used and yaw is
/// reported as 0.
pub fn rotation_to_euler(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let sy = (r[(0, 0)].powi(2) + r[(1, 0)].powi(2)).sqrt();

    if sy >= GIMBAL_EPS {
        let roll = r[(2, 1)].atan2(r[(2, 2)]);
        let pitch = (-r[(2, 0)]).atan2(sy);
        let yaw = r[(1, 0)].atan2(r[(0, 0)]);
        (pitch, yaw, roll)
    } else {
        let roll = (-r[(1, 2)]).atan2(r[(1, 1)]);
        let pitch = (-r[(2, 0)]).atan2(sy);
        (pitch, 0.0, roll)
    }
}

/// Same decomposition, in degrees.
pub fn rotation_to_euler_degrees(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let (pitch, yaw, roll) = rotation_to_euler(r);
    (pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;
    use std::f64::consts::FRAC_PI_2;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_identity_is_zero_angles() {
        let (pitch, yaw, roll) = rotation_to_euler(&Matrix3::identity());
        assert_close(pitch, 0.0);
        assert_close(yaw, 0.0);
        assert_close(roll, 0.0);
    }

    #[test]
    fn test_round_trip_general_rotation() {
        // nalgebra's from_euler_angles uses the same Rz * Ry * Rx convention.
        let (roll, pitch, yaw) = (0.31, -0.45, 0.72);
        let r = Rotation3::from_euler_angles(roll, pitch, yaw);

        let (p, y, rr) = rotation_to_euler(r.matrix());
        assert_close(p, pitch);
        assert_close(y, yaw);
        assert_close(rr, roll);
    }

    #[test]
    fn test_gimbal_lock_branch() {
        let r = Rotation3::from_euler_angles(0.3, FRAC_PI_2, 0.0);
        let (pitch, yaw, roll) = rotation_to_euler(r.matrix());

        assert!((pitch - FRAC_PI_2).abs() < 1e-6);
        assert_close(yaw, 0.0);
        assert!((roll - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_degrees_conversion() {
        let r = Rotation3::from_euler_angles(0.0, (-30.0f64).to_radians(), 0.0);
        let (pitch, yaw, roll) = rotation_to_euler_degrees(r.matrix());
        assert!((pitch + 30.0).abs() < 1e-9);
        assert_close(yaw, 0.0);
        assert_close(roll, 0.0);
    }
}
