//! Iterative perspective-n-point solve.
//!
//! Levenberg-Marquardt refinement of an axis-angle rotation plus
//! translation against the 2D reprojection error, seeded from a
//! centroid/span heuristic. Returns `None` instead of erroring: pose is
//! advisory and the caller substitutes a neutral estimate.

use nalgebra::{DMatrix, DVector, Matrix3, Rotation3, Vector2, Vector3};
use std::f64::consts::PI;

const MAX_ITERATIONS: usize = 100;
const COST_EPS: f64 = 1e-10;
const STEP_EPS: f64 = 1e-12;
/// Points must project from strictly in front of the camera.
const MIN_DEPTH: f64 = 1e-6;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e8;

/// Recovered rigid transform from model space to camera space.
#[derive(Debug, Clone)]
pub struct PnpSolution {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

/// Solve for the pose relating 3D reference points to their 2D projections.
///
/// `intrinsics` is the 3x3 projection matrix (zero distortion assumed).
/// Fails on degenerate correspondences or non-convergent refinement.
pub fn solve_pnp(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    intrinsics: &Matrix3<f64>,
) -> Option<PnpSolution> {
    if object.len() != image.len() || object.len() < 4 {
        return None;
    }
    if image.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }

    let mut best: Option<(f64, DVector<f64>)> = None;
    for seed in initial_guesses(object, image, intrinsics)? {
        if let Some((cost, params)) = refine(object, image, intrinsics, seed) {
            if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                best = Some((cost, params));
            }
        }
    }

    let (cost, params) = best?;
    if !cost.is_finite() {
        return None;
    }

    let rvec = Vector3::new(params[0], params[1], params[2]);
    Some(PnpSolution {
        rotation: *Rotation3::from_scaled_axis(rvec).matrix(),
        translation: Vector3::new(params[3], params[4], params[5]),
    })
}

/// Translation from the centroid/span ratio; two rotation seeds.
///
/// A face observed through a y-down image plane often sits near a
/// half-turn about the camera x axis, so both hemispheres are seeded and
/// the lower-cost refinement wins.
fn initial_guesses(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    intrinsics: &Matrix3<f64>,
) -> Option<Vec<DVector<f64>>> {
    let n = object.len() as f64;
    let fx = intrinsics[(0, 0)];
    let fy = intrinsics[(1, 1)];
    let cx = intrinsics[(0, 2)];
    let cy = intrinsics[(1, 2)];

    let obj_centroid: Vector3<f64> = object.iter().sum::<Vector3<f64>>() / n;
    let img_centroid: Vector2<f64> = image.iter().sum::<Vector2<f64>>() / n;

    let obj_span: f64 = object
        .iter()
        .map(|p| (p - obj_centroid).xy().norm())
        .sum::<f64>()
        / n;
    let img_span: f64 = image.iter().map(|p| (p - img_centroid).norm()).sum::<f64>() / n;

    if obj_span < 1e-9 || img_span < 1e-9 || fx.abs() < 1e-9 || fy.abs() < 1e-9 {
        return None;
    }

    let tz = fx * obj_span / img_span;
    let tx = (img_centroid.x - cx) * tz / fx;
    let ty = (img_centroid.y - cy) * tz / fy;

    Some(vec![
        DVector::from_vec(vec![0.0, 0.0, 0.0, tx, ty, tz]),
        DVector::from_vec(vec![PI, 0.0, 0.0, tx, ty, tz]),
    ])
}

/// Reprojection residuals for the packed [rvec, tvec] parameters.
fn residuals(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    intrinsics: &Matrix3<f64>,
    params: &DVector<f64>,
) -> Option<DVector<f64>> {
    let rotation = Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2]));
    let translation = Vector3::new(params[3], params[4], params[5]);

    let fx = intrinsics[(0, 0)];
    let fy = intrinsics[(1, 1)];
    let cx = intrinsics[(0, 2)];
    let cy = intrinsics[(1, 2)];

    let mut r = DVector::zeros(2 * object.len());
    for (i, (obj, img)) in object.iter().zip(image).enumerate() {
        let cam = rotation * obj + translation;
        if cam.z <= MIN_DEPTH {
            return None;
        }
        r[2 * i] = fx * cam.x / cam.z + cx - img.x;
        r[2 * i + 1] = fy * cam.y / cam.z + cy - img.y;
    }
    Some(r)
}

fn refine(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    intrinsics: &Matrix3<f64>,
    mut params: DVector<f64>,
) -> Option<(f64, DVector<f64>)> {
    let mut residual = residuals(object, image, intrinsics, &params)?;
    let mut cost = residual.norm_squared();
    let mut lambda = LAMBDA_INIT;

    for _ in 0..MAX_ITERATIONS {
        if cost < COST_EPS {
            break;
        }

        let jacobian = numeric_jacobian(object, image, intrinsics, &params)?;
        let jt = jacobian.transpose();
        let hessian = &jt * &jacobian;
        let gradient = &jt * &residual;

        let mut stepped = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = hessian.clone();
            for d in 0..6 {
                damped[(d, d)] += lambda * damped[(d, d)].max(1e-12);
            }

            let Some(delta) = damped.lu().solve(&(-&gradient)) else {
                lambda *= 10.0;
                continue;
            };

            let candidate = &params + &delta;
            if let Some(candidate_residual) = residuals(object, image, intrinsics, &candidate) {
                let candidate_cost = candidate_residual.norm_squared();
                if candidate_cost < cost {
                    let step_size = delta.norm();
                    params = candidate;
                    residual = candidate_residual;
                    cost = candidate_cost;
                    lambda = (lambda * 0.5).max(1e-12);
                    stepped = true;
                    if step_size < STEP_EPS {
                        return Some((cost, params));
                    }
                    break;
                }
            }
            lambda *= 10.0;
        }

        if !stepped {
            break;
        }
    }

    cost.is_finite().then_some((cost, params))
}

fn numeric_jacobian(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    intrinsics: &Matrix3<f64>,
    params: &DVector<f64>,
) -> Option<DMatrix<f64>> {
    let rows = 2 * object.len();
    let mut jacobian = DMatrix::zeros(rows, 6);

    for col in 0..6 {
        let step = 1e-6 * params[col].abs().max(1.0);

        let mut plus = params.clone();
        plus[col] += step;
        let mut minus = params.clone();
        minus[col] -= step;

        let rp = residuals(object, image, intrinsics, &plus)?;
        let rm = residuals(object, image, intrinsics, &minus)?;

        for row in 0..rows {
            jacobian[(row, col)] = (rp[row] - rm[row]) / (2.0 * step);
        }
    }
    Some(jacobian)
}
