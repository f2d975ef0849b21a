//! Pinhole camera with jointly optimized pose and calibration.
//!
//! The camera variable of a general SfM problem: a world-to-camera rigid
//! transform plus the four pinhole intrinsics (fx, fy, cx, cy), giving a
//! 10-dimensional tangent space. Projection of a world point p:
//!
//! ```text
//! p_cam = R · p + t
//! u = fx · (x/z) + cx
//! v = fy · (y/z) + cy
//! ```
//!
//! Jacobians use the right-perturbation convention
//! `pose' = pose ∘ Exp([δρ; δθ])`, i.e. `R' = R·Exp(δθ)`, `t' = t + R·δρ`:
//!
//! ```text
//! ∂p_cam/∂δρ = R          ∂p_cam/∂δθ = -R·[p]×        ∂p_cam/∂p = R
//! ```
//!
//! chained with the perspective-division Jacobian
//! `∂(u,v)/∂p_cam = [[fx/z, 0, -fx·x/z²], [0, fy/z, -fy·y/z²]]`.

use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix2x3, Matrix2x4, Point3, Translation3, UnitQuaternion,
    Vector2, Vector3,
};

use super::{skew_symmetric, Projection, ProjectionError, SfmCamera};

/// Minimum depth for a stable perspective division.
const MIN_DEPTH: f64 = 1e-6;

/// Pinhole camera with unknown calibration: world-to-camera pose plus
/// (fx, fy, cx, cy) intrinsics, optimized jointly.
#[derive(Debug, Clone, PartialEq)]
pub struct PinholeSfmCamera {
    /// World-to-camera transform: `p_cam = pose * p_world`.
    pub pose: Isometry3<f64>,
    /// Focal length in x (pixels).
    pub fx: f64,
    /// Focal length in y (pixels).
    pub fy: f64,
    /// Principal point x (pixels).
    pub cx: f64,
    /// Principal point y (pixels).
    pub cy: f64,
}

impl PinholeSfmCamera {
    /// Tangent-space dimensionality: 6 pose + 4 intrinsics.
    pub const DOF: usize = 10;

    pub fn new(pose: Isometry3<f64>, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        PinholeSfmCamera {
            pose,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// Intrinsics as a vector [fx, fy, cx, cy].
    pub fn intrinsics(&self) -> [f64; 4] {
        [self.fx, self.fy, self.cx, self.cy]
    }

    fn pixel(&self, p_cam: &Point3<f64>) -> Vector2<f64> {
        let inv_z = 1.0 / p_cam.z;
        Vector2::new(
            self.fx * p_cam.x * inv_z + self.cx,
            self.fy * p_cam.y * inv_z + self.cy,
        )
    }

    /// ∂(u,v)/∂p_cam at a camera-frame point.
    fn perspective_jacobian(&self, p_cam: &Point3<f64>) -> Matrix2x3<f64> {
        let inv_z = 1.0 / p_cam.z;
        let x_norm = p_cam.x * inv_z;
        let y_norm = p_cam.y * inv_z;
        Matrix2x3::new(
            self.fx * inv_z,
            0.0,
            -self.fx * x_norm * inv_z,
            0.0,
            self.fy * inv_z,
            -self.fy * y_norm * inv_z,
        )
    }

    /// ∂(u,v)/∂(fx, fy, cx, cy) at a camera-frame point.
    fn intrinsic_jacobian(&self, p_cam: &Point3<f64>) -> Matrix2x4<f64> {
        let inv_z = 1.0 / p_cam.z;
        let x_norm = p_cam.x * inv_z;
        let y_norm = p_cam.y * inv_z;
        Matrix2x4::new(x_norm, 0.0, 1.0, 0.0, 0.0, y_norm, 0.0, 1.0)
    }
}

impl SfmCamera for PinholeSfmCamera {
    fn dof(&self) -> usize {
        Self::DOF
    }

    fn project(
        &self,
        p_world: &Vector3<f64>,
        want_jacobian_camera: bool,
        want_jacobian_point: bool,
    ) -> Result<Projection, ProjectionError> {
        if !p_world.iter().all(|c| c.is_finite()) {
            return Err(ProjectionError::NonFinite);
        }

        let p_cam = self.pose.transform_point(&Point3::from(*p_world));
        if p_cam.z < MIN_DEPTH {
            return Err(ProjectionError::BehindCamera { depth: p_cam.z });
        }

        let uv = self.pixel(&p_cam);

        let mut jacobian_camera = None;
        let mut jacobian_point = None;

        if want_jacobian_camera || want_jacobian_point {
            let rotation = *self.pose.rotation.to_rotation_matrix().matrix();
            // ∂(u,v)/∂p_world = ∂(u,v)/∂p_cam · R, which doubles as ∂/∂δρ.
            let j_world = self.perspective_jacobian(&p_cam) * rotation;

            if want_jacobian_point {
                jacobian_point = Some(j_world);
            }

            if want_jacobian_camera {
                let mut jac = DMatrix::zeros(2, Self::DOF);
                jac.fixed_view_mut::<2, 3>(0, 0).copy_from(&j_world);
                jac.fixed_view_mut::<2, 3>(0, 3)
                    .copy_from(&(-(j_world * skew_symmetric(p_world))));
                jac.fixed_view_mut::<2, 4>(0, 6)
                    .copy_from(&self.intrinsic_jacobian(&p_cam));
                jacobian_camera = Some(jac);
            }
        }

        Ok(Projection {
            uv,
            jacobian_camera,
            jacobian_point,
        })
    }

    fn retract(&self, delta: &DVector<f64>) -> Self {
        assert_eq!(
            delta.len(),
            Self::DOF,
            "pinhole camera retract expects a {}-dim tangent vector, got {}",
            Self::DOF,
            delta.len()
        );

        let rho = Vector3::new(delta[0], delta[1], delta[2]);
        let theta = Vector3::new(delta[3], delta[4], delta[5]);

        let rotation = self.pose.rotation * UnitQuaternion::from_scaled_axis(theta);
        let translation = self.pose.translation.vector + self.pose.rotation * rho;

        PinholeSfmCamera {
            pose: Isometry3::from_parts(Translation3::from(translation), rotation),
            fx: self.fx + delta[6],
            fy: self.fy + delta[7],
            cx: self.cx + delta[8],
            cy: self.cy + delta[9],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> PinholeSfmCamera {
        PinholeSfmCamera::new(Isometry3::identity(), 500.0, 500.0, 320.0, 240.0)
    }

    fn assert_approx_eq(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "values {} and {} differ by more than {}",
            a,
            b,
            eps
        );
    }

    #[test]
    fn test_projection_at_optical_axis() {
        let camera = test_camera();
        let projection = camera
            .project(&Vector3::new(0.0, 0.0, 1.0), false, false)
            .unwrap();
        assert_approx_eq(projection.uv.x, 320.0, 1e-12);
        assert_approx_eq(projection.uv.y, 240.0, 1e-12);
        assert!(projection.jacobian_camera.is_none());
        assert!(projection.jacobian_point.is_none());
    }

    #[test]
    fn test_projection_off_axis() {
        let camera = test_camera();
        let projection = camera
            .project(&Vector3::new(0.1, 0.2, 1.0), false, false)
            .unwrap();
        assert_approx_eq(projection.uv.x, 370.0, 1e-12);
        assert_approx_eq(projection.uv.y, 340.0, 1e-12);
    }

    #[test]
    fn test_projection_behind_camera() {
        let camera = test_camera();
        let result = camera.project(&Vector3::new(0.0, 0.0, -1.0), false, false);
        assert!(matches!(
            result,
            Err(ProjectionError::BehindCamera { depth }) if depth < 0.0
        ));
    }

    #[test]
    fn test_projection_rejects_non_finite_point() {
        let camera = test_camera();
        let result = camera.project(&Vector3::new(f64::NAN, 0.0, 1.0), false, false);
        assert_eq!(result, Err(ProjectionError::NonFinite));
    }

    #[test]
    fn test_projection_with_rotated_pose() {
        // Camera translated back 2m along z, looking at the origin region.
        let pose = Isometry3::new(
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.05, 0.0),
        );
        let camera = PinholeSfmCamera::new(pose, 500.0, 500.0, 320.0, 240.0);

        let p_world = Vector3::new(0.3, -0.2, 1.0);
        let p_cam = pose.transform_point(&Point3::from(p_world));
        let projection = camera.project(&p_world, false, false).unwrap();

        assert_approx_eq(
            projection.uv.x,
            500.0 * p_cam.x / p_cam.z + 320.0,
            1e-10,
        );
        assert_approx_eq(
            projection.uv.y,
            500.0 * p_cam.y / p_cam.z + 240.0,
            1e-10,
        );
    }

    #[test]
    fn test_retract_identity_is_noop() {
        let camera = test_camera();
        let retracted = camera.retract(&DVector::zeros(PinholeSfmCamera::DOF));
        assert!((retracted.pose.translation.vector - camera.pose.translation.vector).norm() < 1e-15);
        assert_eq!(retracted.intrinsics(), camera.intrinsics());
    }

    #[test]
    fn test_camera_jacobian_matches_finite_differences() {
        let pose = Isometry3::new(Vector3::new(0.1, -0.2, 0.3), Vector3::new(0.1, 0.2, -0.1));
        let camera = PinholeSfmCamera::new(pose, 480.0, 520.0, 310.0, 245.0);
        let p_world = Vector3::new(0.4, -0.3, 2.5);

        let projection = camera.project(&p_world, true, false).unwrap();
        let analytic = projection.jacobian_camera.unwrap();

        let eps = 1e-6;
        for i in 0..PinholeSfmCamera::DOF {
            let mut delta = DVector::zeros(PinholeSfmCamera::DOF);
            delta[i] = eps;
            let plus = camera.retract(&delta).project(&p_world, false, false).unwrap();
            delta[i] = -eps;
            let minus = camera.retract(&delta).project(&p_world, false, false).unwrap();

            let numerical = (plus.uv - minus.uv) / (2.0 * eps);
            for r in 0..2 {
                let diff = (analytic[(r, i)] - numerical[r]).abs();
                let scale = analytic[(r, i)].abs().max(numerical[r].abs()).max(1.0);
                assert!(
                    diff < 1e-6 * scale,
                    "camera Jacobian mismatch at ({}, {}): analytic={}, numerical={}",
                    r,
                    i,
                    analytic[(r, i)],
                    numerical[r]
                );
            }
        }
    }

    #[test]
    fn test_point_jacobian_matches_finite_differences() {
        let pose = Isometry3::new(Vector3::new(-0.3, 0.1, 0.2), Vector3::new(-0.05, 0.1, 0.2));
        let camera = PinholeSfmCamera::new(pose, 500.0, 500.0, 320.0, 240.0);
        let p_world = Vector3::new(-0.2, 0.5, 3.0);

        let projection = camera.project(&p_world, false, true).unwrap();
        let analytic = projection.jacobian_point.unwrap();

        let eps = 1e-6;
        for i in 0..3 {
            let mut plus = p_world;
            let mut minus = p_world;
            plus[i] += eps;
            minus[i] -= eps;

            let uv_plus = camera.project(&plus, false, false).unwrap().uv;
            let uv_minus = camera.project(&minus, false, false).unwrap().uv;
            let numerical = (uv_plus - uv_minus) / (2.0 * eps);

            for r in 0..2 {
                let diff = (analytic[(r, i)] - numerical[r]).abs();
                let scale = analytic[(r, i)].abs().max(numerical[r].abs()).max(1.0);
                assert!(
                    diff < 1e-6 * scale,
                    "point Jacobian mismatch at ({}, {}): analytic={}, numerical={}",
                    r,
                    i,
                    analytic[(r, i)],
                    numerical[r]
                );
            }
        }
    }
}
