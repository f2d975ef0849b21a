//! Camera capability consumed by the SfM factor.
//!
//! The factor never looks inside a camera: it asks for a projection of a 3D
//! world point and, on request, the partial derivatives of that projection
//! with respect to the camera's own tangent space and the point coordinates.
//! Any parameterization (pose-only, pose + intrinsics, fisheye, ...) can back
//! the trait; the tangent-space dimensionality `dof()` fixes the column count
//! of the camera Jacobian the optimizer receives.

pub mod pinhole;

use std::fmt;

use nalgebra::{DMatrix, DVector, Matrix2x3, Matrix3, Vector2, Vector3};
use thiserror::Error;

/// Reasons a camera model can refuse to project a point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// The point sits behind the image plane or too close to the projection
    /// center for a stable depth division.
    #[error("point behind camera or at projection center (depth {depth:.3e})")]
    BehindCamera { depth: f64 },

    /// The point coordinates are NaN or infinite.
    #[error("point coordinates are not finite")]
    NonFinite,
}

/// Result of projecting a 3D point: the 2D prediction plus the Jacobian
/// blocks that were requested.
///
/// Jacobians that were not requested are `None` and were not computed, so
/// value-only evaluation pays no derivative cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Predicted 2D image point (u, v).
    pub uv: Vector2<f64>,
    /// ∂(u,v)/∂(camera tangent), 2×dof.
    pub jacobian_camera: Option<DMatrix<f64>>,
    /// ∂(u,v)/∂(point), 2×3.
    pub jacobian_point: Option<Matrix2x3<f64>>,
}

/// Camera parameterization the SfM factor optimizes over.
///
/// Implementations must be `Send + Sync`: a concurrent optimizer evaluates
/// factors for an entire graph in parallel against read-only snapshots.
pub trait SfmCamera: fmt::Debug + Clone + Send + Sync {
    /// Tangent-space dimensionality of the camera parameterization. Fixes
    /// the column count of the camera Jacobian.
    fn dof(&self) -> usize;

    /// Project a world point to image coordinates, computing the requested
    /// Jacobian blocks and nothing more.
    fn project(
        &self,
        p_world: &Vector3<f64>,
        want_jacobian_camera: bool,
        want_jacobian_point: bool,
    ) -> Result<Projection, ProjectionError>;

    /// Apply a tangent-space perturbation of length `dof()`.
    ///
    /// This defines the local coordinates the Jacobians are taken in; the
    /// optimizer's update step and finite-difference checks both go through
    /// it.
    fn retract(&self, delta: &DVector<f64>) -> Self;
}

/// Skew-symmetric matrix `[v]×` such that `[v]× · w = v × w`.
#[inline]
pub fn skew_symmetric(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
