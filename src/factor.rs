//! General structure-from-motion factor.
//!
//! A binary factor relating a camera variable (pose and calibration
//! optimized jointly) and a 3D landmark through a fixed 2D image
//! measurement. Evaluation is a pure function of the variable values the
//! caller passes in; the factor itself is immutable and carries no state
//! machine, so a concurrent optimizer may evaluate every factor of a graph
//! in parallel against read-only snapshots.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use nalgebra::{DMatrix, Matrix2x3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::camera::SfmCamera;
use crate::error::{SfmError, SfmResult};
use crate::key::Key;
use crate::noise::NoiseModel;

/// Current on-disk format version of [`MeasurementRecord`].
pub const MEASUREMENT_FORMAT_VERSION: u32 = 1;

/// Versioned serialized form of a factor's measurement.
///
/// The record covers exactly the 2D measurement; keys and the noise model
/// are serialized by the surrounding graph layer and supplied again on
/// restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub version: u32,
    pub u: f64,
    pub v: f64,
}

/// Output of [`GeneralSfmFactor::evaluate_error`].
///
/// Jacobian blocks are present exactly when requested; column counts are
/// `camera.dof()` for the camera block and 3 for the landmark block, matching
/// the ordering the optimizer assembles its linear system in.
#[derive(Debug, Clone)]
pub struct SfmEvaluation {
    /// Residual: predicted projection minus measurement, in pixels.
    pub residual: Vector2<f64>,
    /// ∂residual/∂(camera tangent), 2×Dc.
    pub jacobian_camera: Option<DMatrix<f64>>,
    /// ∂residual/∂landmark, 2×3.
    pub jacobian_landmark: Option<Matrix2x3<f64>>,
}

/// Reprojection factor with an unknown, jointly optimized camera.
///
/// Binds a camera key and a landmark key to one observed 2D image point.
/// The camera parameterization is opaque behind [`SfmCamera`]; the factor
/// forwards whatever Jacobians the projection produces, since the constant
/// measurement offset does not change derivatives in the flat image plane.
#[derive(Clone)]
pub struct GeneralSfmFactor<C: SfmCamera> {
    measured: Vector2<f64>,
    noise: Arc<dyn NoiseModel>,
    camera_key: Key,
    landmark_key: Key,
    _camera: PhantomData<C>,
}

impl<C: SfmCamera> GeneralSfmFactor<C> {
    /// Residual dimension, fixed by the 2D measurement.
    pub const DIM: usize = 2;

    /// Create a factor from an observed image point, a shared noise model,
    /// and the keys of the two variables it constrains.
    ///
    /// Fails immediately when the noise model is not 2-dimensional; the
    /// mismatch is never deferred to evaluation.
    pub fn new(
        measured: Vector2<f64>,
        noise: Arc<dyn NoiseModel>,
        camera_key: Key,
        landmark_key: Key,
    ) -> SfmResult<Self> {
        if noise.dim() != Self::DIM {
            return Err(SfmError::NoiseDimensionMismatch {
                expected: Self::DIM,
                actual: noise.dim(),
            });
        }
        Ok(GeneralSfmFactor {
            measured,
            noise,
            camera_key,
            landmark_key,
            _camera: PhantomData,
        })
    }

    /// Restore a factor from a serialized measurement record plus the
    /// outer-layer state (noise model and keys).
    pub fn from_record(
        record: &MeasurementRecord,
        noise: Arc<dyn NoiseModel>,
        camera_key: Key,
        landmark_key: Key,
    ) -> SfmResult<Self> {
        if record.version != MEASUREMENT_FORMAT_VERSION {
            return Err(SfmError::UnsupportedFormatVersion {
                found: record.version,
                expected: MEASUREMENT_FORMAT_VERSION,
            });
        }
        Self::new(
            Vector2::new(record.u, record.v),
            noise,
            camera_key,
            landmark_key,
        )
    }

    /// Serialized form of the measurement, tagged with the format version.
    pub fn to_record(&self) -> MeasurementRecord {
        MeasurementRecord {
            version: MEASUREMENT_FORMAT_VERSION,
            u: self.measured.x,
            v: self.measured.y,
        }
    }

    /// Compute the reprojection residual and the requested Jacobian blocks
    /// at the given variable estimates.
    ///
    /// The residual is the local-coordinates difference between prediction
    /// and measurement: `residual = project(camera, landmark) - measured`.
    /// Driving it to zero improves fit, and the projection Jacobians pass
    /// through unmodified because the measurement offset is constant in the
    /// flat image plane.
    ///
    /// A projection failure (landmark behind the camera, degenerate depth)
    /// surfaces as [`SfmError::Projection`] carrying both keys and the
    /// measurement. No retry, no sentinel values; robustification policy
    /// belongs to the optimizer.
    pub fn evaluate_error(
        &self,
        camera: &C,
        landmark: &Vector3<f64>,
        want_jacobian_camera: bool,
        want_jacobian_landmark: bool,
    ) -> SfmResult<SfmEvaluation> {
        let projection = camera
            .project(landmark, want_jacobian_camera, want_jacobian_landmark)
            .map_err(|source| {
                warn!(
                    camera_key = %self.camera_key,
                    landmark_key = %self.landmark_key,
                    measured_u = self.measured.x,
                    measured_v = self.measured.y,
                    error = %source,
                    "projection failed during factor evaluation"
                );
                SfmError::Projection {
                    camera_key: self.camera_key,
                    landmark_key: self.landmark_key,
                    u: self.measured.x,
                    v: self.measured.y,
                    source,
                }
            })?;

        Ok(SfmEvaluation {
            residual: projection.uv - self.measured,
            jacobian_camera: projection.jacobian_camera,
            jacobian_landmark: projection.jacobian_point,
        })
    }

    /// The observed 2D image point.
    pub fn measured(&self) -> &Vector2<f64> {
        &self.measured
    }

    /// Residual dimension (always 2).
    pub fn dim(&self) -> usize {
        Self::DIM
    }

    /// Keys of the two variables this factor constrains, camera first.
    pub fn keys(&self) -> [Key; 2] {
        [self.camera_key, self.landmark_key]
    }

    pub fn camera_key(&self) -> Key {
        self.camera_key
    }

    pub fn landmark_key(&self) -> Key {
        self.landmark_key
    }

    /// Shared noise model handle, consumed by the optimizer for whitening.
    pub fn noise_model(&self) -> &Arc<dyn NoiseModel> {
        &self.noise
    }

    /// Deterministic debug dump of keys, noise model, and measurement.
    pub fn print(&self, label: &str) -> String {
        format!(
            "{label}: GeneralSfmFactor\n  keys: [{}, {}]\n  noise: {:?}\n  measured: [{:.6}, {:.6}]",
            self.camera_key, self.landmark_key, self.noise, self.measured.x, self.measured.y
        )
    }

    /// Tolerance-based equality for testing and debugging: keys must match,
    /// noise models must agree by their own `equals`, and measurement
    /// components must differ by at most `tol`.
    pub fn equals(&self, other: &Self, tol: f64) -> bool {
        self.camera_key == other.camera_key
            && self.landmark_key == other.landmark_key
            && self.noise.equals(other.noise.as_ref(), tol)
            && (self.measured - other.measured).amax() <= tol
    }
}

impl<C: SfmCamera> fmt::Debug for GeneralSfmFactor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneralSfmFactor")
            .field("camera_key", &self.camera_key)
            .field("landmark_key", &self.landmark_key)
            .field("noise", &self.noise)
            .field("measured", &(self.measured.x, self.measured.y))
            .finish()
    }
}
