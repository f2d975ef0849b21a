//! Error types for the sfm-factors library.
//!
//! All errors use the `thiserror` crate for automatic trait implementations.
//! Projection failures carry the offending key pair and measurement so an
//! aborted optimization run can report which observation broke it.

use thiserror::Error;

use crate::camera::ProjectionError;
use crate::key::Key;

/// Main result type used throughout the sfm-factors library.
pub type SfmResult<T> = Result<T, SfmError>;

/// Main error type for the sfm-factors library.
#[derive(Debug, Clone, Error)]
pub enum SfmError {
    /// Noise model dimensionality does not match the residual dimension.
    /// Raised at factor construction, never deferred to evaluation.
    #[error("noise model dimension {actual} does not match residual dimension {expected}")]
    NoiseDimensionMismatch { expected: usize, actual: usize },

    /// Noise model parameters are invalid (non-positive sigma).
    #[error("noise sigma must be positive, got {sigma}")]
    InvalidNoiseSigma { sigma: f64 },

    /// The camera model could not produce a valid projection for the
    /// landmark. Propagated to the optimizer, which decides whether to skip
    /// the factor, apply a robust kernel, or abort the run.
    #[error(
        "projection failed for camera {camera_key} / landmark {landmark_key}, \
         measured ({u:.3}, {v:.3}): {source}"
    )]
    Projection {
        camera_key: Key,
        landmark_key: Key,
        u: f64,
        v: f64,
        source: ProjectionError,
    },

    /// A serialized measurement record carries a format version this build
    /// does not understand.
    #[error("unsupported measurement format version {found} (expected {expected})")]
    UnsupportedFormatVersion { found: u32, expected: u32 },
}
