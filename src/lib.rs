//! # sfm-factors
//!
//! General structure-from-motion factors for factor-graph nonlinear least
//! squares optimization.
//!
//! The centerpiece is [`GeneralSfmFactor`]: a binary factor relating one
//! camera variable (pose and calibration optimized jointly) and one 3D
//! landmark through a fixed 2D image measurement. The factor computes the
//! reprojection residual together with analytic Jacobians with respect to
//! both variables, in the ordering and sign convention a sparse nonlinear
//! optimizer consumes for its linear system.
//!
//! ## Design
//!
//! - **Camera as capability**: the factor is generic over [`SfmCamera`], so
//!   any camera parameterization (pose-only, pose + intrinsics, fisheye, ...)
//!   plugs in as long as it can project a point and report derivatives.
//! - **Keys, not values**: the factor stores opaque [`Key`] identifiers and
//!   receives current variable estimates from the caller at evaluation time.
//!   It never owns or mutates variable state.
//! - **Failures surface**: an invalid projection (landmark behind the camera,
//!   degenerate depth) is reported as [`SfmError::Projection`] carrying the
//!   offending key pair and measurement. The optimizer decides whether to
//!   drop, robustify, or abort; the factor never substitutes a sentinel.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::{Isometry3, Vector2, Vector3};
//! use sfm_factors::{GeneralSfmFactor, IsotropicNoise, Key, PinholeSfmCamera};
//!
//! let camera = PinholeSfmCamera::new(Isometry3::identity(), 500.0, 500.0, 320.0, 240.0);
//! let noise = Arc::new(IsotropicNoise::new(2, 1.0)?);
//!
//! let factor: GeneralSfmFactor<PinholeSfmCamera> = GeneralSfmFactor::new(
//!     Vector2::new(370.0, 340.0),
//!     noise,
//!     Key::symbol('x', 0),
//!     Key::symbol('l', 0),
//! )?;
//!
//! let landmark = Vector3::new(0.1, 0.2, 1.0);
//! let eval = factor.evaluate_error(&camera, &landmark, true, true)?;
//! assert!(eval.residual.norm() < 1e-9);
//! # Ok::<(), sfm_factors::SfmError>(())
//! ```

pub mod camera;
pub mod error;
pub mod factor;
pub mod key;
pub mod logger;
pub mod noise;

pub use camera::pinhole::PinholeSfmCamera;
pub use camera::{Projection, ProjectionError, SfmCamera};
pub use error::{SfmError, SfmResult};
pub use factor::{GeneralSfmFactor, MeasurementRecord, SfmEvaluation, MEASUREMENT_FORMAT_VERSION};
pub use key::Key;
pub use logger::{init_logger, init_logger_with_level};
pub use noise::{DiagonalNoise, IsotropicNoise, NoiseModel, UnitNoise};
