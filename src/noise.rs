//! Gaussian noise models for weighting residuals and Jacobians.
//!
//! A noise model describes the measurement uncertainty of a factor. The
//! optimizer whitens residuals and Jacobian blocks with it before they enter
//! the linear system, so that every factor contributes in units of standard
//! deviations. Models are shared between factors through `Arc<dyn NoiseModel>`
//! and are immutable after construction.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::error::{SfmError, SfmResult};

/// Uncertainty model applied to a factor's residual and Jacobians.
///
/// Implementations must be cheap to evaluate: whitening runs once per factor
/// per optimizer iteration.
pub trait NoiseModel: fmt::Debug + Send + Sync {
    /// Dimension of the residual this model weights.
    fn dim(&self) -> usize;

    /// Standard deviations, one per residual component.
    fn sigmas(&self) -> DVector<f64>;

    /// Whiten a residual vector: divide componentwise by sigma.
    fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        let sigmas = self.sigmas();
        DVector::from_fn(residual.len(), |i, _| residual[i] / sigmas[i])
    }

    /// Whiten a Jacobian block: scale each row by the matching 1/sigma.
    fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        let sigmas = self.sigmas();
        let mut out = jacobian.clone();
        for i in 0..out.nrows() {
            let inv = 1.0 / sigmas[i];
            out.row_mut(i).scale_mut(inv);
        }
        out
    }

    /// Tolerance-based equality, comparing dimensions and sigmas.
    fn equals(&self, other: &dyn NoiseModel, tol: f64) -> bool {
        if self.dim() != other.dim() {
            return false;
        }
        (self.sigmas() - other.sigmas()).amax() <= tol
    }
}

/// Unit Gaussian noise: whitening is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitNoise {
    dim: usize,
}

impl UnitNoise {
    pub fn new(dim: usize) -> Self {
        UnitNoise { dim }
    }
}

impl NoiseModel for UnitNoise {
    fn dim(&self) -> usize {
        self.dim
    }

    fn sigmas(&self) -> DVector<f64> {
        DVector::from_element(self.dim, 1.0)
    }

    fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        residual.clone()
    }

    fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        jacobian.clone()
    }
}

/// Isotropic Gaussian noise: a single sigma for every component.
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicNoise {
    dim: usize,
    sigma: f64,
}

impl IsotropicNoise {
    /// Create an isotropic model. Fails if `sigma` is not strictly positive.
    pub fn new(dim: usize, sigma: f64) -> SfmResult<Self> {
        if sigma <= 0.0 || !sigma.is_finite() {
            return Err(SfmError::InvalidNoiseSigma { sigma });
        }
        Ok(IsotropicNoise { dim, sigma })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl NoiseModel for IsotropicNoise {
    fn dim(&self) -> usize {
        self.dim
    }

    fn sigmas(&self) -> DVector<f64> {
        DVector::from_element(self.dim, self.sigma)
    }

    fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        residual / self.sigma
    }

    fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        jacobian / self.sigma
    }
}

/// Diagonal Gaussian noise: an independent sigma per component.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalNoise {
    sigmas: DVector<f64>,
}

impl DiagonalNoise {
    /// Create a diagonal model from per-component standard deviations.
    /// Fails if any sigma is not strictly positive.
    pub fn from_sigmas(sigmas: DVector<f64>) -> SfmResult<Self> {
        for &sigma in sigmas.iter() {
            if sigma <= 0.0 || !sigma.is_finite() {
                return Err(SfmError::InvalidNoiseSigma { sigma });
            }
        }
        Ok(DiagonalNoise { sigmas })
    }
}

impl NoiseModel for DiagonalNoise {
    fn dim(&self) -> usize {
        self.sigmas.len()
    }

    fn sigmas(&self) -> DVector<f64> {
        self.sigmas.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn test_unit_noise_whiten_is_identity() {
        let noise = UnitNoise::new(2);
        let residual = dvector![3.0, -4.0];
        assert_eq!(noise.whiten(&residual), residual);

        let jacobian = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(noise.whiten_jacobian(&jacobian), jacobian);
    }

    #[test]
    fn test_isotropic_whiten_scales_by_sigma() {
        let noise = IsotropicNoise::new(2, 2.0).unwrap();
        let residual = dvector![4.0, -6.0];
        assert_eq!(noise.whiten(&residual), dvector![2.0, -3.0]);
    }

    #[test]
    fn test_isotropic_rejects_bad_sigma() {
        assert!(IsotropicNoise::new(2, 0.0).is_err());
        assert!(IsotropicNoise::new(2, -1.0).is_err());
        assert!(IsotropicNoise::new(2, f64::NAN).is_err());
    }

    #[test]
    fn test_diagonal_whiten_rows() {
        let noise = DiagonalNoise::from_sigmas(dvector![1.0, 2.0]).unwrap();
        let residual = dvector![1.0, 4.0];
        assert_eq!(noise.whiten(&residual), dvector![1.0, 2.0]);

        let jacobian = DMatrix::from_row_slice(2, 2, &[2.0, 4.0, 6.0, 8.0]);
        let whitened = noise.whiten_jacobian(&jacobian);
        assert_eq!(whitened, DMatrix::from_row_slice(2, 2, &[2.0, 4.0, 3.0, 4.0]));
    }

    #[test]
    fn test_equals_compares_sigmas_within_tolerance() {
        let a = IsotropicNoise::new(2, 1.0).unwrap();
        let b = IsotropicNoise::new(2, 1.0 + 1e-12).unwrap();
        let c = IsotropicNoise::new(2, 2.0).unwrap();
        let d = IsotropicNoise::new(3, 1.0).unwrap();

        assert!(a.equals(&b, 1e-9));
        assert!(!a.equals(&c, 1e-9));
        assert!(!a.equals(&d, 1e-9));

        // Unit and isotropic with sigma 1 agree through the sigma view.
        let unit = UnitNoise::new(2);
        assert!(a.equals(&unit, 1e-9));
    }
}
