//! First-order (delta-method) error propagation.
//!
//! For parameters `p` with covariance `C` and a scalar function `g(p)`:
//!
//! ```text
//! Var(g) ≈ ∇g(p) · C · ∇g(p)ᵀ
//! ```
//!
//! Parameters are carried together with their joint covariance
//! (`CorrelatedParams`) so that every derived quantity, including quantities
//! derived from other derived quantities, is computed against the original
//! correlations rather than against independent per-parameter sigmas.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Relative round-off allowance before a negative variance is treated as an error.
const VARIANCE_ROUNDOFF: f64 = 1e-12;

/// Relative step for central-difference gradients.
const NUMERIC_STEP: f64 = 1e-6;

/// A value with its standard uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    pub value: f64,
    pub sigma: f64,
}

impl Measured {
    pub fn new(value: f64, sigma: f64) -> Self {
        Self { value, sigma }
    }

    /// `|value - reference| / sigma`.
    ///
    /// Zero when the value equals the reference; infinite when `sigma` is zero
    /// and they differ.
    pub fn deviation(&self, reference: f64) -> f64 {
        let diff = (self.value - reference).abs();
        if diff == 0.0 { 0.0 } else { diff / self.sigma }
    }

    /// Univariate chain: `h(value)` with `sigma_h = |h'(value)| · sigma`.
    ///
    /// Only valid when the result depends on this value alone; quantities that
    /// combine several correlated values must go through `CorrelatedParams`.
    pub fn map(&self, h: impl Fn(f64) -> f64, dh: impl Fn(f64) -> f64) -> Result<Measured, FitError> {
        let value = h(self.value);
        let slope = dh(self.value);
        if !(value.is_finite() && slope.is_finite()) {
            return Err(FitError::Numerical(format!(
                "derived value is not finite at {}",
                self.value
            )));
        }
        Ok(Measured::new(value, slope.abs() * self.sigma))
    }
}

/// Parameter values with their joint covariance matrix.
#[derive(Debug, Clone)]
pub struct CorrelatedParams {
    values: DVector<f64>,
    covariance: DMatrix<f64>,
}

impl CorrelatedParams {
    pub fn new(values: DVector<f64>, covariance: DMatrix<f64>) -> Result<Self, FitError> {
        let n = values.len();
        if covariance.shape() != (n, n) {
            return Err(FitError::InvalidInput(format!(
                "covariance is {:?} but there are {n} parameters",
                covariance.shape()
            )));
        }
        if values.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::InvalidInput("non-finite parameter or covariance".to_string()));
        }
        if (0..n).any(|i| covariance[(i, i)] < 0.0) {
            return Err(FitError::InvalidInput("negative variance on the covariance diagonal".to_string()));
        }
        Ok(Self { values, covariance })
    }

    /// Append an uncertain input that is uncorrelated with everything so far.
    pub fn with_independent(&self, input: Measured) -> Result<Self, FitError> {
        if !(input.value.is_finite() && input.sigma.is_finite() && input.sigma >= 0.0) {
            return Err(FitError::InvalidInput(format!(
                "independent input must be finite with sigma >= 0, got {}+/-{}",
                input.value, input.sigma
            )));
        }
        let n = self.values.len();
        let mut values = self.values.clone().resize_vertically(n + 1, 0.0);
        values[n] = input.value;
        let mut covariance = self.covariance.clone().resize(n + 1, n + 1, 0.0);
        covariance[(n, n)] = input.sigma * input.sigma;
        Ok(Self { values, covariance })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        self.values.as_slice()
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Propagate with an analytic gradient evaluated at the parameter values.
    pub fn propagate(&self, g: impl Fn(&[f64]) -> f64, gradient: &[f64]) -> Result<Measured, FitError> {
        if gradient.len() != self.len() {
            return Err(FitError::InvalidInput(format!(
                "gradient has {} entries but there are {} parameters",
                gradient.len(),
                self.len()
            )));
        }
        let value = g(self.values());
        if !value.is_finite() {
            return Err(FitError::Numerical(format!("derived value is not finite ({value})")));
        }
        let sigma = self.sigma_along(gradient)?;
        Ok(Measured::new(value, sigma))
    }

    /// Propagate using a central-difference gradient.
    pub fn propagate_numeric(&self, g: impl Fn(&[f64]) -> f64) -> Result<Measured, FitError> {
        let gradient = self.numeric_gradient(&g);
        self.propagate(g, &gradient)
    }

    /// Central-difference gradient of `g` at the parameter values.
    ///
    /// The step scales with the parameter magnitude, falling back to its sigma
    /// (and finally to an absolute step) for parameters at zero.
    pub fn numeric_gradient(&self, g: impl Fn(&[f64]) -> f64) -> Vec<f64> {
        let base = self.values().to_vec();
        (0..self.len())
            .map(|i| {
                let scale = base[i]
                    .abs()
                    .max(self.covariance[(i, i)].sqrt())
                    .max(f64::MIN_POSITIVE.sqrt());
                let h = NUMERIC_STEP * scale;
                let mut plus = base.clone();
                let mut minus = base.clone();
                plus[i] += h;
                minus[i] -= h;
                (g(&plus) - g(&minus)) / (2.0 * h)
            })
            .collect()
    }

    fn sigma_along(&self, gradient: &[f64]) -> Result<f64, FitError> {
        if gradient.iter().any(|v| !v.is_finite()) {
            return Err(FitError::Numerical(format!("gradient is not finite: {gradient:?}")));
        }
        let grad = DVector::from_column_slice(gradient);
        let variance = grad.dot(&(&self.covariance * &grad));

        let magnitude = grad.abs().dot(&(self.covariance.abs() * grad.abs()));
        if variance < 0.0 {
            if -variance <= VARIANCE_ROUNDOFF * magnitude {
                return Ok(0.0);
            }
            return Err(FitError::Numerical(format!(
                "propagated variance is negative ({variance:e}); covariance is not positive semi-definite"
            )));
        }
        if !variance.is_finite() {
            return Err(FitError::Numerical("propagated variance is not finite".to_string()));
        }
        Ok(variance.sqrt())
    }
}
