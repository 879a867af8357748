//! Effective-variance treatment of x-axis uncertainty.
//!
//! The independent variable carries its own uncertainty `σx_i`. We fold it into
//! the y-axis variance using the current slope estimate:
//!
//! ```text
//! σeff_i² = σy_i² + (m · σx_i)²
//! ```
//!
//! Pass 1 fits with `σy` alone; every later pass refits with `σeff` computed
//! from the previous pass's slope. The default of exactly two passes is a
//! fixed approximation (not a converged fixed point) and reproduces the
//! published cooling-curve results. More passes, optionally with an early-stop
//! tolerance on the slope, approach the converged solution.

use tracing::debug;

use crate::domain::Sigma;
use crate::error::FitError;
use crate::fit::{LinearFit, fit_line};

/// Refinement options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveVarianceOptions {
    /// Total number of fit passes, including the initial y-only pass.
    pub max_iterations: usize,
    /// Stop early once `|m_k - m_{k-1}| <= tolerance · |m_k|`.
    pub tolerance: Option<f64>,
}

impl Default for EffectiveVarianceOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            tolerance: None,
        }
    }
}

/// Output of the refinement.
#[derive(Debug, Clone)]
pub struct EffectiveVarianceFit {
    pub fit: LinearFit,
    /// Number of passes actually performed.
    pub passes: usize,
    /// Per-point sigmas used in the final pass.
    pub sigma_eff: Vec<f64>,
}

/// Fit `y = m·x + b` with errors in both variables via the effective variance method.
pub fn fit_effective_variance(
    xs: &[f64],
    ys: &[f64],
    sigma_x: &Sigma,
    sigma_y: &Sigma,
    options: EffectiveVarianceOptions,
) -> Result<EffectiveVarianceFit, FitError> {
    if options.max_iterations == 0 {
        return Err(FitError::InvalidInput("max_iterations must be at least 1".to_string()));
    }
    if let Some(tol) = options.tolerance {
        if !(tol.is_finite() && tol >= 0.0) {
            return Err(FitError::InvalidInput(format!("tolerance must be finite and >= 0, got {tol}")));
        }
    }

    let n = xs.len();
    let sx = sigma_x.expand(n).ok_or_else(|| {
        FitError::InvalidInput(format!("sigma_x must be a scalar or have {n} entries"))
    })?;
    if let Some((i, s)) = sx.iter().enumerate().find(|(_, s)| !(s.is_finite() && **s >= 0.0)) {
        return Err(FitError::InvalidInput(format!(
            "sigma_x of point {i} must be finite and >= 0, got {s}"
        )));
    }
    let sy = sigma_y.expand(n).ok_or_else(|| {
        FitError::InvalidInput(format!("sigma_y must be a scalar or have {n} entries"))
    })?;

    let mut fit = fit_line(xs, ys, &Sigma::PerPoint(sy.clone()))?;
    let mut sigma_eff = sy.clone();
    let mut passes = 1;

    while passes < options.max_iterations {
        let previous = fit.slope;
        sigma_eff = effective_sigma(&sy, &sx, previous);
        fit = fit_line(xs, ys, &Sigma::PerPoint(sigma_eff.clone()))?;
        passes += 1;

        let change = (fit.slope - previous).abs();
        debug!(pass = passes, slope = fit.slope, change, "effective variance pass");
        if let Some(tol) = options.tolerance {
            if change <= tol * fit.slope.abs() {
                break;
            }
        }
    }

    Ok(EffectiveVarianceFit {
        fit,
        passes,
        sigma_eff,
    })
}

/// `sqrt(σy² + (m·σx)²)` per point.
pub fn effective_sigma(sigma_y: &[f64], sigma_x: &[f64], slope: f64) -> Vec<f64> {
    sigma_y
        .iter()
        .zip(sigma_x)
        .map(|(sy, sx)| sy.hypot(slope * sx))
        .collect()
}
