//! Straight-line weighted fit `y = m·x + b`.
//!
//! Given:
//! - abscissae `x_i`
//! - observed values `y_i`
//! - absolute standard deviations `σ_i` of `y_i`
//!
//! we solve the weighted least squares problem for `(m, b)` and keep the full
//! 2×2 covariance so derived quantities can be propagated with the correct
//! slope/intercept correlation.

use nalgebra::{DMatrix, DVector, Matrix2};

use crate::domain::Sigma;
use crate::error::FitError;
use crate::math::{CorrelatedParams, Measured, weighted_least_squares};

/// Index of the slope in `LinearFit::params()`.
pub const SLOPE: usize = 0;
/// Index of the intercept in `LinearFit::params()`.
pub const INTERCEPT: usize = 1;

/// Result of a weighted straight-line fit.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Covariance of `(slope, intercept)`, in that order.
    pub covariance: Matrix2<f64>,
    /// `Σ ((y_i - m·x_i - b) / σ_i)^2` (diagnostic; never used to rescale `covariance`).
    pub chi_square: f64,
    pub n: usize,
}

impl LinearFit {
    pub fn slope(&self) -> Measured {
        Measured::new(self.slope, self.covariance[(0, 0)].sqrt())
    }

    pub fn intercept(&self) -> Measured {
        Measured::new(self.intercept, self.covariance[(1, 1)].sqrt())
    }

    /// Correlation coefficient between slope and intercept.
    pub fn correlation(&self) -> f64 {
        let denom = (self.covariance[(0, 0)] * self.covariance[(1, 1)]).sqrt();
        if denom > 0.0 {
            self.covariance[(0, 1)] / denom
        } else {
            0.0
        }
    }

    /// Degrees of freedom of the fit (`n - 2`).
    pub fn dof(&self) -> usize {
        self.n.saturating_sub(2)
    }

    /// `y` predicted by the fitted line.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// `(m, b)` with their joint covariance, for propagation.
    pub fn params(&self) -> Result<CorrelatedParams, FitError> {
        let values = DVector::from_row_slice(&[self.slope, self.intercept]);
        let covariance = DMatrix::from_iterator(2, 2, self.covariance.iter().copied());
        CorrelatedParams::new(values, covariance)
    }

    /// Propagate the fit covariance into `g(m, b)` given its gradient `(∂g/∂m, ∂g/∂b)`.
    pub fn propagate(&self, g: impl Fn(f64, f64) -> f64, gradient: [f64; 2]) -> Result<Measured, FitError> {
        self.params()?.propagate(|v| g(v[SLOPE], v[INTERCEPT]), &gradient)
    }
}

/// Fit `y = m·x + b` by weighted least squares with absolute sigmas.
pub fn fit_line(xs: &[f64], ys: &[f64], sigma_y: &Sigma) -> Result<LinearFit, FitError> {
    let n = xs.len();
    if n == 0 {
        return Err(FitError::InvalidInput("no data points to fit".to_string()));
    }
    if ys.len() != n {
        return Err(FitError::InvalidInput(format!(
            "x has {n} values but y has {}",
            ys.len()
        )));
    }
    let sigma = sigma_y.expand(n).ok_or_else(|| {
        FitError::InvalidInput(format!("sigma_y must be a scalar or have {n} entries"))
    })?;

    for (i, ((&x, &y), &s)) in xs.iter().zip(ys).zip(&sigma).enumerate() {
        if !(x.is_finite() && y.is_finite()) {
            return Err(FitError::InvalidInput(format!("point {i} is not finite: ({x}, {y})")));
        }
        if !(s.is_finite() && s > 0.0) {
            return Err(FitError::InvalidInput(format!(
                "sigma_y of point {i} must be finite and > 0, got {s}"
            )));
        }
    }

    if count_distinct(xs) < 2 {
        return Err(FitError::SingularFit(
            "fewer than two distinct x values; the slope is undetermined".to_string(),
        ));
    }

    let mut design = DMatrix::zeros(n, 2);
    for (i, &x) in xs.iter().enumerate() {
        design[(i, SLOPE)] = x;
        design[(i, INTERCEPT)] = 1.0;
    }

    let solution = weighted_least_squares(
        &design,
        &DVector::from_column_slice(ys),
        &DVector::from_vec(sigma),
    )?;

    let c = &solution.covariance;
    Ok(LinearFit {
        slope: solution.beta[SLOPE],
        intercept: solution.beta[INTERCEPT],
        covariance: Matrix2::new(c[(0, 0)], c[(0, 1)], c[(1, 0)], c[(1, 1)]),
        chi_square: solution.chi_square,
        n,
    })
}

fn count_distinct(xs: &[f64]) -> usize {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: [f64; 4] = [0.0, 10.0, 20.0, 30.0];
    const YS: [f64; 4] = [1000.0, 1040.0, 1080.0, 1120.0];

    #[test]
    fn gas_thermometer_scenario() {
        let fit = fit_line(&XS, &YS, &Sigma::Uniform(5.0)).unwrap();

        // Uniform sigma: Var(m) = σ²/Sxx, Var(b) = σ²(1/n + x̄²/Sxx), Cov = -σ²x̄/Sxx
        // with x̄ = 15 and Sxx = 500.
        assert!((fit.slope - 4.0).abs() < 1e-10);
        assert!((fit.intercept - 1000.0).abs() < 1e-9);
        assert!((fit.covariance[(0, 0)] - 25.0 / 500.0).abs() < 1e-12);
        assert!((fit.covariance[(1, 1)] - 25.0 * (0.25 + 225.0 / 500.0)).abs() < 1e-9);
        assert!((fit.covariance[(0, 1)] + 25.0 * 15.0 / 500.0).abs() < 1e-10);
        assert!((fit.covariance[(0, 1)] - fit.covariance[(1, 0)]).abs() < 1e-12);

        let t0 = fit
            .propagate(|m, b| -b / m, [fit.intercept / (fit.slope * fit.slope), -1.0 / fit.slope])
            .unwrap();
        assert!((t0.value + 250.0).abs() < 1e-9);

        // Var(T0) = (b/m²)² Var(m) + (1/m)² Var(b) - 2 (b/m²)(1/m) Cov(m, b)
        let expected = 62.5f64.powi(2) * 0.05 + 0.0625 * 17.5 - 2.0 * 62.5 * 0.25 * -0.75;
        assert!((t0.sigma - expected.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn noiseless_data_is_recovered_exactly() {
        let xs = [-3.0, 0.5, 2.0, 7.25, 11.0];
        let ys: Vec<f64> = xs.iter().map(|x| -1.75 * x + 12.5).collect();
        let fit = fit_line(&xs, &ys, &Sigma::Uniform(1.0)).unwrap();
        assert!((fit.slope + 1.75).abs() < 1e-12);
        assert!((fit.intercept - 12.5).abs() < 1e-12);
        assert!(fit.chi_square < 1e-20);
    }

    #[test]
    fn noiseless_data_with_tiny_sigma_reports_tiny_uncertainty() {
        let ys: Vec<f64> = XS.iter().map(|x| 4.0 * x + 1000.0).collect();
        let fit = fit_line(&XS, &ys, &Sigma::Uniform(1e-9)).unwrap();
        assert!((fit.slope - 4.0).abs() < 1e-10);
        assert!(fit.slope().sigma < 1e-9);
        assert!(fit.intercept().sigma < 1e-8);
    }

    #[test]
    fn identity_propagation_returns_slope_sigma() {
        let fit = fit_line(&XS, &YS, &Sigma::Uniform(5.0)).unwrap();
        let m = fit.propagate(|m, _| m, [1.0, 0.0]).unwrap();
        assert_eq!(m.sigma, fit.covariance[(0, 0)].sqrt());
        let b = fit.propagate(|_, b| b, [0.0, 1.0]).unwrap();
        assert_eq!(b.sigma, fit.covariance[(1, 1)].sqrt());
    }

    #[test]
    fn scaling_sigma_scales_uncertainty_only() {
        let ys = [1001.0, 1038.0, 1083.0, 1119.0];
        let sigma = Sigma::PerPoint(vec![2.0, 5.0, 3.0, 4.0]);
        let base = fit_line(&XS, &ys, &sigma).unwrap();
        let scaled = fit_line(&XS, &ys, &sigma.scaled(7.0)).unwrap();

        assert!((base.slope - scaled.slope).abs() < 1e-10);
        assert!((base.intercept - scaled.intercept).abs() < 1e-8);
        assert!((scaled.slope().sigma / base.slope().sigma - 7.0).abs() < 1e-10);
        assert!((scaled.intercept().sigma / base.intercept().sigma - 7.0).abs() < 1e-10);
        assert!((base.correlation() - scaled.correlation()).abs() < 1e-12);
    }

    #[test]
    fn identical_x_values_are_singular() {
        let err = fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], &Sigma::Uniform(1.0)).unwrap_err();
        assert!(matches!(err, FitError::SingularFit(_)));

        let err = fit_line(&[2.0], &[1.0], &Sigma::Uniform(1.0)).unwrap_err();
        assert!(matches!(err, FitError::SingularFit(_)));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let cases = [
            fit_line(&[], &[], &Sigma::Uniform(1.0)),
            fit_line(&[1.0, 2.0], &[1.0], &Sigma::Uniform(1.0)),
            fit_line(&[1.0, 2.0], &[1.0, 2.0], &Sigma::Uniform(0.0)),
            fit_line(&[1.0, 2.0], &[1.0, 2.0], &Sigma::PerPoint(vec![1.0, -1.0])),
            fit_line(&[1.0, 2.0], &[1.0, 2.0], &Sigma::PerPoint(vec![1.0])),
            fit_line(&[1.0, f64::NAN], &[1.0, 2.0], &Sigma::Uniform(1.0)),
        ];
        for result in cases {
            assert!(matches!(result, Err(FitError::InvalidInput(_))), "{result:?}");
        }
    }

    #[test]
    fn covariance_is_symmetric_positive_definite() {
        let xs = [1.0, 1.5, 4.0, 9.0, 9.5];
        let ys = [3.0, 2.0, 8.0, 20.0, 17.0];
        let fit = fit_line(&xs, &ys, &Sigma::PerPoint(vec![0.3, 0.5, 1.0, 2.0, 0.7])).unwrap();
        let c = fit.covariance;
        assert!(c[(0, 0)] > 0.0 && c[(1, 1)] > 0.0);
        assert_eq!(c[(0, 1)], c[(1, 0)]);
        assert!(c.determinant() > 0.0);
        assert!(fit.correlation().abs() <= 1.0);
    }
}
