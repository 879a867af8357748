//! Weighted least squares solver with parameter covariance.
//!
//! We solve small linear regression problems of the form:
//!
//! ```text
//! minimize Σ ((y_i - x_i^T β) / σ_i)^2
//! ```
//!
//! Implementation choices:
//! - Rows are scaled by `1/σ_i` and the result is solved as an ordinary least
//!   squares problem `J β ≈ r`.
//! - We use SVD (`J = U S Vᵀ`) for both the solution and the covariance
//!   `(JᵀJ)⁻¹ = V S⁻² Vᵀ`. The sigmas are taken as absolute measurement errors,
//!   so the covariance is *not* rescaled by the reduced chi-square.
//! - Rank deficiency is detected from the singular values with the same
//!   cutoff LAPACK-style pseudo-inverses use: `ε · max(rows, cols) · s_max`.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Solution of a weighted least squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub beta: DVector<f64>,
    pub covariance: DMatrix<f64>,
    /// `Σ ((y_i - ŷ_i) / σ_i)^2` at the solution.
    pub chi_square: f64,
}

/// Solve a weighted least squares problem.
///
/// `design` holds one unscaled row per observation; `sigma` holds the absolute
/// standard deviation of each observation.
pub fn weighted_least_squares(
    design: &DMatrix<f64>,
    y: &DVector<f64>,
    sigma: &DVector<f64>,
) -> Result<LeastSquares, FitError> {
    let (rows, cols) = design.shape();
    if rows != y.len() || rows != sigma.len() {
        return Err(FitError::InvalidInput(format!(
            "design has {rows} rows but y has {} and sigma has {} entries",
            y.len(),
            sigma.len()
        )));
    }
    if rows < cols {
        return Err(FitError::SingularFit(format!(
            "{rows} observations cannot determine {cols} parameters"
        )));
    }

    let mut scaled = design.clone();
    let mut rhs = y.clone();
    for i in 0..rows {
        let inv = 1.0 / sigma[i];
        scaled.row_mut(i).scale_mut(inv);
        rhs[i] *= inv;
    }

    let svd = scaled.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let cutoff = f64::EPSILON * rows.max(cols) as f64 * s_max;
    if !(s_max.is_finite() && s_max > 0.0) || svd.singular_values.iter().any(|&s| s <= cutoff) {
        return Err(FitError::SingularFit(
            "design matrix is rank deficient (parameters are not identifiable)".to_string(),
        ));
    }

    let beta = svd
        .solve(&rhs, cutoff)
        .map_err(|e| FitError::SingularFit(format!("SVD solve failed: {e}")))?;

    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| FitError::Numerical("SVD did not produce right singular vectors".to_string()))?;
    let inv_s2 = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / (s * s)));
    let covariance = v_t.transpose() * inv_s2 * v_t;
    // Symmetrize away round-off.
    let covariance = (&covariance + covariance.transpose()) * 0.5;

    if beta.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::Numerical("non-finite fit parameters or covariance".to_string()));
    }

    let residual = &scaled * &beta - &rhs;
    let chi_square = residual.norm_squared();

    Ok(LeastSquares {
        beta,
        covariance,
        chi_square,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let sigma = DVector::from_element(3, 1.0);

        let fit = weighted_least_squares(&x, &y, &sigma).unwrap();
        assert!((fit.beta[0] - 2.0).abs() < 1e-10);
        assert!((fit.beta[1] - 3.0).abs() < 1e-10);
        assert!(fit.chi_square < 1e-20);
    }

    #[test]
    fn covariance_matches_normal_equations() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 4.0]);
        let y = DVector::from_row_slice(&[1.0, 2.5, 2.9, 5.2]);
        let sigma = DVector::from_row_slice(&[0.5, 1.0, 0.5, 2.0]);

        let fit = weighted_least_squares(&x, &y, &sigma).unwrap();

        let w = DMatrix::from_diagonal(&sigma.map(|s| 1.0 / (s * s)));
        let normal = x.transpose() * w * &x;
        let expected = normal.try_inverse().unwrap();
        for (a, b) in fit.covariance.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn collinear_columns_are_singular() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let sigma = DVector::from_element(3, 1.0);

        let err = weighted_least_squares(&x, &y, &sigma).unwrap_err();
        assert!(matches!(err, FitError::SingularFit(_)));
    }
}
