//! Synthetic data and Monte Carlo checks of the fit covariance.
//!
//! Each trial draws `y_i = m·x_i + b + N(0, σ)` from its own seeded RNG, so a
//! run is reproducible regardless of how rayon schedules the trials.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::Sigma;
use crate::error::AppError;
use crate::fit::{LinearFit, fit_line};

/// Parameters of a synthetic straight-line experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub slope: f64,
    pub intercept: f64,
    pub xs: Vec<f64>,
    pub sigma: f64,
    pub trials: usize,
    pub seed: u64,
}

impl SimConfig {
    /// `points` evenly spaced x values over `[x_min, x_max]`.
    pub fn grid(x_min: f64, x_max: f64, points: usize) -> Vec<f64> {
        match points {
            0 => Vec::new(),
            1 => vec![x_min],
            _ => (0..points)
                .map(|i| x_min + (x_max - x_min) * i as f64 / (points as f64 - 1.0))
                .collect(),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(AppError::new(2, format!("Noise sigma must be finite and > 0, got {}", self.sigma)));
        }
        if !(self.slope.is_finite() && self.intercept.is_finite()) {
            return Err(AppError::new(2, "True slope and intercept must be finite."));
        }
        if self.xs.len() < 3 {
            return Err(AppError::new(2, "Need at least 3 x values to estimate a spread."));
        }
        if self.trials < 2 {
            return Err(AppError::new(2, "Need at least 2 trials."));
        }
        Ok(())
    }
}

/// Empirical spread of the fitted parameters against the reported one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloSummary {
    pub trials: usize,
    pub mean_slope: f64,
    pub std_slope: f64,
    pub mean_intercept: f64,
    pub std_intercept: f64,
    pub correlation: f64,
    pub reported_sigma_slope: f64,
    pub reported_sigma_intercept: f64,
    pub reported_correlation: f64,
}

impl MonteCarloSummary {
    /// Empirical over reported slope sigma; close to 1 when the covariance is right.
    pub fn slope_ratio(&self) -> f64 {
        self.std_slope / self.reported_sigma_slope
    }

    pub fn intercept_ratio(&self) -> f64 {
        self.std_intercept / self.reported_sigma_intercept
    }
}

/// One noisy realisation of the configured line.
pub fn synthetic_ys(config: &SimConfig, seed: u64) -> Result<Vec<f64>, AppError> {
    let normal = Normal::new(0.0, config.sigma)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(config
        .xs
        .iter()
        .map(|&x| config.slope * x + config.intercept + normal.sample(&mut rng))
        .collect())
}

/// Refit `trials` synthetic data sets and summarise the spread of `m̂` and `b̂`.
pub fn monte_carlo(config: &SimConfig) -> Result<MonteCarloSummary, AppError> {
    config.validate()?;
    let sigma = Sigma::Uniform(config.sigma);

    // The covariance depends only on x and σ, so one noiseless fit reports it.
    let truth: Vec<f64> = config.xs.iter().map(|&x| config.slope * x + config.intercept).collect();
    let reference = fit_line(&config.xs, &truth, &sigma)?;

    let fits: Vec<LinearFit> = (0..config.trials)
        .into_par_iter()
        .map(|i| -> Result<LinearFit, AppError> {
            let ys = synthetic_ys(config, trial_seed(config.seed, i))?;
            Ok(fit_line(&config.xs, &ys, &sigma)?)
        })
        .collect::<Result<_, AppError>>()?;
    debug!(trials = fits.len(), "monte carlo trials fitted");

    let n = fits.len() as f64;
    let mean_slope = fits.iter().map(|f| f.slope).sum::<f64>() / n;
    let mean_intercept = fits.iter().map(|f| f.intercept).sum::<f64>() / n;
    let (mut ss_m, mut ss_b, mut ss_mb) = (0.0, 0.0, 0.0);
    for f in &fits {
        let dm = f.slope - mean_slope;
        let db = f.intercept - mean_intercept;
        ss_m += dm * dm;
        ss_b += db * db;
        ss_mb += dm * db;
    }
    let std_slope = (ss_m / (n - 1.0)).sqrt();
    let std_intercept = (ss_b / (n - 1.0)).sqrt();
    let correlation = if ss_m > 0.0 && ss_b > 0.0 {
        ss_mb / (ss_m * ss_b).sqrt()
    } else {
        0.0
    };

    let summary = MonteCarloSummary {
        trials: fits.len(),
        mean_slope,
        std_slope,
        mean_intercept,
        std_intercept,
        correlation,
        reported_sigma_slope: reference.slope().sigma,
        reported_sigma_intercept: reference.intercept().sigma,
        reported_correlation: reference.correlation(),
    };
    info!(
        trials = summary.trials,
        slope_ratio = summary.slope_ratio(),
        intercept_ratio = summary.intercept_ratio(),
        "monte carlo done"
    );
    Ok(summary)
}

fn trial_seed(seed: u64, trial: usize) -> u64 {
    seed ^ (trial as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Human-readable summary for stdout.
pub fn format_summary(config: &SimConfig, s: &MonteCarloSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Monte Carlo: {} trials, {} points, sigma = {}, seed = {}\n",
        s.trials,
        config.xs.len(),
        config.sigma,
        config.seed
    ));
    out.push_str(&format!("{:<12}{:>14}{:>14}{:>14}{:>14}\n", "", "true", "mean", "empirical sd", "reported sd"));
    out.push_str(&format!(
        "{:<12}{:>14.6}{:>14.6}{:>14.6}{:>14.6}\n",
        "slope", config.slope, s.mean_slope, s.std_slope, s.reported_sigma_slope
    ));
    out.push_str(&format!(
        "{:<12}{:>14.6}{:>14.6}{:>14.6}{:>14.6}\n",
        "intercept", config.intercept, s.mean_intercept, s.std_intercept, s.reported_sigma_intercept
    ));
    out.push_str(&format!(
        "correlation: empirical {:.4}, reported {:.4}\n",
        s.correlation, s.reported_correlation
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(trials: usize) -> SimConfig {
        SimConfig {
            slope: 4.0,
            intercept: 1000.0,
            xs: SimConfig::grid(0.0, 30.0, 7),
            sigma: 5.0,
            trials,
            seed: 42,
        }
    }

    #[test]
    fn synthetic_data_is_reproducible() {
        let c = config(10);
        assert_eq!(synthetic_ys(&c, 3).unwrap(), synthetic_ys(&c, 3).unwrap());
        assert_ne!(synthetic_ys(&c, 3).unwrap(), synthetic_ys(&c, 4).unwrap());
    }

    #[test]
    fn empirical_spread_matches_reported_covariance() {
        let c = config(4000);
        let s = monte_carlo(&c).unwrap();

        // Unbiased within a few standard errors of the mean.
        let se_m = s.reported_sigma_slope / (s.trials as f64).sqrt();
        let se_b = s.reported_sigma_intercept / (s.trials as f64).sqrt();
        assert!((s.mean_slope - 4.0).abs() < 5.0 * se_m, "{s:?}");
        assert!((s.mean_intercept - 1000.0).abs() < 5.0 * se_b, "{s:?}");

        // sd estimate from 4000 trials is good to roughly 1%.
        assert!((s.slope_ratio() - 1.0).abs() < 0.08, "{s:?}");
        assert!((s.intercept_ratio() - 1.0).abs() < 0.08, "{s:?}");
        assert!((s.correlation - s.reported_correlation).abs() < 0.08, "{s:?}");
    }

    #[test]
    fn monte_carlo_is_deterministic_for_a_seed() {
        let c = config(200);
        assert_eq!(monte_carlo(&c).unwrap(), monte_carlo(&c).unwrap());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut c = config(10);
        c.sigma = 0.0;
        assert_eq!(monte_carlo(&c).unwrap_err().exit_code(), 2);
        let mut c = config(1);
        c.trials = 1;
        assert_eq!(monte_carlo(&c).unwrap_err().exit_code(), 2);
        let mut c = config(10);
        c.xs = vec![1.0, 2.0];
        assert!(monte_carlo(&c).is_err());
    }

    #[test]
    fn grid_is_inclusive() {
        assert_eq!(SimConfig::grid(0.0, 30.0, 4), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(SimConfig::grid(2.0, 5.0, 1), vec![2.0]);
    }
}
