//! Per-experiment conversions and derived physical quantities.
//!
//! Every experiment follows the same shape:
//! - read its named columns from the loaded table
//! - convert raw instrument readings into `(x, y, σx, σy)` samples
//! - fit a straight line (plain weighted, or effective variance)
//! - propagate the fit covariance into its physical result(s)
//!
//! The experiment-specific parts are small pure functions so they can be tested
//! without touching the filesystem.

use std::path::PathBuf;

use crate::domain::{ChartSpec, DerivedQuantity, Experiment, FitLabels, Sample};
use crate::error::AppError;
use crate::fit::LinearFit;
use crate::io::Table;

pub mod cooling;
pub mod heating;
pub mod specific_heat;

pub use cooling::CoolingConstants;
pub use heating::HeatingConstants;
pub use specific_heat::SpecificHeatConstants;

/// Instrument uncertainties and physical constants of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub enum Constants {
    Heating(HeatingConstants),
    SpecificHeat(SpecificHeatConstants),
    Cooling(CoolingConstants),
}

impl Constants {
    /// Defaults used for the published analysis of `experiment`.
    pub fn defaults(experiment: Experiment) -> Self {
        match experiment {
            Experiment::Heating => Constants::Heating(HeatingConstants::default()),
            Experiment::SpecificHeat => Constants::SpecificHeat(SpecificHeatConstants::default()),
            Experiment::Cooling => Constants::Cooling(CoolingConstants::default()),
        }
    }

    pub fn experiment(&self) -> Experiment {
        match self {
            Constants::Heating(_) => Experiment::Heating,
            Constants::SpecificHeat(_) => Experiment::SpecificHeat,
            Constants::Cooling(_) => Experiment::Cooling,
        }
    }
}

/// Everything computed for one run, ready to be reported and plotted.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub experiment: Experiment,
    pub source: PathBuf,
    pub samples: Vec<Sample>,
    pub fit: LinearFit,
    /// Fit passes performed (1 for a plain weighted fit).
    pub passes: usize,
    pub fit_labels: FitLabels,
    pub quantities: Vec<DerivedQuantity>,
    pub chart: ChartSpec,
}

/// Run the experiment-specific conversion, fit and propagation on a loaded table.
pub fn analyze(table: &Table, constants: &Constants) -> Result<Analysis, AppError> {
    match constants {
        Constants::Heating(c) => heating::analyze(table, c),
        Constants::SpecificHeat(c) => specific_heat::analyze(table, c),
        Constants::Cooling(c) => cooling::analyze(table, c),
    }
}

/// Reject non-finite or non-positive configuration values.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::new(2, format!("`{name}` must be finite and > 0, got {value}")))
    }
}
