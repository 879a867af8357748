//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and propagation
//! - exported to JSON
//! - formatted into the plain-text lab report

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::math::Measured;

/// Which lab experiment to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Experiment {
    /// Gas thermometer, heating phase: absolute zero from p(T).
    Heating,
    /// Specific heat of air: adiabatic exponent and degrees of freedom.
    SpecificHeat,
    /// Vapor pressure of water, cooling phase: enthalpy of vaporization.
    Cooling,
}

impl Experiment {
    /// Title used in the report header.
    pub fn title(self) -> &'static str {
        match self {
            Experiment::Heating => "Gas Thermometer (Heating)",
            Experiment::SpecificHeat => "Specific Heat of Air",
            Experiment::Cooling => "Vapor Pressure (Cooling)",
        }
    }

    pub fn default_input(self) -> PathBuf {
        PathBuf::from(match self {
            Experiment::Heating => "data/v5_heating.csv",
            Experiment::SpecificHeat => "data/v5_specific_heat.csv",
            Experiment::Cooling => "data/v7_cooling.csv",
        })
    }

    pub fn report_file_name(self) -> &'static str {
        match self {
            Experiment::Heating => "results_gas_thermometer_heating.txt",
            Experiment::SpecificHeat => "results_specific_heat.txt",
            Experiment::Cooling => "results_vapor_pressure_cooling.txt",
        }
    }

    pub fn chart_file_name(self) -> &'static str {
        match self {
            Experiment::Heating => "v5_gas_thermometer_heating.svg",
            Experiment::SpecificHeat => "v5_specific_heat.svg",
            Experiment::Cooling => "v7_vapor_pressure_cooling.svg",
        }
    }
}

/// Per-point standard deviations: one value for every point, or one each.
#[derive(Debug, Clone, PartialEq)]
pub enum Sigma {
    Uniform(f64),
    PerPoint(Vec<f64>),
}

impl Sigma {
    /// Expand to one sigma per point.
    ///
    /// Returns `None` when a per-point sequence has the wrong length.
    pub fn expand(&self, n: usize) -> Option<Vec<f64>> {
        match self {
            Sigma::Uniform(s) => Some(vec![*s; n]),
            Sigma::PerPoint(v) if v.len() == n => Some(v.clone()),
            Sigma::PerPoint(_) => None,
        }
    }

    /// Multiply every sigma by `k`.
    pub fn scaled(&self, k: f64) -> Sigma {
        match self {
            Sigma::Uniform(s) => Sigma::Uniform(s * k),
            Sigma::PerPoint(v) => Sigma::PerPoint(v.iter().map(|s| s * k).collect()),
        }
    }
}

/// A converted observation ready for fitting and plotting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
}

/// A comparison value printed under a derived quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// Label, e.g. `Literature Value (Air)`.
    pub label: String,
    pub value: f64,
    /// Decimal places used when printing the reference.
    pub precision: usize,
    /// Whether to report `|value - reference| / sigma`.
    pub report_deviation: bool,
}

/// A physical result derived from the fit, with its propagated uncertainty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedQuantity {
    pub label: String,
    /// Short symbol for chart legends, e.g. `T0`.
    pub symbol: String,
    pub unit: String,
    pub measured: Measured,
    pub precision: usize,
    pub reference: Option<Reference>,
}

impl DerivedQuantity {
    /// Deviation from the reference in sigma units, when one is reported.
    pub fn deviation(&self) -> Option<f64> {
        let reference = self.reference.as_ref()?;
        reference
            .report_deviation
            .then(|| self.measured.deviation(reference.value))
    }
}

/// Axis labels, title and legend of the experiment's chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Legend entry for the fitted line.
    pub fit_label: String,
    pub point_color: (u8, u8, u8),
    pub line_color: (u8, u8, u8),
    pub legend_upper_left: bool,
}

/// Units and symbols for the fit block of the report.
#[derive(Debug, Clone)]
pub struct FitLabels {
    pub slope_unit: String,
    pub intercept_symbol: char,
    pub intercept_unit: String,
    pub precision: usize,
}

/// Configuration of a single run (derived from CLI flags plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub experiment: Experiment,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub export_json: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(experiment: Experiment) -> Self {
        Self {
            experiment,
            input: experiment.default_input(),
            output_dir: PathBuf::from("plots"),
            export_json: None,
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(self.experiment.report_file_name())
    }

    pub fn chart_path(&self) -> PathBuf {
        self.output_dir.join(self.experiment.chart_file_name())
    }
}

/// JSON export of a run (`--export-json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub generated: String,
    pub experiment: Experiment,
    pub source: PathBuf,
    pub n_points: usize,
    pub slope: Measured,
    pub intercept: Measured,
    pub covariance: [[f64; 2]; 2],
    pub correlation: f64,
    pub chi_square: f64,
    pub dof: usize,
    pub passes: usize,
    pub quantities: Vec<QuantityRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityRecord {
    pub label: String,
    pub unit: String,
    pub value: f64,
    pub sigma: f64,
    pub reference: Option<f64>,
    pub deviation_sigma: Option<f64>,
}
