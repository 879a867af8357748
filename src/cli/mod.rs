//! Command-line parsing for the lab analysis tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting/propagation code. Args are turned into plain config structs in
//! [`crate::app`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lab", version, about = "Weighted linear fits with uncertainty propagation for lab experiments")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gas thermometer (heating): absolute zero from the p(T) line.
    Heating(HeatingArgs),
    /// Specific heat of air: adiabatic exponent and degrees of freedom.
    SpecificHeat(SpecificHeatArgs),
    /// Vapor pressure (cooling): enthalpy of vaporization from an Arrhenius plot.
    Cooling(CoolingArgs),
    /// Monte Carlo check of the reported fit covariance on synthetic data.
    Simulate(SimulateArgs),
}

/// Options shared by every experiment.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Input data file (delimited text with a header row).
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory for the results text file and the chart.
    #[arg(short, long, value_name = "DIR", default_value = "plots")]
    pub output_dir: PathBuf,

    /// Also export the analysis as JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct HeatingArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Pressure uncertainty (hPa).
    #[arg(long, default_value_t = 5.0)]
    pub sigma_p: f64,

    /// Temperature uncertainty (°C), shown as x error bars.
    #[arg(long, default_value_t = 1.0)]
    pub sigma_t: f64,

    /// Literature absolute zero (°C).
    #[arg(long, default_value_t = -273.15, allow_hyphen_values = true)]
    pub literature_t0: f64,
}

#[derive(Debug, Args, Clone)]
pub struct SpecificHeatArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Capacitance (F).
    #[arg(long, default_value_t = 20e-6)]
    pub capacitance: f64,

    /// Voltage uncertainty (V).
    #[arg(long, default_value_t = 3.0)]
    pub sigma_u: f64,

    /// Manometer height uncertainty (mm).
    #[arg(long, default_value_t = 0.5)]
    pub sigma_h: f64,

    /// Vessel volume (m³).
    #[arg(long, default_value_t = 3.2e-3)]
    pub volume: f64,

    /// Vessel volume uncertainty (m³).
    #[arg(long, default_value_t = 1.29e-4)]
    pub sigma_volume: f64,

    /// Manometer liquid density (kg/m³).
    #[arg(long, default_value_t = 1000.0)]
    pub rho: f64,

    /// Gravitational acceleration (m/s²).
    #[arg(long, default_value_t = 9.81)]
    pub gravity: f64,
}

#[derive(Debug, Args, Clone)]
pub struct CoolingArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Total fit passes for the effective variance method (1 = y errors only).
    #[arg(long, default_value_t = 2)]
    pub passes: usize,

    /// Stop early once the relative slope change drops below this value.
    #[arg(long, allow_hyphen_values = true)]
    pub tolerance: Option<f64>,

    /// Relative pressure uncertainty.
    #[arg(long, default_value_t = 0.01)]
    pub pressure_rel_sigma: f64,

    /// Ohmmeter resolution (Ω).
    #[arg(long, default_value_t = 1.0)]
    pub resolution_ohm: f64,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// True slope.
    #[arg(long, default_value_t = 4.0, allow_hyphen_values = true)]
    pub slope: f64,

    /// True intercept.
    #[arg(long, default_value_t = 1000.0, allow_hyphen_values = true)]
    pub intercept: f64,

    /// Smallest x value.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub x_min: f64,

    /// Largest x value.
    #[arg(long, default_value_t = 30.0, allow_hyphen_values = true)]
    pub x_max: f64,

    /// Number of points per synthetic data set.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub points: usize,

    /// Gaussian noise on y.
    #[arg(long, default_value_t = 5.0)]
    pub sigma: f64,

    /// Number of Monte Carlo trials.
    #[arg(long, default_value_t = 2000)]
    pub trials: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export the summary as JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}
