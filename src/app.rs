//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the run configuration and experiment constants
//! - runs the analysis pipeline
//! - prints the report and writes the outputs

use tracing::info;

use crate::cli::{Cli, Command, CommonArgs, CoolingArgs, HeatingArgs, SimulateArgs, SpecificHeatArgs};
use crate::domain::{Experiment, RunConfig};
use crate::error::AppError;
use crate::experiments::{Constants, CoolingConstants, HeatingConstants, SpecificHeatConstants};
use crate::fit::EffectiveVarianceOptions;
use crate::sim::SimConfig;

pub mod pipeline;

/// Entry point for the `lab` binary, with the CLI already parsed.
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Heating(args) => {
            let config = run_config(Experiment::Heating, &args.common);
            handle_experiment(&config, &heating_constants(&args))
        }
        Command::SpecificHeat(args) => {
            let config = run_config(Experiment::SpecificHeat, &args.common);
            handle_experiment(&config, &specific_heat_constants(&args))
        }
        Command::Cooling(args) => {
            let config = run_config(Experiment::Cooling, &args.common);
            handle_experiment(&config, &cooling_constants(&args))
        }
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn handle_experiment(config: &RunConfig, constants: &Constants) -> Result<(), AppError> {
    info!(experiment = ?config.experiment, input = %config.input.display(), "starting analysis");
    let output = pipeline::run(config, constants)?;
    print!("{}", output.report);
    pipeline::write_outputs(&output, config)?;
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = sim_config_from_args(args);
    let summary = crate::sim::monte_carlo(&config)?;
    print!("{}", crate::sim::format_summary(&config, &summary));

    if let Some(path) = &args.export_json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::new(2, format!("Failed to serialize summary: {e}")))?;
        crate::io::write_text(path, &json, "JSON export")?;
    }
    Ok(())
}

pub fn run_config(experiment: Experiment, args: &CommonArgs) -> RunConfig {
    let mut config = RunConfig::new(experiment);
    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    config.output_dir = args.output_dir.clone();
    config.export_json = args.export_json.clone();
    config
}

pub fn heating_constants(args: &HeatingArgs) -> Constants {
    Constants::Heating(HeatingConstants {
        sigma_p: args.sigma_p,
        sigma_t: args.sigma_t,
        literature_t0: args.literature_t0,
    })
}

pub fn specific_heat_constants(args: &SpecificHeatArgs) -> Constants {
    Constants::SpecificHeat(SpecificHeatConstants {
        capacitance: args.capacitance,
        sigma_u: args.sigma_u,
        sigma_h_mm: args.sigma_h,
        rho_water: args.rho,
        gravity: args.gravity,
        volume: args.volume,
        sigma_volume: args.sigma_volume,
        ..SpecificHeatConstants::default()
    })
}

pub fn cooling_constants(args: &CoolingArgs) -> Constants {
    Constants::Cooling(CoolingConstants {
        pressure_rel_sigma: args.pressure_rel_sigma,
        resolution_ohm: args.resolution_ohm,
        refinement: EffectiveVarianceOptions {
            max_iterations: args.passes,
            tolerance: args.tolerance,
        },
        ..CoolingConstants::default()
    })
}

pub fn sim_config_from_args(args: &SimulateArgs) -> SimConfig {
    SimConfig {
        slope: args.slope,
        intercept: args.intercept,
        xs: SimConfig::grid(args.x_min, args.x_max, args.points),
        sigma: args.sigma,
        trials: args.trials,
        seed: args.seed,
    }
}
