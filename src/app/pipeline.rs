//! Shared "analysis pipeline" logic.
//!
//! load -> analyze (fit + propagation) -> report text -> chart -> outputs
//!
//! [`run`] computes everything in memory; [`write_outputs`] only touches the
//! filesystem afterwards, so a failed run never leaves partial results behind.

use std::path::PathBuf;

use tracing::info;

use crate::domain::{ReportFile, RunConfig};
use crate::error::AppError;
use crate::experiments::{Analysis, Constants};
use crate::io::OutputFile;

/// All computed outputs of a single experiment run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub analysis: Analysis,
    pub report: String,
    pub chart_svg: String,
    pub report_file: ReportFile,
}

/// Execute the full analysis and return the computed outputs.
pub fn run(config: &RunConfig, constants: &Constants) -> Result<RunOutput, AppError> {
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    run_at(config, constants, &generated)
}

/// Same as [`run`] with a fixed timestamp.
pub fn run_at(config: &RunConfig, constants: &Constants, generated: &str) -> Result<RunOutput, AppError> {
    if constants.experiment() != config.experiment {
        return Err(AppError::new(
            2,
            format!(
                "Constants for {:?} do not match experiment {:?}",
                constants.experiment(),
                config.experiment
            ),
        ));
    }

    // 1) Load the data table.
    let table = crate::io::load_table(&config.input)?;

    // 2) Fit and propagate.
    let analysis = crate::experiments::analyze(&table, constants)?;

    // 3) Report text, chart and export record.
    let report = crate::report::format_report(&analysis, generated);
    let chart_svg = crate::plot::render_svg(&analysis)?;
    let report_file = crate::report::build_report_file(&analysis, generated);

    Ok(RunOutput {
        analysis,
        report,
        chart_svg,
        report_file,
    })
}

/// Write the results text file, the chart and the optional JSON export.
///
/// Either every output lands or none does. Returns the paths written, in order.
pub fn write_outputs(output: &RunOutput, config: &RunConfig) -> Result<Vec<PathBuf>, AppError> {
    let mut files = vec![
        OutputFile {
            path: config.report_path(),
            contents: output.report.clone(),
            what: "results",
        },
        OutputFile {
            path: config.chart_path(),
            contents: output.chart_svg.clone(),
            what: "chart",
        },
    ];
    if let Some(path) = &config.export_json {
        files.push(OutputFile {
            path: path.clone(),
            contents: crate::io::report_json(&output.report_file)?,
            what: "JSON export",
        });
    }

    crate::io::write_all(&files)?;
    info!(files = files.len(), "outputs written");
    Ok(files.into_iter().map(|f| f.path).collect())
}
