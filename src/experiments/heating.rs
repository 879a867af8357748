//! Gas thermometer, heating phase.
//!
//! The pressure of a fixed gas volume rises linearly with temperature,
//! `p = m·T + b`. Extrapolating to `p = 0` gives the absolute zero
//! `T0 = -b/m` (in °C), whose uncertainty depends on the slope/intercept
//! correlation.

use tracing::info;

use crate::domain::{ChartSpec, DerivedQuantity, Experiment, FitLabels, Reference, Sample, Sigma};
use crate::error::{AppError, FitError};
use crate::experiments::{Analysis, require_positive};
use crate::fit::{LinearFit, fit_line};
use crate::io::Table;
use crate::math::Measured;

pub const TEMPERATURE_COLUMN: &str = "Temperatur (C)";
pub const PRESSURE_COLUMN: &str = "Druck (hPa)";

#[derive(Debug, Clone, PartialEq)]
pub struct HeatingConstants {
    /// Pressure uncertainty (hPa), used as the fit weight.
    pub sigma_p: f64,
    /// Temperature uncertainty (°C), plotted only.
    pub sigma_t: f64,
    /// Literature value of absolute zero (°C).
    pub literature_t0: f64,
}

impl Default for HeatingConstants {
    fn default() -> Self {
        Self {
            sigma_p: 5.0,
            sigma_t: 1.0,
            literature_t0: -273.15,
        }
    }
}

pub fn analyze(table: &Table, c: &HeatingConstants) -> Result<Analysis, AppError> {
    require_positive("sigma_p", c.sigma_p)?;
    require_positive("sigma_t", c.sigma_t)?;

    let temperature = table.column(TEMPERATURE_COLUMN)?;
    let pressure = table.column(PRESSURE_COLUMN)?;

    let fit = fit_line(&temperature, &pressure, &Sigma::Uniform(c.sigma_p))?;
    let t0 = absolute_zero(&fit)?;
    info!(slope = fit.slope, intercept = fit.intercept, t0 = t0.value, "heating fit done");

    let samples = temperature
        .iter()
        .zip(&pressure)
        .map(|(&x, &y)| Sample {
            x,
            y,
            sigma_x: c.sigma_t,
            sigma_y: c.sigma_p,
        })
        .collect();

    Ok(Analysis {
        experiment: Experiment::Heating,
        source: table.path.clone(),
        samples,
        passes: 1,
        fit_labels: FitLabels {
            slope_unit: "hPa/°C".to_string(),
            intercept_symbol: 'b',
            intercept_unit: "hPa".to_string(),
            precision: 4,
        },
        quantities: vec![DerivedQuantity {
            label: "Calculated Absolute Zero".to_string(),
            symbol: "T0".to_string(),
            unit: "°C".to_string(),
            measured: t0,
            precision: 2,
            reference: Some(Reference {
                label: "Literature Value".to_string(),
                value: c.literature_t0,
                precision: 2,
                report_deviation: true,
            }),
        }],
        chart: ChartSpec {
            title: "Gasthermometer Erwärmung: Druck gegen Temperatur".to_string(),
            x_label: "Temperatur [°C]".to_string(),
            y_label: "Druck [hPa]".to_string(),
            fit_label: format!("Fit: T0 = {:.1} ± {:.1} °C", t0.value, t0.sigma),
            point_color: (255, 165, 0),
            line_color: (0, 128, 0),
            legend_upper_left: true,
        },
        fit,
    })
}

/// `T0 = -b/m` with `∇T0 = (b/m², -1/m)`.
pub fn absolute_zero(fit: &LinearFit) -> Result<Measured, FitError> {
    let (m, b) = (fit.slope, fit.intercept);
    if m == 0.0 {
        return Err(FitError::Numerical("slope is zero; the line never reaches p = 0".to_string()));
    }
    fit.propagate(|m, b| -b / m, [b / (m * m), -1.0 / m])
}
