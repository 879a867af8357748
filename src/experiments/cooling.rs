//! Vapor pressure of water, cooling phase (Clausius–Clapeyron).
//!
//! Temperature is read from a Pt1000 resistance thermometer and converted with
//! the Callendar–Van Dusen equation (T ≥ 0 °C branch). In Arrhenius form
//!
//! ```text
//! ln p = -ΔH/R · 1/T + c
//! ```
//!
//! so the slope gives the enthalpy of vaporization `ΔH = -m·R`. Both axes carry
//! uncertainty, so the fit uses the effective variance method.

use tracing::info;

use crate::domain::{ChartSpec, DerivedQuantity, Experiment, FitLabels, Reference, Sample, Sigma};
use crate::error::{AppError, FitError};
use crate::experiments::{Analysis, require_positive};
use crate::fit::{EffectiveVarianceOptions, LinearFit, fit_effective_variance};
use crate::io::Table;
use crate::math::Measured;

pub const PRESSURE_COLUMN: &str = "Druck (Bar)";
pub const RESISTANCE_COLUMN: &str = "Ohmzahl (Ohm)";

const KELVIN_OFFSET: f64 = 273.15;

/// Callendar–Van Dusen coefficients of a platinum resistance thermometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rtd {
    pub a: f64,
    pub b: f64,
    /// Resistance at 0 °C (Ω).
    pub r0: f64,
}

impl Rtd {
    /// IEC 60751 Pt1000.
    pub const PT1000: Rtd = Rtd {
        a: 3.9083e-3,
        b: -5.775e-7,
        r0: 1000.0,
    };

    /// Temperature (°C) for a resistance (Ω), or `None` outside the invertible range.
    pub fn temperature(&self, resistance: f64) -> Option<f64> {
        let discriminant = self.a * self.a - 4.0 * self.b * (1.0 - resistance / self.r0);
        if !(discriminant.is_finite() && discriminant >= 0.0) {
            return None;
        }
        let t = (-self.a + discriminant.sqrt()) / (2.0 * self.b);
        t.is_finite().then_some(t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoolingConstants {
    pub rtd: Rtd,
    /// Molar gas constant (J/(mol·K)).
    pub gas_constant: f64,
    /// Literature enthalpy of vaporization at 100 °C (kJ/mol).
    pub literature_kj: f64,
    /// Ohmmeter resolution (Ω).
    pub resolution_ohm: f64,
    /// Sensor sensitivity near the working point (Ω/K).
    pub sensitivity_ohm_per_k: f64,
    /// Tolerance class: `offset + slope·T` (K).
    pub tolerance_offset: f64,
    pub tolerance_slope: f64,
    /// Relative pressure uncertainty.
    pub pressure_rel_sigma: f64,
    pub refinement: EffectiveVarianceOptions,
}

impl Default for CoolingConstants {
    fn default() -> Self {
        Self {
            rtd: Rtd::PT1000,
            gas_constant: 8.31446,
            literature_kj: 40.66,
            resolution_ohm: 1.0,
            sensitivity_ohm_per_k: 3.85,
            tolerance_offset: 0.3,
            tolerance_slope: 0.005,
            pressure_rel_sigma: 0.01,
            refinement: EffectiveVarianceOptions::default(),
        }
    }
}

impl CoolingConstants {
    /// Temperature uncertainty (K): resolution and class tolerance in quadrature.
    pub fn sigma_temperature(&self, celsius: f64) -> f64 {
        let resolution = self.resolution_ohm / self.sensitivity_ohm_per_k;
        let tolerance = self.tolerance_offset + self.tolerance_slope * celsius;
        resolution.hypot(tolerance)
    }

    /// Arrhenius-plot sample `(1/T, ln p)` with propagated axis errors.
    pub fn arrhenius_sample(&self, pressure_bar: f64, celsius: f64) -> Sample {
        let kelvin = celsius + KELVIN_OFFSET;
        let sigma_p = self.pressure_rel_sigma * pressure_bar;
        Sample {
            x: 1.0 / kelvin,
            y: pressure_bar.ln(),
            sigma_x: self.sigma_temperature(celsius) / (kelvin * kelvin),
            sigma_y: sigma_p / pressure_bar,
        }
    }
}

pub fn analyze(table: &Table, c: &CoolingConstants) -> Result<Analysis, AppError> {
    require_positive("gas_constant", c.gas_constant)?;
    require_positive("pressure_rel_sigma", c.pressure_rel_sigma)?;
    require_positive("sensitivity", c.sensitivity_ohm_per_k)?;
    require_positive("rtd.r0", c.rtd.r0)?;

    let pressure = table.column(PRESSURE_COLUMN)?;
    let resistance = table.column(RESISTANCE_COLUMN)?;

    let mut samples = Vec::with_capacity(pressure.len());
    for (row, (&p, &r)) in pressure.iter().zip(&resistance).enumerate() {
        let line = row + 2;
        if p <= 0.0 {
            return Err(AppError::new(
                2,
                format!("Pressure must be > 0 bar for ln(p), got {p} (line {line})"),
            ));
        }
        let celsius = c.rtd.temperature(r).ok_or_else(|| {
            AppError::new(
                2,
                format!("Resistance {r} Ohm is outside the thermometer's range (line {line})"),
            )
        })?;
        if celsius + KELVIN_OFFSET <= 0.0 {
            return Err(AppError::new(
                2,
                format!("Resistance {r} Ohm converts below absolute zero (line {line})"),
            ));
        }
        samples.push(c.arrhenius_sample(p, celsius));
    }

    let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.y).collect();
    let refined = fit_effective_variance(
        &xs,
        &ys,
        &Sigma::PerPoint(samples.iter().map(|s| s.sigma_x).collect()),
        &Sigma::PerPoint(samples.iter().map(|s| s.sigma_y).collect()),
        c.refinement,
    )?;
    let fit = refined.fit;
    let delta_h = enthalpy_kj(&fit, c.gas_constant)?;
    info!(
        slope = fit.slope,
        passes = refined.passes,
        delta_h_kj = delta_h.value,
        "cooling fit done"
    );

    Ok(Analysis {
        experiment: Experiment::Cooling,
        source: table.path.clone(),
        samples,
        fit,
        passes: refined.passes,
        fit_labels: FitLabels {
            slope_unit: "K".to_string(),
            intercept_symbol: 'c',
            intercept_unit: String::new(),
            precision: 4,
        },
        quantities: vec![DerivedQuantity {
            label: "Enthalpy of Vaporization".to_string(),
            symbol: "ΔH".to_string(),
            unit: "kJ/mol".to_string(),
            measured: delta_h,
            precision: 2,
            reference: Some(Reference {
                label: "Literature Value (100°C)".to_string(),
                value: c.literature_kj,
                precision: 2,
                report_deviation: true,
            }),
        }],
        chart: ChartSpec {
            title: "Arrheniusplot Abkühlung: ln(p) vs 1/T".to_string(),
            x_label: "Reziproke Temperatur 1/T [1/K]".to_string(),
            y_label: "Log-Druck ln(p/1 bar)".to_string(),
            fit_label: format!("Fit: ΔH = {:.2} ± {:.2} kJ/mol", delta_h.value, delta_h.sigma),
            point_color: (0, 0, 255),
            line_color: (0, 255, 255),
            legend_upper_left: false,
        },
    })
}

/// `ΔH = -m·R`, in kJ/mol.
pub fn enthalpy_kj(fit: &LinearFit, gas_constant: f64) -> Result<Measured, FitError> {
    let k = -gas_constant / 1000.0;
    fit.propagate(|m, _| k * m, [k, 0.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_table;
    use std::path::Path;

    /// Inverse of the Callendar–Van Dusen equation for T ≥ 0 °C.
    fn resistance(rtd: &Rtd, celsius: f64) -> f64 {
        rtd.r0 * (1.0 + rtd.a * celsius + rtd.b * celsius * celsius)
    }

    #[test]
    fn pt1000_round_trips_reference_points() {
        let rtd = Rtd::PT1000;
        assert!(rtd.temperature(1000.0).unwrap().abs() < 1e-9);
        // IEC 60751 table value: 1385.055 Ω at 100 °C.
        assert!((rtd.temperature(1385.055).unwrap() - 100.0).abs() < 1e-3);
        assert!(rtd.temperature(1e9).is_none());
    }

    #[test]
    fn sigma_temperature_combines_resolution_and_tolerance() {
        let c = CoolingConstants::default();
        let expected = ((1.0f64 / 3.85).powi(2) + 0.8f64.powi(2)).sqrt();
        assert!((c.sigma_temperature(100.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn enthalpy_recovered_from_clausius_clapeyron_data() {
        let c = CoolingConstants::default();
        // ln p = -ΔH/R · (1/T - 1/373.15) with ΔH = 40.66 kJ/mol.
        let delta_h = 40_660.0;
        let mut text = String::from("Druck (Bar)\tOhmzahl (Ohm)\n");
        for celsius in [60.0, 70.0, 80.0, 90.0, 100.0] {
            let kelvin: f64 = celsius + KELVIN_OFFSET;
            let p = (-delta_h / c.gas_constant * (1.0 / kelvin - 1.0 / 373.15)).exp();
            text.push_str(&format!("{p}\t{}\n", resistance(&c.rtd, celsius)));
        }
        let table = parse_table(Path::new("v7_cooling.csv"), &text).unwrap();
        let analysis = analyze(&table, &c).unwrap();

        assert_eq!(analysis.passes, 2);
        let dh = analysis.quantities[0].measured;
        assert!((dh.value - 40.66).abs() < 1e-4, "{dh:?}");
        assert!(dh.sigma > 0.0);
        assert!(analysis.quantities[0].deviation().unwrap() < 0.01);
    }

    #[test]
    fn non_positive_pressure_is_input_error() {
        let table = parse_table(
            Path::new("v7_cooling.csv"),
            "Druck (Bar),Ohmzahl (Ohm)\n0.5,1300\n0,1350\n",
        )
        .unwrap();
        let err = analyze(&table, &CoolingConstants::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("line 3"));
    }

    #[test]
    fn resistance_outside_thermometer_range_is_input_error() {
        // Above ~7613 Ohm the Callendar-Van Dusen discriminant turns negative.
        assert!(Rtd::PT1000.temperature(10_000.0).is_none());
        let table = parse_table(
            Path::new("v7_cooling.csv"),
            "Druck (Bar),Ohmzahl (Ohm)\n0.5,1300\n0.7,10000\n1.0,1385\n",
        )
        .unwrap();
        let err = analyze(&table, &CoolingConstants::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("10000"), "{}", err.message());
        assert!(err.message().contains("line 3"), "{}", err.message());
    }

    #[test]
    fn enthalpy_gradient_is_linear_in_slope() {
        let fit = LinearFit {
            slope: -4890.0,
            intercept: 13.1,
            covariance: nalgebra::Matrix2::new(400.0, -1.1, -1.1, 0.003),
            chi_square: 0.0,
            n: 5,
        };
        let dh = enthalpy_kj(&fit, 8.31446).unwrap();
        assert!((dh.value - 4890.0 * 8.31446 / 1000.0).abs() < 1e-9);
        assert!((dh.sigma - 20.0 * 8.31446 / 1000.0).abs() < 1e-12);
    }
}
