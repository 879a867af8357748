//! Specific heat of air (Clément–Desormes style capacitor discharge).
//!
//! A capacitor discharged through a heating wire deposits `ΔQ = ½·C·U²` in a
//! closed air volume `V`; the manometer rise `Δh` gives `Δp = ρ·g·Δh`.
//! The slope of `Δp(ΔQ)` yields the adiabatic exponent `κ = m·V + 1` and the
//! degrees of freedom `f = 2/(κ - 1)`.
//!
//! `V` carries its own (independent) uncertainty, so both results are
//! propagated over `(m, b, V)`.

use tracing::info;

use crate::domain::{ChartSpec, DerivedQuantity, Experiment, FitLabels, Reference, Sample, Sigma};
use crate::error::{AppError, FitError};
use crate::experiments::{Analysis, require_positive};
use crate::fit::{SLOPE, fit_line};
use crate::io::Table;
use crate::math::{CorrelatedParams, Measured};

pub const VOLTAGE_COLUMN: &str = "Spannung (V)";
pub const HEIGHT_COLUMN: &str = "Delta_H (mm)";

/// Index of the vessel volume in the augmented parameter set.
const VOLUME: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SpecificHeatConstants {
    /// Capacitance (F).
    pub capacitance: f64,
    /// Voltage uncertainty (V), plotted as x error only.
    pub sigma_u: f64,
    /// Manometer height uncertainty (mm).
    pub sigma_h_mm: f64,
    /// Manometer liquid density (kg/m³).
    pub rho_water: f64,
    /// Gravitational acceleration (m/s²).
    pub gravity: f64,
    /// Vessel volume (m³).
    pub volume: f64,
    pub sigma_volume: f64,
    /// Literature adiabatic exponent of air.
    pub literature_kappa: f64,
    /// Expected degrees of freedom of a diatomic gas.
    pub expected_dof: f64,
}

impl Default for SpecificHeatConstants {
    fn default() -> Self {
        Self {
            capacitance: 20e-6,
            sigma_u: 3.0,
            sigma_h_mm: 0.5,
            rho_water: 1000.0,
            gravity: 9.81,
            volume: 3.2e-3,
            sigma_volume: 1.29e-4,
            literature_kappa: 1.40,
            expected_dof: 5.0,
        }
    }
}

impl SpecificHeatConstants {
    /// Electrical energy `½·C·U²` (J) and its uncertainty `C·|U|·σU`.
    pub fn energy(&self, voltage: f64) -> (f64, f64) {
        (
            0.5 * self.capacitance * voltage * voltage,
            self.capacitance * voltage.abs() * self.sigma_u,
        )
    }

    /// Hydrostatic pressure (Pa) of a column height given in mm.
    pub fn pressure(&self, height_mm: f64) -> f64 {
        self.rho_water * self.gravity * (height_mm / 1000.0)
    }

    pub fn sigma_pressure(&self) -> f64 {
        self.pressure(self.sigma_h_mm)
    }
}

pub fn analyze(table: &Table, c: &SpecificHeatConstants) -> Result<Analysis, AppError> {
    require_positive("capacitance", c.capacitance)?;
    require_positive("sigma_u", c.sigma_u)?;
    require_positive("sigma_h", c.sigma_h_mm)?;
    require_positive("rho_water", c.rho_water)?;
    require_positive("gravity", c.gravity)?;
    require_positive("volume", c.volume)?;
    if !(c.sigma_volume.is_finite() && c.sigma_volume >= 0.0) {
        return Err(AppError::new(2, format!("`sigma_volume` must be finite and >= 0, got {}", c.sigma_volume)));
    }

    let voltage = table.column(VOLTAGE_COLUMN)?;
    let height = table.column(HEIGHT_COLUMN)?;

    let samples: Vec<Sample> = voltage
        .iter()
        .zip(&height)
        .map(|(&u, &h)| {
            let (q, sigma_q) = c.energy(u);
            Sample {
                x: q,
                y: c.pressure(h),
                sigma_x: sigma_q,
                sigma_y: c.sigma_pressure(),
            }
        })
        .collect();

    let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.y).collect();
    let fit = fit_line(&xs, &ys, &Sigma::Uniform(c.sigma_pressure()))?;

    let params = fit.params()?.with_independent(Measured::new(c.volume, c.sigma_volume))?;
    let kappa = adiabatic_exponent(&params)?;
    let dof = degrees_of_freedom(&params)?;
    info!(slope = fit.slope, kappa = kappa.value, f = dof.value, "specific heat fit done");

    Ok(Analysis {
        experiment: Experiment::SpecificHeat,
        source: table.path.clone(),
        samples,
        fit,
        passes: 1,
        fit_labels: FitLabels {
            slope_unit: "Pa/J".to_string(),
            intercept_symbol: 'b',
            intercept_unit: "Pa".to_string(),
            precision: 2,
        },
        quantities: vec![
            DerivedQuantity {
                label: "Adiabatic Exponent (kappa)".to_string(),
                symbol: "κ".to_string(),
                unit: String::new(),
                measured: kappa,
                precision: 4,
                reference: Some(Reference {
                    label: "Literature Value (Air)".to_string(),
                    value: c.literature_kappa,
                    precision: 3,
                    report_deviation: true,
                }),
            },
            DerivedQuantity {
                label: "Degrees of Freedom (f)".to_string(),
                symbol: "f".to_string(),
                unit: String::new(),
                measured: dof,
                precision: 3,
                reference: Some(Reference {
                    label: "Expected Value (Diatomic)".to_string(),
                    value: c.expected_dof,
                    precision: 2,
                    report_deviation: false,
                }),
            },
        ],
        chart: ChartSpec {
            title: "Spezifische Wärme: Druckanstieg vs. Heizenergie".to_string(),
            x_label: "Elektrische Energie ΔQ [J]".to_string(),
            y_label: "Druckänderung Δp [Pa]".to_string(),
            fit_label: format!("Linear Fit: κ = {:.2} ± {:.2}", kappa.value, kappa.sigma),
            point_color: (0, 128, 128),
            line_color: (139, 0, 0),
            legend_upper_left: true,
        },
    })
}

/// `κ = m·V + 1` over `(m, b, V)`.
pub fn adiabatic_exponent(params: &CorrelatedParams) -> Result<Measured, FitError> {
    let v = params.values();
    let (m, volume) = (v[SLOPE], v[VOLUME]);
    params.propagate(|p| p[SLOPE] * p[VOLUME] + 1.0, &[volume, 0.0, m])
}

/// `f = 2/(κ - 1) = 2/(m·V)`, propagated from the same joint covariance as `κ`.
pub fn degrees_of_freedom(params: &CorrelatedParams) -> Result<Measured, FitError> {
    let v = params.values();
    let (m, volume) = (v[SLOPE], v[VOLUME]);
    let mv = m * volume;
    if mv == 0.0 {
        return Err(FitError::Numerical("kappa - 1 is zero; degrees of freedom undefined".to_string()));
    }
    params.propagate(
        |p| 2.0 / (p[SLOPE] * p[VOLUME]),
        &[-2.0 / (mv * m), 0.0, -2.0 / (mv * volume)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_table;
    use std::path::Path;

    #[test]
    fn conversions_match_lab_formulas() {
        let c = SpecificHeatConstants::default();
        let (q, sq) = c.energy(200.0);
        assert!((q - 0.4).abs() < 1e-12);
        assert!((sq - 0.012).abs() < 1e-12);
        assert!((c.pressure(10.0) - 98.1).abs() < 1e-9);
        assert!((c.sigma_pressure() - 4.905).abs() < 1e-9);
    }

    #[test]
    fn kappa_and_dof_from_exact_line() {
        let c = SpecificHeatConstants::default();
        // Choose Δp = 125·ΔQ so that κ = 125·3.2e-3 + 1 = 1.4 and f = 5.
        let voltages = [100.0, 150.0, 200.0, 250.0, 300.0];
        let mut text = String::from("Spannung (V);Delta_H (mm)\n");
        for u in voltages {
            let (q, _) = c.energy(u);
            let h_mm = 125.0 * q / (c.rho_water * c.gravity) * 1000.0;
            text.push_str(&format!("{u};{h_mm}\n"));
        }
        let table = parse_table(Path::new("v5_specific_heat.csv"), &text).unwrap();
        let analysis = analyze(&table, &c).unwrap();

        assert!((analysis.fit.slope - 125.0).abs() < 1e-6);
        let kappa = analysis.quantities[0].measured;
        let f = analysis.quantities[1].measured;
        assert!((kappa.value - 1.4).abs() < 1e-8);
        assert!((f.value - 5.0).abs() < 1e-6);

        // σκ² = V²σm² + m²σV²
        let sm = analysis.fit.slope().sigma;
        let expected = (c.volume * c.volume * sm * sm + 125.0f64.powi(2) * c.sigma_volume.powi(2)).sqrt();
        assert!((kappa.sigma - expected).abs() / expected < 1e-6);

        // f depends on κ alone, so |df/dκ|·σκ must agree.
        let chained = 2.0 / 0.4f64.powi(2) * kappa.sigma;
        assert!((f.sigma - chained).abs() / chained < 1e-6);

        assert!(analysis.quantities[0].deviation().unwrap() < 1e-6);
        assert!(analysis.quantities[1].deviation().is_none());
    }

    #[test]
    fn volume_uncertainty_contributes() {
        let fit = fit_line(&[0.1, 0.2, 0.3], &[12.5, 25.0, 37.5], &Sigma::Uniform(1.0)).unwrap();
        let exact = fit.params().unwrap().with_independent(Measured::new(3.2e-3, 0.0)).unwrap();
        let uncertain = fit.params().unwrap().with_independent(Measured::new(3.2e-3, 1.29e-4)).unwrap();
        assert!(adiabatic_exponent(&uncertain).unwrap().sigma > adiabatic_exponent(&exact).unwrap().sigma);
    }
}
