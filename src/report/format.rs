//! Plain-text lab report formatting.

use crate::domain::{DerivedQuantity, QuantityRecord, ReportFile};
use crate::experiments::Analysis;
use crate::math::Measured;

const RULE: &str = "------------------------------------------------------------";

/// Format the full report as written to stdout and the results file.
///
/// `timestamp` is passed in (rather than read from the clock) so output is
/// reproducible in tests.
pub fn format_report(analysis: &Analysis, timestamp: &str) -> String {
    let mut out = String::new();
    let labels = &analysis.fit_labels;
    let p = labels.precision;

    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Analysis Results: {}\n", analysis.experiment.title()));
    out.push_str(&format!("Date: {timestamp}\n"));
    out.push_str(&format!("File Analyzed: {}\n", analysis.source.display()));
    out.push_str(RULE);
    out.push('\n');

    out.push_str("Fit Parameters:\n");
    out.push_str(&format!(
        "  {:<15}{}\n",
        "Slope (m):",
        with_unit(&fmt_measured(analysis.fit.slope(), p), &labels.slope_unit)
    ));
    out.push_str(&format!(
        "  {:<15}{}\n",
        format!("Intercept ({}):", labels.intercept_symbol),
        with_unit(&fmt_measured(analysis.fit.intercept(), p), &labels.intercept_unit)
    ));
    if analysis.passes > 1 {
        out.push_str(&format!("  {:<15}{} (effective variance)\n", "Passes:", analysis.passes));
    }

    out.push_str("\nPhysics Results:\n");
    let width = label_width(&analysis.quantities);
    for (i, q) in analysis.quantities.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format_quantity(q, width));
    }
    out.push_str(RULE);
    out.push('\n');

    out
}

fn format_quantity(q: &DerivedQuantity, width: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<width$}{}\n",
        format!("{}:", q.label),
        with_unit(&fmt_measured(q.measured, q.precision), &q.unit)
    ));
    if let Some(reference) = &q.reference {
        out.push_str(&format!(
            "  {:<width$}{}\n",
            format!("{}:", reference.label),
            with_unit(&format!("{:.*}", reference.precision, reference.value), &q.unit)
        ));
    }
    if let Some(deviation) = q.deviation() {
        out.push_str(&format!("  {:<width$}{} sigma\n", "Deviation:", fmt_deviation(deviation)));
    }
    out
}

/// Width of the label column: longest label plus colon and padding.
fn label_width(quantities: &[DerivedQuantity]) -> usize {
    quantities
        .iter()
        .flat_map(|q| {
            std::iter::once(q.label.chars().count())
                .chain(q.reference.iter().map(|r| r.label.chars().count()))
        })
        .chain(std::iter::once("Deviation".len()))
        .max()
        .unwrap_or(0)
        + 2
}

/// `value+/-sigma` at a fixed number of decimals.
pub fn fmt_measured(m: Measured, precision: usize) -> String {
    format!("{:.p$}+/-{:.p$}", m.value, m.sigma, p = precision)
}

fn fmt_deviation(d: f64) -> String {
    if d.is_finite() {
        format!("{d:.1}")
    } else if d.is_nan() {
        "nan".to_string()
    } else {
        "inf".to_string()
    }
}

fn with_unit(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

/// Build the JSON export record for an analysis.
pub fn build_report_file(analysis: &Analysis, generated: &str) -> ReportFile {
    let c = &analysis.fit.covariance;
    ReportFile {
        tool: "lab".to_string(),
        generated: generated.to_string(),
        experiment: analysis.experiment,
        source: analysis.source.clone(),
        n_points: analysis.samples.len(),
        slope: analysis.fit.slope(),
        intercept: analysis.fit.intercept(),
        covariance: [[c[(0, 0)], c[(0, 1)]], [c[(1, 0)], c[(1, 1)]]],
        correlation: analysis.fit.correlation(),
        chi_square: analysis.fit.chi_square,
        dof: analysis.fit.dof(),
        passes: analysis.passes,
        quantities: analysis
            .quantities
            .iter()
            .map(|q| QuantityRecord {
                label: q.label.clone(),
                unit: q.unit.clone(),
                value: q.measured.value,
                sigma: q.measured.sigma,
                reference: q.reference.as_ref().map(|r| r.value),
                deviation_sigma: q.deviation(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::{HeatingConstants, heating};
    use crate::io::parse_table;
    use std::path::Path;

    fn heating_analysis() -> Analysis {
        let text = "Temperatur (C),Druck (hPa)\n0,1000\n10,1040\n20,1080\n30,1120\n";
        let table = parse_table(Path::new("data/v5_heating.csv"), text).unwrap();
        heating::analyze(&table, &HeatingConstants::default()).unwrap()
    }

    #[test]
    fn heating_report_layout() {
        let report = format_report(&heating_analysis(), "2026-02-01 10:00");
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "");
        assert_eq!(lines[1], RULE);
        assert_eq!(lines[2], "Analysis Results: Gas Thermometer (Heating)");
        assert_eq!(lines[3], "Date: 2026-02-01 10:00");
        assert_eq!(lines[4], "File Analyzed: data/v5_heating.csv");
        assert_eq!(lines[6], "Fit Parameters:");
        assert_eq!(lines[7], "  Slope (m):     4.0000+/-0.2236 hPa/°C");
        assert_eq!(lines[8], "  Intercept (b): 1000.0000+/-4.1833 hPa");
        assert_eq!(lines[9], "");
        assert_eq!(lines[10], "Physics Results:");
        assert_eq!(lines[11], "  Calculated Absolute Zero: -250.00+/-14.83 °C");
        assert_eq!(lines[12], "  Literature Value:         -273.15 °C");
        assert_eq!(lines[13], "  Deviation:                1.6 sigma");
        assert_eq!(lines[14], RULE);
        assert!(!report.contains("Passes:"));
    }

    #[test]
    fn multi_pass_fit_reports_pass_count() {
        let mut analysis = heating_analysis();
        analysis.passes = 3;
        let report = format_report(&analysis, "2026-02-01 10:00");
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[9], "  Passes:        3 (effective variance)");
        assert_eq!(lines[11], "Physics Results:");
    }

    #[test]
    fn measured_formatting() {
        assert_eq!(fmt_measured(Measured::new(1.40321, 0.01662), 4), "1.4032+/-0.0166");
        assert_eq!(fmt_deviation(f64::INFINITY), "inf");
        assert_eq!(fmt_deviation(f64::NAN), "nan");
        assert_eq!(fmt_deviation(Measured::new(1.4, 0.0).deviation(1.4)), "0.0");
    }

    #[test]
    fn report_file_carries_covariance_and_deviation() {
        let analysis = heating_analysis();
        let file = build_report_file(&analysis, "now");
        assert_eq!(file.n_points, 4);
        assert_eq!(file.dof, 2);
        assert_eq!(file.covariance[0][1], file.covariance[1][0]);
        assert!(file.correlation < 0.0);
        assert!(file.quantities[0].deviation_sigma.is_some());
    }
}
