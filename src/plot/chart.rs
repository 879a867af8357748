//! SVG chart of the measured points and the fitted line.
//!
//! The chart is rendered into an in-memory string first; the pipeline only
//! writes it to disk once every step of the run has succeeded.

use plotters::prelude::*;

use crate::error::AppError;
use crate::experiments::Analysis;
use crate::fit::LinearFit;

/// Chart size in SVG pixels.
pub const CHART_SIZE: (u32, u32) = (800, 600);

/// Number of points used to draw the fitted line.
const LINE_POINTS: usize = 100;

/// Render the analysis chart as an SVG document.
pub fn render_svg(analysis: &Analysis) -> Result<String, AppError> {
    if analysis.samples.is_empty() {
        return Err(AppError::new(3, "Nothing to plot: no samples."));
    }
    let mut svg = String::new();
    draw(analysis, &mut svg).map_err(|e| AppError::new(2, format!("Failed to render chart: {e}")))?;
    Ok(svg)
}

fn draw(analysis: &Analysis, out: &mut String) -> Result<(), Box<dyn std::error::Error>> {
    let spec = &analysis.chart;
    let samples = &analysis.samples;

    let (data_x0, data_x1) = extent(samples.iter().map(|s| s.x));
    let line = line_points(&analysis.fit, data_x0, data_x1, LINE_POINTS);
    let (x0, x1) = padded(extent(samples.iter().flat_map(|s| [s.x - s.sigma_x, s.x + s.sigma_x])));
    let (y0, y1) = padded(extent(
        samples
            .iter()
            .flat_map(|s| [s.y - s.sigma_y, s.y + s.sigma_y])
            .chain(line.iter().map(|&(_, y)| y)),
    ));

    let root = SVGBackend::with_string(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    let x_span = x1 - x0;
    let y_span = y1 - y0;
    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|v| format_tick(*v, x_span))
        .y_label_formatter(&|v| format_tick(*v, y_span))
        .light_line_style(&RGBColor(235, 235, 235))
        .draw()?;

    let (r, g, b) = spec.point_color;
    let point_color = RGBColor(r, g, b);
    let (r, g, b) = spec.line_color;
    let line_color = RGBColor(r, g, b);
    let bar_style = RGBColor(128, 128, 128).stroke_width(1);

    // 1) Error bars (drawn first so the markers sit on top).
    chart.draw_series(
        samples
            .iter()
            .filter(|s| s.sigma_y > 0.0)
            .map(|s| ErrorBar::new_vertical(s.x, s.y - s.sigma_y, s.y, s.y + s.sigma_y, bar_style, 6)),
    )?;
    chart.draw_series(
        samples
            .iter()
            .filter(|s| s.sigma_x > 0.0)
            .map(|s| ErrorBar::new_horizontal(s.y, s.x - s.sigma_x, s.x, s.x + s.sigma_x, bar_style, 6)),
    )?;

    // 2) Observations.
    chart
        .draw_series(samples.iter().map(|s| Circle::new((s.x, s.y), 4, point_color.filled())))?
        .label("Messdaten")
        .legend(move |(x, y)| Circle::new((x, y), 4, point_color.filled()));

    // 3) Fitted line.
    chart
        .draw_series(LineSeries::new(line, line_color.stroke_width(2)))?
        .label(spec.fit_label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_color.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(if spec.legend_upper_left {
            SeriesLabelPosition::UpperLeft
        } else {
            SeriesLabelPosition::UpperRight
        })
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Evenly spaced points of the fitted line over `[x0, x1]`.
pub fn line_points(fit: &LinearFit, x0: f64, x1: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x0 + u * (x1 - x0);
            (x, fit.predict(x))
        })
        .collect()
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Pad a range by 5% each side; widen degenerate ranges.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(hi.abs()).max(1.0) {
        let half = (lo.abs() * 0.05).max(0.5);
        return (lo - half, hi + half);
    }
    (lo - 0.05 * span, hi + 0.05 * span)
}

/// Tick label with enough decimals for the axis span.
fn format_tick(v: f64, span: f64) -> String {
    if span > 0.0 && span < 1e-2 {
        return format!("{v:.2e}");
    }
    let decimals = if span > 0.0 {
        (2.0 - span.log10().floor()).clamp(0.0, 4.0) as usize
    } else {
        2
    };
    format!("{v:.decimals$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::{CoolingConstants, HeatingConstants, cooling, heating};
    use crate::io::parse_table;
    use std::path::Path;

    #[test]
    fn line_points_span_data_range() {
        let fit = LinearFit {
            slope: 2.0,
            intercept: 1.0,
            covariance: nalgebra::Matrix2::identity(),
            chi_square: 0.0,
            n: 3,
        };
        let pts = line_points(&fit, 0.0, 10.0, 100);
        assert_eq!(pts.len(), 100);
        assert_eq!(pts[0], (0.0, 1.0));
        assert_eq!(pts[99], (10.0, 21.0));
    }

    #[test]
    fn padded_widens_degenerate_ranges() {
        let (lo, hi) = padded((5.0, 5.0));
        assert!(lo < 5.0 && hi > 5.0);
        let (lo, hi) = padded((0.0, 10.0));
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn tick_precision_follows_span() {
        assert_eq!(format_tick(1040.0, 200.0), "1040");
        assert_eq!(format_tick(1.25, 1.0), "1.25");
        assert_eq!(format_tick(0.00291, 0.0004), "2.91e-3");
    }

    #[test]
    fn heating_chart_is_svg_with_legend() {
        let text = "Temperatur (C),Druck (hPa)\n0,1000\n10,1040\n20,1080\n30,1120\n";
        let table = parse_table(Path::new("v5_heating.csv"), text).unwrap();
        let analysis = heating::analyze(&table, &HeatingConstants::default()).unwrap();
        let svg = render_svg(&analysis).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Messdaten"));
        assert!(svg.contains("Gasthermometer"));
    }

    #[test]
    fn cooling_chart_renders_small_axis_values() {
        let c = CoolingConstants::default();
        let text = "Druck (Bar),Ohmzahl (Ohm)\n0.2,1250\n0.3,1280\n0.5,1310\n0.7,1340\n1.0,1385\n";
        let table = parse_table(Path::new("v7_cooling.csv"), text).unwrap();
        let analysis = cooling::analyze(&table, &c).unwrap();
        let svg = render_svg(&analysis).unwrap();
        assert!(svg.contains("Arrheniusplot"));
    }
}
