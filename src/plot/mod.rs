//! Chart rendering (SVG via `plotters`).

pub mod chart;

pub use chart::{CHART_SIZE, line_points, render_svg};
