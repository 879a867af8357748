//! `lab-analysis` library crate.
//!
//! Weighted straight-line fits with full covariance propagation for three lab
//! experiments (gas thermometer, specific heat of air, vapor pressure).
//!
//! The binary (`lab`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the numeric core (`math`, `fit`) stays free of I/O

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod experiments;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod sim;
