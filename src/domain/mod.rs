//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the experiment selector (`Experiment`) and run configuration (`RunConfig`)
//! - converted observations (`Sample`) and their uncertainties (`Sigma`)
//! - derived results (`DerivedQuantity`, `Reference`) and the JSON export schema

pub mod types;

pub use types::*;
