//! Mathematical utilities: weighted least squares and error propagation.

pub mod ols;
pub mod propagate;

pub use ols::*;
pub use propagate::*;
