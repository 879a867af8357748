//! Weighted straight-line fitting.
//!
//! Responsibilities:
//!
//! - fit `y = m·x + b` with absolute per-point sigmas and keep the `(m, b)` covariance
//! - fold x-axis uncertainty into the weights (effective variance method)

pub mod effective_variance;
pub mod linear;

pub use effective_variance::*;
pub use linear::*;
