//! Reporting utilities: the plain-text lab report and the JSON export record.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

pub mod format;

pub use format::*;
