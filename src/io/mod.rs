//! Input/output helpers.
//!
//! - delimited-text ingest with delimiter sniffing (`ingest`)
//! - report, chart and JSON writers (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
