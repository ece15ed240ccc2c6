#![deny(warnings)]

//! CSV ingest of model inputs and flat CSV export of results.
//!
//! Imports validate every row and report the 1-based line it came from, so
//! the core only ever sees well-formed ranges and segments.

mod export;
mod import;

pub use export::{write_comparison_csv, write_run_csv, write_sensitivity_csv};
pub use import::{read_fcr_segments, read_mortality, read_temperature_ranges};
