#![deny(warnings)]

//! Biological models for growth projections.
//!
//! This crate provides validated, side-effect free building blocks:
//! - Temperature range resolution into a per-day lookup
//! - Thermal growth coefficient (TGC) weight recurrence
//! - Stage-segmented feed conversion (FCR)
//! - Daily or weekly mortality
//! - Advisory checks against biological constraint sets

use aqua_core::ValidationError;
use chrono::NaiveDate;
use thiserror::Error;

pub mod constraints;
pub mod feed;
pub mod growth;
pub mod mortality;
pub mod temperature;

pub use constraints::{check, StageTenure};
pub use feed::FcrModel;
pub use growth::TgcModel;
pub use mortality::MortalityModel;
pub use temperature::{ResolvedSegment, SegmentValue, TemperatureSeries};

/// Errors produced by the model helpers.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// Two input ranges overlap with different values.
    #[error(
        "conflicting temperature ranges: {first_start}..={first_end} at {first_c} °C \
         overlaps {second_start}..={second_end} at {second_c} °C"
    )]
    ConflictingRange {
        first_start: NaiveDate,
        first_end: NaiveDate,
        first_c: f64,
        second_start: NaiveDate,
        second_end: NaiveDate,
        second_c: f64,
    },
    /// No resolved temperature for a date.
    #[error("no temperature data for {0}")]
    MissingTemperatureData(NaiveDate),
    /// A lookup key falls outside every FCR segment.
    #[error("no FCR stage segment for {0}")]
    NoStageSegment(String),
    /// An upstream invariant was violated.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Model configuration failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
