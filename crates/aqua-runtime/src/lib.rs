#![deny(warnings)]

//! Projection runtime: runs scenarios day by day and keeps the latest run per
//! scenario.
//!
//! A run is a pure function of the pinned scenario inputs. Hard failures abort
//! the run and nothing is committed; constraint findings are attached to the
//! affected days and never abort.

use aqua_core::{ProjectionRun, Scenario, ScenarioId, ValidationError};
use aqua_models::ModelError;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

mod engine;
mod registry;

pub use engine::{CancellationToken, ProjectionEngine};
pub use registry::{RunRegistry, RunSource};

/// Lifecycle of a single projection run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Running { day_index: u32 },
    Completed,
    Failed { reason: String },
}

/// Broad class of a projection failure, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Fix the scenario or model configuration and resubmit.
    Configuration,
    /// Input data is missing for part of the window.
    RuntimeData,
    /// An internal invariant was violated.
    Defect,
    /// Stopped on request.
    Cancelled,
}

/// Errors that abort a projection run.
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    /// Scenario or pinned inputs failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// A model failed while resolving or stepping.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// A model does not cover the simulated window.
    #[error("{model} does not cover the simulated window: {detail}")]
    IncompleteCoverage { model: &'static str, detail: String },
    /// Cancelled between days.
    #[error("run cancelled before day {0}")]
    Cancelled(u32),
    /// The engine has already been run.
    #[error("projection engine already ran ({0:?})")]
    AlreadyStarted(RunStatus),
}

impl ProjectionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProjectionError::Invalid(_) | ProjectionError::IncompleteCoverage { .. } => {
                FailureKind::Configuration
            }
            ProjectionError::Model(ModelError::MissingTemperatureData(_)) => {
                FailureKind::RuntimeData
            }
            ProjectionError::Model(ModelError::InvalidState(_))
            | ProjectionError::AlreadyStarted(_) => FailureKind::Defect,
            ProjectionError::Model(_) => FailureKind::Configuration,
            ProjectionError::Cancelled(_) => FailureKind::Cancelled,
        }
    }
}

/// Run one scenario to completion.
pub fn run_projection(scenario: &Scenario) -> Result<ProjectionRun, ProjectionError> {
    ProjectionEngine::new(scenario).run()
}

/// Run independent scenarios in parallel. Results keep the input order.
pub fn run_many(scenarios: &[Scenario]) -> Vec<(ScenarioId, Result<ProjectionRun, ProjectionError>)> {
    scenarios
        .par_iter()
        .map(|s| (s.id.clone(), run_projection(s)))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::scenario;
    use super::*;

    #[test]
    fn run_many_keeps_order_and_isolates_failures() {
        let ok = scenario();
        let mut bad = scenario();
        bad.id = ScenarioId("bad".to_string());
        bad.duration_days = 0;
        let mut other = scenario();
        other.id = ScenarioId("warm".to_string());
        other.growth.tgc = 3.0;

        let results = run_many(&[ok, bad, other]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0 .0, "base");
        assert!(results[0].1.is_ok());
        assert_eq!(
            results[1].1,
            Err(ProjectionError::Invalid(ValidationError::ZeroDuration))
        );
        let base = results[0].1.as_ref().unwrap().summary();
        let warm = results[2].1.as_ref().unwrap().summary();
        assert!(warm.final_weight_g > base.final_weight_g);
    }

    #[test]
    fn failure_kinds() {
        assert_eq!(
            ProjectionError::Invalid(ValidationError::ZeroDuration).kind(),
            FailureKind::Configuration
        );
        assert_eq!(
            ProjectionError::Model(ModelError::NoStageSegment("day 3".into())).kind(),
            FailureKind::Configuration
        );
        assert_eq!(
            ProjectionError::Model(ModelError::MissingTemperatureData(
                fixtures::date(2024, 1, 1)
            ))
            .kind(),
            FailureKind::RuntimeData
        );
        assert_eq!(
            ProjectionError::Model(ModelError::InvalidState("x".into())).kind(),
            FailureKind::Defect
        );
        assert_eq!(ProjectionError::Cancelled(4).kind(), FailureKind::Cancelled);
    }
}
