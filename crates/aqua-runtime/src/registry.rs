//! Latest completed run per scenario.

use crate::{CancellationToken, ProjectionEngine, ProjectionError};
use aqua_core::{ProjectionRun, Scenario, ScenarioId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Read access to committed runs.
pub trait RunSource {
    fn latest_run(&self, id: &ScenarioId) -> Option<Arc<ProjectionRun>>;
}

/// Holds at most one run per scenario. Readers get a shared handle to a
/// complete run; a commit swaps the handle, so a reader never observes a mix
/// of two runs.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<ScenarioId, Arc<ProjectionRun>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a run, replacing any prior run of the same scenario.
    pub fn replace(&self, run: ProjectionRun) -> Arc<ProjectionRun> {
        let run = Arc::new(run);
        let prior = self
            .runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run.scenario_id.clone(), Arc::clone(&run));
        debug!(scenario = %run.scenario_id, replaced = prior.is_some(), "run committed");
        run
    }

    /// Drop the run of a deleted scenario.
    pub fn remove(&self, id: &ScenarioId) -> Option<Arc<ProjectionRun>> {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run a scenario and commit the result. A failed or cancelled run leaves
    /// the previous run in place.
    pub fn run_and_commit(
        &self,
        scenario: &Scenario,
        cancel: &CancellationToken,
    ) -> Result<Arc<ProjectionRun>, ProjectionError> {
        let run = ProjectionEngine::new(scenario).run_with_cancel(cancel)?;
        info!(scenario = %scenario.id, days = run.days.len(), "replacing latest run");
        Ok(self.replace(run))
    }
}

impl RunSource for RunRegistry {
    fn latest_run(&self, id: &ScenarioId) -> Option<Arc<ProjectionRun>> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
