//! Day-by-day projection engine.

use crate::{ProjectionError, RunStatus};
use aqua_core::{
    validate_snapshot, ModelSnapshot, ProjectionDay, ProjectionRun, Scenario, ScenarioId, StageId,
};
use aqua_models::{
    check, FcrModel, ModelError, MortalityModel, StageTenure, TemperatureSeries, TgcModel,
};
use chrono::Days;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Shared flag checked between simulated days.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Single-use engine for one scenario. Inputs are pinned at construction, so
/// later edits to the scenario do not affect the run.
#[derive(Debug)]
pub struct ProjectionEngine {
    scenario_id: ScenarioId,
    snapshot: ModelSnapshot,
    status: RunStatus,
    /// Fires the token once this many days have been built.
    #[cfg(test)]
    cancel_after: Option<(u32, CancellationToken)>,
}

/// Models resolved once before the loop.
struct Prepared {
    series: TemperatureSeries,
    growth: TgcModel,
    feed: FcrModel,
    mortality: MortalityModel,
}

impl ProjectionEngine {
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            scenario_id: scenario.id.clone(),
            snapshot: ModelSnapshot::of(scenario),
            status: RunStatus::NotStarted,
            #[cfg(test)]
            cancel_after: None,
        }
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn snapshot(&self) -> &ModelSnapshot {
        &self.snapshot
    }

    /// Run to completion.
    pub fn run(&mut self) -> Result<ProjectionRun, ProjectionError> {
        self.run_with_cancel(&CancellationToken::default())
    }

    /// Run, stopping between days once `cancel` fires. On any error the
    /// partial sequence is discarded.
    pub fn run_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<ProjectionRun, ProjectionError> {
        if self.status != RunStatus::NotStarted {
            return Err(ProjectionError::AlreadyStarted(self.status.clone()));
        }
        let span = info_span!("projection", scenario = %self.scenario_id);
        let _enter = span.enter();

        let result = self.execute(cancel);
        match &result {
            Ok(run) => {
                self.status = RunStatus::Completed;
                let summary = run.summary();
                info!(
                    days = summary.days,
                    final_weight_g = summary.final_weight_g,
                    final_population = summary.final_population,
                    total_feed_kg = summary.total_feed_kg,
                    "projection completed"
                );
                if summary.violation_count > 0 {
                    warn!(violations = summary.violation_count, "constraint violations recorded");
                }
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "projection failed");
                self.status = RunStatus::Failed {
                    reason: e.to_string(),
                };
            }
        }
        result
    }

    fn prepare(&self) -> Result<Prepared, ProjectionError> {
        let snap = &self.snapshot;
        validate_snapshot(snap)?;
        let series = TemperatureSeries::from_profile(&snap.growth.temperature)?;
        let growth = TgcModel::from_config(&snap.growth)?;
        let feed = FcrModel::from_config(&snap.feed)?;
        let mortality = MortalityModel::from_config(&snap.mortality)?;

        if !series.spans(snap.start_date, snap.duration_days) {
            return Err(ProjectionError::IncompleteCoverage {
                model: "temperature series",
                detail: format!(
                    "{} days from {} outside {:?}..={:?}",
                    snap.duration_days,
                    snap.start_date,
                    series.min_date(),
                    series.max_date()
                ),
            });
        }
        if let Some(day) = feed.first_uncovered_day(snap.duration_days, snap.initial_weight_g) {
            return Err(ProjectionError::IncompleteCoverage {
                model: "feed model",
                detail: format!("no stage segment for day {day}"),
            });
        }
        Ok(Prepared {
            series,
            growth,
            feed,
            mortality,
        })
    }

    fn execute(&mut self, cancel: &CancellationToken) -> Result<ProjectionRun, ProjectionError> {
        let models = self.prepare()?;
        let snap = &self.snapshot;
        info!(
            start = %snap.start_date,
            days = snap.duration_days,
            initial_count = snap.initial_count,
            initial_weight_g = snap.initial_weight_g,
            "projection started"
        );

        let mut days = Vec::with_capacity((snap.duration_days as usize).min(4096));
        let mut weight = snap.initial_weight_g;
        let mut population = snap.initial_count;
        let mut cumulative_feed_kg = 0.0;
        let mut tenure: Option<(StageId, u32)> = None;

        for day_index in 0..snap.duration_days {
            if cancel.is_cancelled() {
                return Err(ProjectionError::Cancelled(day_index));
            }
            self.status = RunStatus::Running { day_index };

            let date = snap
                .start_date
                .checked_add_days(Days::new(u64::from(day_index)))
                .ok_or_else(|| ModelError::InvalidState(format!("date overflow on day {day_index}")))?;
            let temperature_c = models.series.lookup(date)?;
            let stage = models.feed.segment_for(day_index, weight)?.stage.clone();
            let next_weight = models.growth.next_weight(weight, temperature_c, 1.0)?;

            let biomass_before = population as f64 * weight / 1000.0;
            let biomass_after = population as f64 * next_weight / 1000.0;
            let feed_consumed_kg = models
                .feed
                .feed_required(biomass_after - biomass_before, &stage)?;
            cumulative_feed_kg += feed_consumed_kg;

            let (survivors, deaths) = models.mortality.apply(population, day_index);
            population = survivors;
            let biomass_kg = population as f64 * next_weight / 1000.0;

            let completed = match tenure.take() {
                Some((current, n)) if current == stage => {
                    tenure = Some((current, n + 1));
                    None
                }
                previous => {
                    tenure = Some((stage.clone(), 1));
                    previous
                }
            };
            if let Some((left, n)) = &completed {
                debug!(day_index, from = %left, to = %stage, days_in_stage = n, "stage transition");
            }

            let mut record = ProjectionDay {
                day_index,
                date,
                stage,
                temperature_c,
                weight_g: next_weight,
                population,
                deaths,
                biomass_kg,
                feed_consumed_kg,
                cumulative_feed_kg,
                violations: Vec::new(),
            };
            if let Some(set) = &snap.constraints {
                let t = StageTenure {
                    days_in_stage: tenure.as_ref().map_or(1, |(_, n)| *n),
                    completed: completed.as_ref().map(|(s, n)| (s, *n)),
                };
                record.violations = check(&record, &t, set);
            }
            days.push(record);
            weight = next_weight;

            #[cfg(test)]
            if let Some((n, token)) = &self.cancel_after {
                if day_index + 1 == *n {
                    token.cancel();
                }
            }
        }

        Ok(ProjectionRun {
            scenario_id: self.scenario_id.clone(),
            snapshot: snap.clone(),
            days,
        })
    }
}
