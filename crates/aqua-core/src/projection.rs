//! Projection output types: day records, pinned model snapshots, run summaries.

use crate::{
    BiologicalConstraintSet, FeedModelConfig, GrowthModelConfig, MortalityModelConfig, Scenario,
    ScenarioId, StageId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which bound a constraint violation broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintBound {
    WeightMin,
    WeightMax,
    TemperatureMin,
    TemperatureMax,
    DurationMin,
    DurationMax,
}

impl ConstraintBound {
    /// Name of the day-record field the bound is checked against.
    pub fn field(self) -> &'static str {
        match self {
            ConstraintBound::WeightMin | ConstraintBound::WeightMax => "weight_g",
            ConstraintBound::TemperatureMin | ConstraintBound::TemperatureMax => "temperature_c",
            ConstraintBound::DurationMin | ConstraintBound::DurationMax => "days_in_stage",
        }
    }
}

/// An advisory finding: a modeled value outside a biological bound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub day_index: u32,
    pub stage: StageId,
    /// `name@version` of the constraint set that was consulted.
    pub constraint_set: String,
    pub bound: ConstraintBound,
    pub field: String,
    pub observed: f64,
    pub permitted_min: Option<f64>,
    pub permitted_max: Option<f64>,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(
            f,
            "day {} [{}] {} = {} outside [{}, {}] ({})",
            self.day_index,
            self.stage,
            self.field,
            self.observed,
            bound(self.permitted_min),
            bound(self.permitted_max),
            self.constraint_set
        )
    }
}

/// One simulated day. Weight, population and biomass are end-of-day values;
/// the stage is the one the day started in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionDay {
    pub day_index: u32,
    pub date: NaiveDate,
    pub stage: StageId,
    pub temperature_c: f64,
    pub weight_g: f64,
    pub population: u64,
    pub deaths: u64,
    pub biomass_kg: f64,
    pub feed_consumed_kg: f64,
    pub cumulative_feed_kg: f64,
    #[serde(default)]
    pub violations: Vec<ConstraintViolation>,
}

/// Immutable copy of every input a run was computed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub initial_count: u64,
    pub initial_weight_g: f64,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    pub growth: GrowthModelConfig,
    pub feed: FeedModelConfig,
    pub mortality: MortalityModelConfig,
    pub constraints: Option<BiologicalConstraintSet>,
}

impl ModelSnapshot {
    /// Pin the current state of a scenario.
    pub fn of(s: &Scenario) -> Self {
        Self {
            initial_count: s.initial_count,
            initial_weight_g: s.initial_weight_g,
            start_date: s.start_date,
            duration_days: s.duration_days,
            growth: s.growth.clone(),
            feed: s.feed.clone(),
            mortality: s.mortality.clone(),
            constraints: s.constraints.clone(),
        }
    }

    /// Initial biomass in kg.
    pub fn initial_biomass_kg(&self) -> f64 {
        self.initial_count as f64 * self.initial_weight_g / 1000.0
    }
}

/// A completed projection: the pinned inputs and the ordered day records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRun {
    pub scenario_id: ScenarioId,
    pub snapshot: ModelSnapshot,
    pub days: Vec<ProjectionDay>,
}

impl ProjectionRun {
    /// All violations across the run, in day order.
    pub fn violations(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.days.iter().flat_map(|d| d.violations.iter())
    }

    /// Whether the scenario has been edited since this run was computed.
    pub fn is_stale_for(&self, scenario: &Scenario) -> bool {
        scenario.id != self.scenario_id || ModelSnapshot::of(scenario) != self.snapshot
    }

    /// Final and aggregate metrics.
    pub fn summary(&self) -> ProjectionSummary {
        let snap = &self.snapshot;
        let (final_weight_g, final_population, final_biomass_kg, total_feed_kg) =
            match self.days.last() {
                Some(d) => (d.weight_g, d.population, d.biomass_kg, d.cumulative_feed_kg),
                None => (
                    snap.initial_weight_g,
                    snap.initial_count,
                    snap.initial_biomass_kg(),
                    0.0,
                ),
            };
        let days = self.days.len() as u32;
        let biomass_gain_kg = final_biomass_kg - snap.initial_biomass_kg();
        let realized_fcr = (biomass_gain_kg > 0.0).then(|| total_feed_kg / biomass_gain_kg);
        let sgr_pct_per_day = (days > 0 && final_weight_g > 0.0).then(|| {
            100.0 * (final_weight_g.ln() - snap.initial_weight_g.ln()) / f64::from(days)
        });
        ProjectionSummary {
            days,
            final_weight_g,
            final_population,
            final_biomass_kg,
            total_feed_kg,
            total_deaths: snap.initial_count.saturating_sub(final_population),
            survival_pct: 100.0 * final_population as f64 / snap.initial_count.max(1) as f64,
            biomass_gain_kg,
            realized_fcr,
            sgr_pct_per_day,
            violation_count: self.violations().count(),
        }
    }
}

/// Outcome metrics of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub days: u32,
    pub final_weight_g: f64,
    pub final_population: u64,
    pub final_biomass_kg: f64,
    pub total_feed_kg: f64,
    pub total_deaths: u64,
    pub survival_pct: f64,
    pub biomass_gain_kg: f64,
    /// Feed per kg of net biomass gained; `None` without a gain.
    pub realized_fcr: Option<f64>,
    /// Specific growth rate in % body weight per day.
    pub sgr_pct_per_day: Option<f64>,
    pub violation_count: usize,
}
