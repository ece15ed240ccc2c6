//! Side-by-side comparison of the latest runs of several scenarios.

use crate::{Metric, ParseNameError};
use aqua_core::{ProjectionDay, ProjectionRun, ScenarioId};
use aqua_runtime::RunSource;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGroup {
    Growth,
    Mortality,
    Biomass,
    All,
}

impl MetricGroup {
    pub fn metrics(self) -> &'static [Metric] {
        match self {
            MetricGroup::Growth => &[Metric::FinalWeightG, Metric::SgrPctPerDay],
            MetricGroup::Mortality => &[
                Metric::FinalPopulation,
                Metric::TotalDeaths,
                Metric::SurvivalPct,
            ],
            MetricGroup::Biomass => &[
                Metric::FinalBiomassKg,
                Metric::BiomassGainKg,
                Metric::TotalFeedKg,
                Metric::RealizedFcr,
            ],
            MetricGroup::All => &Metric::ALL,
        }
    }
}

impl FromStr for MetricGroup {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "growth" => Ok(MetricGroup::Growth),
            "mortality" => Ok(MetricGroup::Mortality),
            "biomass" => Ok(MetricGroup::Biomass),
            "all" => Ok(MetricGroup::All),
            _ => Err(ParseNameError {
                kind: "metric group",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonRow {
    /// The scenario has no completed run.
    NoRun { scenario_id: ScenarioId },
    Completed {
        scenario_id: ScenarioId,
        values: BTreeMap<Metric, f64>,
        /// Difference from the baseline row, per metric both rows define.
        deltas: BTreeMap<Metric, f64>,
    },
}

impl ComparisonRow {
    pub fn scenario_id(&self) -> &ScenarioId {
        match self {
            ComparisonRow::NoRun { scenario_id } | ComparisonRow::Completed { scenario_id, .. } => {
                scenario_id
            }
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match self {
            ComparisonRow::NoRun { .. } => None,
            ComparisonRow::Completed { values, .. } => values.get(&metric).copied(),
        }
    }

    pub fn delta(&self, metric: Metric) -> Option<f64> {
        match self {
            ComparisonRow::NoRun { .. } => None,
            ComparisonRow::Completed { deltas, .. } => deltas.get(&metric).copied(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonTable {
    /// First requested scenario, when it has a run.
    pub baseline: Option<ScenarioId>,
    pub metrics: Vec<Metric>,
    pub rows: Vec<ComparisonRow>,
}

/// Compare the latest runs of `scenario_ids`, one row each in request order.
/// The first scenario is the baseline for deltas.
pub fn compare<S: RunSource + ?Sized>(
    scenario_ids: &[ScenarioId],
    groups: &BTreeSet<MetricGroup>,
    source: &S,
) -> ComparisonTable {
    let metrics: Vec<Metric> = groups
        .iter()
        .flat_map(|g| g.metrics().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let values: Vec<Option<BTreeMap<Metric, f64>>> = scenario_ids
        .iter()
        .map(|id| {
            let run = source.latest_run(id)?;
            let summary = run.summary();
            Some(
                metrics
                    .iter()
                    .filter_map(|m| m.value(&summary).map(|v| (*m, v)))
                    .collect(),
            )
        })
        .collect();

    let base = values.first().cloned().flatten();
    let rows = scenario_ids
        .iter()
        .zip(values)
        .map(|(id, v)| match v {
            None => {
                debug!(scenario = %id, "no run to compare");
                ComparisonRow::NoRun {
                    scenario_id: id.clone(),
                }
            }
            Some(values) => {
                let deltas = match &base {
                    Some(base) => values
                        .iter()
                        .filter_map(|(m, v)| base.get(m).map(|b| (*m, v - b)))
                        .collect(),
                    None => BTreeMap::new(),
                };
                ComparisonRow::Completed {
                    scenario_id: id.clone(),
                    values,
                    deltas,
                }
            }
        })
        .collect();

    ComparisonTable {
        baseline: base.as_ref().and(scenario_ids.first().cloned()),
        metrics,
        rows,
    }
}

/// Per-day quantity plotted across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayField {
    WeightG,
    Population,
    BiomassKg,
    FeedConsumedKg,
    CumulativeFeedKg,
    TemperatureC,
}

impl DayField {
    pub fn value(self, d: &ProjectionDay) -> f64 {
        match self {
            DayField::WeightG => d.weight_g,
            DayField::Population => d.population as f64,
            DayField::BiomassKg => d.biomass_kg,
            DayField::FeedConsumedKg => d.feed_consumed_kg,
            DayField::CumulativeFeedKg => d.cumulative_feed_kg,
            DayField::TemperatureC => d.temperature_c,
        }
    }
}

impl FromStr for DayField {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" | "weight_g" => Ok(DayField::WeightG),
            "population" => Ok(DayField::Population),
            "biomass" | "biomass_kg" => Ok(DayField::BiomassKg),
            "feed" | "feed_consumed_kg" => Ok(DayField::FeedConsumedKg),
            "cumulative_feed" | "cumulative_feed_kg" => Ok(DayField::CumulativeFeedKg),
            "temperature" | "temperature_c" => Ok(DayField::TemperatureC),
            _ => Err(ParseNameError {
                kind: "day field",
                value: s.to_string(),
            }),
        }
    }
}

/// Align `field` across runs by day index. Row `i` holds each run's value on
/// day `i`, `None` where a run is shorter.
pub fn align_series(runs: &[Arc<ProjectionRun>], field: DayField) -> Vec<(u32, Vec<Option<f64>>)> {
    let len = runs.iter().map(|r| r.days.len()).max().unwrap_or(0);
    (0..len)
        .map(|i| {
            let values = runs
                .iter()
                .map(|r| r.days.get(i).map(|d| field.value(d)))
                .collect();
            (i as u32, values)
        })
        .collect()
}
