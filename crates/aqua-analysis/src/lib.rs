#![deny(warnings)]

//! What-if analysis on top of the projection runtime: parameter sensitivity
//! sweeps and side-by-side comparison of completed runs.

use aqua_core::ProjectionSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod compare;
pub mod sensitivity;

pub use compare::{align_series, compare, ComparisonRow, ComparisonTable, DayField, MetricGroup};
pub use sensitivity::{
    analyze, elasticity, ScaleParameter, SensitivityOutcome, SensitivityParameter, SensitivityRow,
};

/// A name that matched no known parameter, metric or field.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
}

/// Scalar outcome drawn from a [`ProjectionSummary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FinalWeightG,
    SgrPctPerDay,
    FinalPopulation,
    TotalDeaths,
    SurvivalPct,
    FinalBiomassKg,
    BiomassGainKg,
    TotalFeedKg,
    RealizedFcr,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::FinalWeightG,
        Metric::SgrPctPerDay,
        Metric::FinalPopulation,
        Metric::TotalDeaths,
        Metric::SurvivalPct,
        Metric::FinalBiomassKg,
        Metric::BiomassGainKg,
        Metric::TotalFeedKg,
        Metric::RealizedFcr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::FinalWeightG => "final_weight_g",
            Metric::SgrPctPerDay => "sgr_pct_per_day",
            Metric::FinalPopulation => "final_population",
            Metric::TotalDeaths => "total_deaths",
            Metric::SurvivalPct => "survival_pct",
            Metric::FinalBiomassKg => "final_biomass_kg",
            Metric::BiomassGainKg => "biomass_gain_kg",
            Metric::TotalFeedKg => "total_feed_kg",
            Metric::RealizedFcr => "realized_fcr",
        }
    }

    /// Value of this metric, `None` when the summary leaves it undefined.
    pub fn value(self, s: &ProjectionSummary) -> Option<f64> {
        match self {
            Metric::FinalWeightG => Some(s.final_weight_g),
            Metric::SgrPctPerDay => s.sgr_pct_per_day,
            Metric::FinalPopulation => Some(s.final_population as f64),
            Metric::TotalDeaths => Some(s.total_deaths as f64),
            Metric::SurvivalPct => Some(s.survival_pct),
            Metric::FinalBiomassKg => Some(s.final_biomass_kg),
            Metric::BiomassGainKg => Some(s.biomass_gain_kg),
            Metric::TotalFeedKg => Some(s.total_feed_kg),
            Metric::RealizedFcr => s.realized_fcr,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNameError {
                kind: "metric",
                value: s.to_string(),
            })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip_through_parse() {
        for m in Metric::ALL {
            assert_eq!(m.name().parse::<Metric>(), Ok(m));
        }
        assert_eq!(
            "weight".parse::<Metric>(),
            Err(ParseNameError {
                kind: "metric",
                value: "weight".to_string()
            })
        );
    }
}
