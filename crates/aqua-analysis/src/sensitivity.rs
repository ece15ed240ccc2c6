//! One-parameter sensitivity sweeps.
//!
//! Each variation scales a single model parameter by `1 + pct / 100` on a
//! cloned scenario and runs the projection. Variations are independent and run
//! in parallel; a failing variation is recorded in its row and never affects
//! the others.

use crate::{Metric, ParseNameError};
use aqua_core::{
    FeedModelConfig, GrowthModelConfig, MortalityModelConfig, ProjectionSummary, Scenario,
};
use aqua_runtime::{run_projection, FailureKind};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Model config whose primary numeric parameter can be scaled.
pub trait ScaleParameter: Sized {
    fn scaled(&self, factor: f64) -> Self;
}

impl ScaleParameter for GrowthModelConfig {
    fn scaled(&self, factor: f64) -> Self {
        Self {
            tgc: self.tgc * factor,
            ..self.clone()
        }
    }
}

impl ScaleParameter for FeedModelConfig {
    /// Every stage's ratio is scaled by the same factor.
    fn scaled(&self, factor: f64) -> Self {
        let mut out = self.clone();
        for seg in &mut out.segments {
            seg.fcr *= factor;
        }
        out
    }
}

impl ScaleParameter for MortalityModelConfig {
    fn scaled(&self, factor: f64) -> Self {
        Self {
            rate: self.rate * factor,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityParameter {
    Tgc,
    Fcr,
    Mortality,
}

impl SensitivityParameter {
    /// Copy of `scenario` with this parameter scaled.
    pub fn apply(self, scenario: &Scenario, factor: f64) -> Scenario {
        let mut out = scenario.clone();
        match self {
            SensitivityParameter::Tgc => out.growth = scenario.growth.scaled(factor),
            SensitivityParameter::Fcr => out.feed = scenario.feed.scaled(factor),
            SensitivityParameter::Mortality => out.mortality = scenario.mortality.scaled(factor),
        }
        out
    }
}

impl fmt::Display for SensitivityParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensitivityParameter::Tgc => "tgc",
            SensitivityParameter::Fcr => "fcr",
            SensitivityParameter::Mortality => "mortality",
        })
    }
}

impl FromStr for SensitivityParameter {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tgc" | "growth" => Ok(SensitivityParameter::Tgc),
            "fcr" | "feed" => Ok(SensitivityParameter::Fcr),
            "mortality" => Ok(SensitivityParameter::Mortality),
            _ => Err(ParseNameError {
                kind: "sensitivity parameter",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensitivityOutcome {
    Completed(ProjectionSummary),
    Failed { kind: FailureKind, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensitivityRow {
    pub parameter: SensitivityParameter,
    pub variation_pct: f64,
    pub factor: f64,
    pub outcome: SensitivityOutcome,
}

impl SensitivityRow {
    pub fn summary(&self) -> Option<&ProjectionSummary> {
        match &self.outcome {
            SensitivityOutcome::Completed(s) => Some(s),
            SensitivityOutcome::Failed { .. } => None,
        }
    }
}

/// Run one projection per variation. Rows keep the order of `variations`.
pub fn analyze(
    scenario: &Scenario,
    parameter: SensitivityParameter,
    variations: &[f64],
) -> Vec<SensitivityRow> {
    let rows: Vec<SensitivityRow> = variations
        .par_iter()
        .map(|&variation_pct| {
            let factor = 1.0 + variation_pct / 100.0;
            let varied = parameter.apply(scenario, factor);
            let outcome = match run_projection(&varied) {
                Ok(run) => SensitivityOutcome::Completed(run.summary()),
                Err(e) => {
                    warn!(
                        scenario = %scenario.id,
                        %parameter,
                        variation_pct,
                        error = %e,
                        "sensitivity variation failed"
                    );
                    SensitivityOutcome::Failed {
                        kind: e.kind(),
                        reason: e.to_string(),
                    }
                }
            };
            SensitivityRow {
                parameter,
                variation_pct,
                factor,
                outcome,
            }
        })
        .collect();
    let failed = rows.iter().filter(|r| r.summary().is_none()).count();
    info!(
        scenario = %scenario.id,
        %parameter,
        variations = rows.len(),
        failed,
        "sensitivity analysis finished"
    );
    rows
}

/// Elasticity of `metric` per row: the percent change from the 0% row divided
/// by the variation. `None` for the 0% row itself, failed rows, a zero or
/// missing baseline, or when no completed 0% row exists.
pub fn elasticity(rows: &[SensitivityRow], metric: Metric) -> Vec<Option<f64>> {
    let base = rows
        .iter()
        .find(|r| r.variation_pct == 0.0)
        .and_then(SensitivityRow::summary)
        .and_then(|s| metric.value(s))
        .filter(|v| *v != 0.0);
    rows.iter()
        .map(|r| {
            let base = base?;
            if r.variation_pct == 0.0 {
                return None;
            }
            let v = metric.value(r.summary()?)?;
            Some(((v - base) / base * 100.0) / r.variation_pct)
        })
        .collect()
}
