//! Advisory checks of modeled values against a biological constraint set.
//!
//! Checks never fail: every out-of-bound value becomes a
//! [`ConstraintViolation`] attached to the day it was observed on.

use aqua_core::{
    BiologicalConstraintSet, ConstraintBound, ConstraintViolation, ProjectionDay, StageBounds,
    StageId,
};

/// How long the population has been in its stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageTenure<'a> {
    /// Days spent in the current stage, including the current day.
    pub days_in_stage: u32,
    /// Stage left at the start of this day and how many days it lasted.
    pub completed: Option<(&'a StageId, u32)>,
}

/// Check one day record against a constraint set.
pub fn check(
    day: &ProjectionDay,
    tenure: &StageTenure<'_>,
    set: &BiologicalConstraintSet,
) -> Vec<ConstraintViolation> {
    let label = format!("{}@{}", set.name, set.version);
    let mut out = Vec::new();
    let mut push = |stage: &StageId, bound: ConstraintBound, observed: f64, b: &StageBounds| {
        let (permitted_min, permitted_max) = permitted(bound, b);
        out.push(ConstraintViolation {
            day_index: day.day_index,
            stage: stage.clone(),
            constraint_set: label.clone(),
            bound,
            field: bound.field().to_string(),
            observed,
            permitted_min,
            permitted_max,
        });
    };

    for b in set.bounds.iter().filter(|b| b.applies_to(&day.stage)) {
        let days = f64::from(tenure.days_in_stage);
        let checks = [
            (ConstraintBound::WeightMin, day.weight_g, b.weight_min_g.map(|m| day.weight_g < m)),
            (ConstraintBound::WeightMax, day.weight_g, b.weight_max_g.map(|m| day.weight_g > m)),
            (
                ConstraintBound::TemperatureMin,
                day.temperature_c,
                b.temperature_min_c.map(|m| day.temperature_c < m),
            ),
            (
                ConstraintBound::TemperatureMax,
                day.temperature_c,
                b.temperature_max_c.map(|m| day.temperature_c > m),
            ),
            (
                ConstraintBound::DurationMax,
                days,
                b.duration_max_days.map(|m| tenure.days_in_stage > m),
            ),
        ];
        for (bound, observed, violated) in checks {
            if violated == Some(true) {
                push(&day.stage, bound, observed, b);
            }
        }
    }

    if let Some((stage, days)) = tenure.completed {
        for b in set.bounds.iter().filter(|b| b.applies_to(stage)) {
            if b.duration_min_days.map_or(false, |m| days < m) {
                push(stage, ConstraintBound::DurationMin, f64::from(days), b);
            }
        }
    }
    out
}

fn permitted(bound: ConstraintBound, b: &StageBounds) -> (Option<f64>, Option<f64>) {
    match bound {
        ConstraintBound::WeightMin | ConstraintBound::WeightMax => (b.weight_min_g, b.weight_max_g),
        ConstraintBound::TemperatureMin | ConstraintBound::TemperatureMax => {
            (b.temperature_min_c, b.temperature_max_c)
        }
        ConstraintBound::DurationMin | ConstraintBound::DurationMax => (
            b.duration_min_days.map(f64::from),
            b.duration_max_days.map(f64::from),
        ),
    }
}
