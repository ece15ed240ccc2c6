//! Stage-segmented feed conversion ratio (FCR) model.

use crate::ModelError;
use aqua_core::{validate_feed_model, FcrSegment, FeedModelConfig, StageBasis, StageId};

/// Validated FCR segmentation.
#[derive(Clone, Debug, PartialEq)]
pub struct FcrModel {
    basis: StageBasis,
    segments: Vec<FcrSegment>,
}

impl FcrModel {
    pub fn from_config(config: &FeedModelConfig) -> Result<Self, ModelError> {
        validate_feed_model(config)?;
        Ok(Self {
            basis: config.basis,
            segments: config.segments.clone(),
        })
    }

    pub fn basis(&self) -> StageBasis {
        self.basis
    }

    /// Segment containing a raw key in the basis unit.
    pub fn segment_for_key(&self, key: f64) -> Option<&FcrSegment> {
        self.segments.iter().find(|s| s.contains(key))
    }

    /// Segment for a simulated day, keyed by day index or start-of-day weight.
    pub fn segment_for(&self, day_index: u32, weight_g: f64) -> Result<&FcrSegment, ModelError> {
        let (key, label) = match self.basis {
            StageBasis::Day => (f64::from(day_index), format!("day {day_index}")),
            StageBasis::Weight => (weight_g, format!("weight {weight_g} g on day {day_index}")),
        };
        self.segment_for_key(key)
            .ok_or(ModelError::NoStageSegment(label))
    }

    /// FCR configured for a stage.
    pub fn fcr_ratio(&self, stage: &StageId) -> Result<f64, ModelError> {
        self.segments
            .iter()
            .find(|s| &s.stage == stage)
            .map(|s| s.fcr)
            .ok_or_else(|| ModelError::NoStageSegment(format!("stage {stage}")))
    }

    /// Feed needed for a biomass gain. A loss of biomass needs no feed.
    pub fn feed_required(&self, biomass_gain_kg: f64, stage: &StageId) -> Result<f64, ModelError> {
        if biomass_gain_kg.is_nan() {
            return Err(ModelError::InvalidState("NaN biomass gain".to_string()));
        }
        let ratio = self.fcr_ratio(stage)?;
        if biomass_gain_kg <= 0.0 {
            return Ok(0.0);
        }
        Ok(biomass_gain_kg * ratio)
    }

    /// First day in `0..days` no segment covers, for day-based segmentation.
    /// Weight-based segmentation is only checked at `initial_weight_g`.
    pub fn first_uncovered_day(&self, days: u32, initial_weight_g: f64) -> Option<u32> {
        match self.basis {
            StageBasis::Day => (0..days).find(|d| self.segment_for_key(f64::from(*d)).is_none()),
            StageBasis::Weight => self.segment_for_key(initial_weight_g).is_none().then_some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(s: &str) -> StageId {
        StageId(s.to_string())
    }

    fn weight_model() -> FcrModel {
        FcrModel::from_config(&FeedModelConfig {
            name: "salmon".to_string(),
            basis: StageBasis::Weight,
            segments: vec![
                FcrSegment { stage: stage("fry"), fcr: 0.8, from: 0.0, to: Some(5.0) },
                FcrSegment { stage: stage("smolt"), fcr: 1.0, from: 5.0, to: Some(150.0) },
                FcrSegment { stage: stage("grow-out"), fcr: 1.2, from: 150.0, to: None },
            ],
        })
        .unwrap()
    }

    #[test]
    fn weight_basis_resolves_stage() {
        let m = weight_model();
        assert_eq!(m.segment_for(0, 2.0).unwrap().stage, stage("fry"));
        assert_eq!(m.segment_for(0, 5.0).unwrap().stage, stage("smolt"));
        assert_eq!(m.segment_for(0, 149.9).unwrap().stage, stage("smolt"));
        assert_eq!(m.segment_for(0, 4_000.0).unwrap().stage, stage("grow-out"));
        assert_eq!(m.fcr_ratio(&stage("smolt")).unwrap(), 1.0);
    }

    #[test]
    fn day_basis_fails_outside_segments() {
        let m = FcrModel::from_config(&FeedModelConfig {
            name: "short".to_string(),
            basis: StageBasis::Day,
            segments: vec![
                FcrSegment { stage: stage("a"), fcr: 1.0, from: 0.0, to: Some(10.0) },
                FcrSegment { stage: stage("b"), fcr: 1.1, from: 10.0, to: Some(20.0) },
            ],
        })
        .unwrap();
        assert_eq!(m.segment_for(19, 1.0).unwrap().stage, stage("b"));
        assert_eq!(
            m.segment_for(20, 1.0),
            Err(ModelError::NoStageSegment("day 20".to_string()))
        );
        assert_eq!(m.first_uncovered_day(20, 1.0), None);
        assert_eq!(m.first_uncovered_day(25, 1.0), Some(20));
    }

    #[test]
    fn feed_is_never_negative() {
        let m = weight_model();
        assert_eq!(m.feed_required(-12.0, &stage("smolt")).unwrap(), 0.0);
        assert!((m.feed_required(10.0, &stage("grow-out")).unwrap() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_stage_fails() {
        let m = weight_model();
        assert_eq!(
            m.feed_required(1.0, &stage("broodstock")),
            Err(ModelError::NoStageSegment("stage broodstock".to_string()))
        );
    }

    #[test]
    fn weight_basis_checks_initial_weight_only() {
        let m = FcrModel::from_config(&FeedModelConfig {
            name: "late".to_string(),
            basis: StageBasis::Weight,
            segments: vec![FcrSegment { stage: stage("grow-out"), fcr: 1.1, from: 100.0, to: None }],
        })
        .unwrap();
        assert_eq!(m.first_uncovered_day(90, 50.0), Some(0));
        assert_eq!(m.first_uncovered_day(90, 100.0), None);
    }
}
