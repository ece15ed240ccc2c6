#![deny(warnings)]

//! Core domain models and invariants for aquaculture growth projections.
//!
//! This crate defines the serializable scenario, model configuration and
//! projection types shared by the model, runtime and analysis crates, with
//! validation helpers that guarantee the invariants every projection relies on.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

mod projection;

pub use projection::*;

/// Unique identifier for a projection scenario.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle stage identifier, e.g. "fry", "smolt", "grow-out".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId(pub String);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A temperature held constant over an inclusive calendar range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    /// First day of the range.
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
    /// Water temperature in °C.
    pub value_c: f64,
}

/// How gaps between temperature ranges are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Carry the previous range's value flat across the gap.
    #[default]
    None,
    /// Interpolate linearly between the ranges bounding the gap.
    Linear,
}

/// Sparse temperature input plus the options used to resolve it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureProfile {
    /// Input ranges, in any order.
    #[serde(default)]
    pub ranges: Vec<TemperatureRange>,
    /// Fill gaps between ranges; unfilled gap days fail lookup.
    #[serde(default)]
    pub fill_gaps: bool,
    /// Gap filling method, only used with `fill_gaps`.
    #[serde(default)]
    pub interpolation: InterpolationMethod,
    /// Merge adjacent ranges holding the same value.
    #[serde(default = "default_true")]
    pub merge_adjacent: bool,
}

/// Thermal growth coefficient model parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthModelConfig {
    /// Human-readable model name.
    pub name: String,
    /// Site or location label the coefficient was calibrated for.
    #[serde(default)]
    pub location: String,
    /// Thermal growth coefficient (> 0).
    pub tgc: f64,
    /// Temperature exponent (1.0 for the standard form).
    #[serde(default = "default_exponent")]
    pub n1: f64,
    /// Weight exponent scale; the weight term is `W^(n2/3)` (1.0 for cube root).
    #[serde(default = "default_exponent")]
    pub n2: f64,
    /// Temperature input driving the model.
    pub temperature: TemperatureProfile,
}

/// Key used to place a simulated day into an FCR stage segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageBasis {
    /// Segments are keyed by day index from scenario start.
    Day,
    /// Segments are keyed by start-of-day average weight in grams.
    Weight,
}

/// One stage segment of a feed model over the half-open range `[from, to)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FcrSegment {
    /// Lifecycle stage this segment represents.
    pub stage: StageId,
    /// Feed kg per kg of biomass gained (> 0).
    pub fcr: f64,
    /// Lower bound (inclusive) in the basis unit.
    pub from: f64,
    /// Upper bound (exclusive); `None` leaves the segment open-ended.
    #[serde(default)]
    pub to: Option<f64>,
}

impl FcrSegment {
    /// Whether `key` falls inside this segment.
    pub fn contains(&self, key: f64) -> bool {
        key >= self.from && self.to.map_or(true, |to| key < to)
    }
}

/// Stage-segmented feed conversion model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedModelConfig {
    /// Human-readable model name.
    pub name: String,
    /// Unit the segment bounds are expressed in.
    pub basis: StageBasis,
    /// Contiguous, ordered segments.
    #[serde(default)]
    pub segments: Vec<FcrSegment>,
}

/// How often the mortality rate is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MortalityFrequency {
    /// Every simulated day.
    #[serde(alias = "DAILY")]
    Daily,
    /// Every 7th simulated day, counted from scenario start.
    #[serde(alias = "WEEKLY")]
    Weekly,
}

impl MortalityFrequency {
    /// Whether mortality is applied on the given day.
    pub fn applies_on(self, day_index: u32) -> bool {
        match self {
            MortalityFrequency::Daily => true,
            MortalityFrequency::Weekly => day_index % 7 == 0,
        }
    }
}

/// Attrition model parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MortalityModelConfig {
    /// Human-readable model name.
    pub name: String,
    /// Fraction of the population lost per application, in [0, 1).
    pub rate: f64,
    /// Application frequency.
    pub frequency: MortalityFrequency,
}

/// Biological bounds for one stage, or for every stage when `stage` is `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageBounds {
    #[serde(default)]
    pub stage: Option<StageId>,
    #[serde(default)]
    pub weight_min_g: Option<f64>,
    #[serde(default)]
    pub weight_max_g: Option<f64>,
    #[serde(default)]
    pub temperature_min_c: Option<f64>,
    #[serde(default)]
    pub temperature_max_c: Option<f64>,
    #[serde(default)]
    pub duration_min_days: Option<u32>,
    #[serde(default)]
    pub duration_max_days: Option<u32>,
}

impl StageBounds {
    /// Whether these bounds apply to `stage`.
    pub fn applies_to(&self, stage: &StageId) -> bool {
        self.stage.as_ref().map_or(true, |s| s == stage)
    }
}

/// Named, versioned collection of per-stage biological bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiologicalConstraintSet {
    pub name: String,
    pub version: u32,
    /// Consulted by default when no set is named explicitly.
    #[serde(default)]
    pub active: bool,
    pub bounds: Vec<StageBounds>,
}

/// All known constraint sets; resolves the active one or a named one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintCatalog {
    #[serde(default)]
    pub sets: Vec<BiologicalConstraintSet>,
}

impl ConstraintCatalog {
    /// The set flagged active, if any.
    pub fn active(&self) -> Option<&BiologicalConstraintSet> {
        self.sets.iter().find(|s| s.active)
    }

    /// Look up a set by name; without a version the highest version wins.
    pub fn find(&self, name: &str, version: Option<u32>) -> Option<&BiologicalConstraintSet> {
        self.sets
            .iter()
            .filter(|s| s.name == name && version.map_or(true, |v| s.version == v))
            .max_by_key(|s| s.version)
    }

    /// Explicitly named set when given, otherwise the active set.
    pub fn resolve(
        &self,
        name: Option<&str>,
        version: Option<u32>,
    ) -> Option<&BiologicalConstraintSet> {
        match name {
            Some(n) => self.find(n, version),
            None => self.active(),
        }
    }
}

/// Where a scenario's starting state came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioOrigin {
    /// Entered by a user.
    #[default]
    Manual,
    /// Copied once from a live production batch.
    FromBatch {
        batch_id: String,
        snapshot_date: NaiveDate,
    },
}

/// Point-in-time state of a live production batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_id: String,
    pub population: u64,
    pub avg_weight_g: f64,
    pub snapshot_date: NaiveDate,
}

/// A projection scenario: starting state plus the models that drive it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    /// Starting head count (> 0).
    pub initial_count: u64,
    /// Starting average weight in grams (> 0).
    pub initial_weight_g: f64,
    /// Number of simulated days (> 0).
    pub duration_days: u32,
    /// Calendar date of day 0.
    pub start_date: NaiveDate,
    pub growth: GrowthModelConfig,
    pub feed: FeedModelConfig,
    pub mortality: MortalityModelConfig,
    /// Constraint set checked each day, if any.
    #[serde(default)]
    pub constraints: Option<BiologicalConstraintSet>,
    #[serde(default)]
    pub origin: ScenarioOrigin,
}

impl Scenario {
    /// Derive a scenario from a batch snapshot. The batch state is copied;
    /// later changes to the batch do not affect the scenario.
    pub fn from_batch(
        id: ScenarioId,
        name: impl Into<String>,
        batch: &BatchSnapshot,
        duration_days: u32,
        growth: GrowthModelConfig,
        feed: FeedModelConfig,
        mortality: MortalityModelConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            initial_count: batch.population,
            initial_weight_g: batch.avg_weight_g,
            duration_days,
            start_date: batch.snapshot_date,
            growth,
            feed,
            mortality,
            constraints: None,
            origin: ScenarioOrigin::FromBatch {
                batch_id: batch.batch_id.clone(),
                snapshot_date: batch.snapshot_date,
            },
        }
    }

    /// Calendar date of a simulated day.
    pub fn date_of(&self, day_index: u32) -> Option<NaiveDate> {
        self.start_date
            .checked_add_days(Days::new(u64::from(day_index)))
    }

    /// Last simulated date, `None` for a zero-length scenario.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.duration_days
            .checked_sub(1)
            .and_then(|last| self.date_of(last))
    }
}

fn default_true() -> bool {
    true
}

fn default_exponent() -> f64 {
    1.0
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    /// Initial head count must be > 0.
    #[error("initial count must be > 0")]
    NonPositiveCount,
    /// Weights must be > 0.
    #[error("weight must be > 0, got {0}")]
    NonPositiveWeight(f64),
    /// Duration must be at least one day.
    #[error("duration must be at least one day")]
    ZeroDuration,
    /// TGC coefficient must be > 0.
    #[error("TGC coefficient must be > 0, got {0}")]
    NonPositiveCoefficient(f64),
    /// Growth exponents must be > 0.
    #[error("growth exponent {name} must be > 0, got {value}")]
    InvalidExponent { name: &'static str, value: f64 },
    /// Temperature range ends before it starts.
    #[error("temperature range {start}..={end} ends before it starts")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    /// Temperature profile has no ranges.
    #[error("temperature profile has no ranges")]
    EmptyTemperatureProfile,
    /// Mortality rate must be within [0, 1).
    #[error("mortality rate must be within [0,1), got {0}")]
    MortalityRateOutOfRange(f64),
    /// Feed model has no segments.
    #[error("feed model {0} has no segments")]
    EmptySegments(String),
    /// FCR must be > 0.
    #[error("FCR for stage {stage} must be > 0, got {fcr}")]
    NonPositiveFcr { stage: String, fcr: f64 },
    /// Segment bounds are inverted or empty.
    #[error("segment {stage} has empty bounds [{from}, {to})")]
    EmptySegment { stage: String, from: f64, to: f64 },
    /// Segments must be contiguous and non-overlapping.
    #[error("segment {stage} starts at {actual}, expected {expected}")]
    SegmentDiscontinuity {
        stage: String,
        expected: f64,
        actual: f64,
    },
    /// Only the last segment may be open-ended.
    #[error("open-ended segment {0} is not the last segment")]
    OpenSegmentNotLast(String),
    /// Stage ids must be unique within a feed model.
    #[error("duplicate stage in feed model: {0}")]
    DuplicateStage(String),
    /// A min bound exceeds its max bound.
    #[error("constraint set {set}: {field} min {min} exceeds max {max}")]
    InvertedBounds {
        set: String,
        field: &'static str,
        min: f64,
        max: f64,
    },
    /// At most one constraint set may be active.
    #[error("multiple active constraint sets: {0:?}")]
    MultipleActiveSets(Vec<String>),
    /// Names must be non-empty.
    #[error("empty name for {0}")]
    EmptyName(&'static str),
}

/// Validate a temperature profile's ranges.
pub fn validate_temperature_profile(p: &TemperatureProfile) -> Result<(), ValidationError> {
    if p.ranges.is_empty() {
        return Err(ValidationError::EmptyTemperatureProfile);
    }
    for r in &p.ranges {
        if r.end < r.start {
            return Err(ValidationError::InvertedRange {
                start: r.start,
                end: r.end,
            });
        }
        if !r.value_c.is_finite() {
            return Err(ValidationError::NonFinite("temperature"));
        }
    }
    Ok(())
}

/// Validate a growth model.
pub fn validate_growth_model(g: &GrowthModelConfig) -> Result<(), ValidationError> {
    if g.name.trim().is_empty() {
        return Err(ValidationError::EmptyName("growth model"));
    }
    if !g.tgc.is_finite() {
        return Err(ValidationError::NonFinite("tgc"));
    }
    if g.tgc <= 0.0 {
        return Err(ValidationError::NonPositiveCoefficient(g.tgc));
    }
    for (name, value) in [("n1", g.n1), ("n2", g.n2)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::InvalidExponent { name, value });
        }
    }
    validate_temperature_profile(&g.temperature)
}

/// Validate a feed model: positive ratios, unique stages, contiguous segments.
pub fn validate_feed_model(f: &FeedModelConfig) -> Result<(), ValidationError> {
    if f.segments.is_empty() {
        return Err(ValidationError::EmptySegments(f.name.clone()));
    }
    let mut stages: BTreeSet<&StageId> = BTreeSet::new();
    let mut expected_from: Option<f64> = None;
    let last = f.segments.len() - 1;
    for (i, seg) in f.segments.iter().enumerate() {
        if !seg.fcr.is_finite() || !seg.from.is_finite() || seg.to.map_or(false, |t| !t.is_finite())
        {
            return Err(ValidationError::NonFinite("fcr segment"));
        }
        if seg.fcr <= 0.0 {
            return Err(ValidationError::NonPositiveFcr {
                stage: seg.stage.0.clone(),
                fcr: seg.fcr,
            });
        }
        if !stages.insert(&seg.stage) {
            return Err(ValidationError::DuplicateStage(seg.stage.0.clone()));
        }
        if let Some(expected) = expected_from {
            if seg.from != expected {
                return Err(ValidationError::SegmentDiscontinuity {
                    stage: seg.stage.0.clone(),
                    expected,
                    actual: seg.from,
                });
            }
        }
        match seg.to {
            Some(to) if to <= seg.from => {
                return Err(ValidationError::EmptySegment {
                    stage: seg.stage.0.clone(),
                    from: seg.from,
                    to,
                });
            }
            Some(to) => expected_from = Some(to),
            None if i != last => {
                return Err(ValidationError::OpenSegmentNotLast(seg.stage.0.clone()));
            }
            None => {}
        }
    }
    Ok(())
}

/// Validate a mortality model.
pub fn validate_mortality_model(m: &MortalityModelConfig) -> Result<(), ValidationError> {
    if !m.rate.is_finite() {
        return Err(ValidationError::NonFinite("mortality rate"));
    }
    if !(0.0..1.0).contains(&m.rate) {
        return Err(ValidationError::MortalityRateOutOfRange(m.rate));
    }
    Ok(())
}

/// Validate a constraint set's bounds.
pub fn validate_constraint_set(c: &BiologicalConstraintSet) -> Result<(), ValidationError> {
    if c.name.trim().is_empty() {
        return Err(ValidationError::EmptyName("constraint set"));
    }
    for b in &c.bounds {
        let pairs = [
            ("weight_g", b.weight_min_g, b.weight_max_g),
            ("temperature_c", b.temperature_min_c, b.temperature_max_c),
            (
                "days_in_stage",
                b.duration_min_days.map(f64::from),
                b.duration_max_days.map(f64::from),
            ),
        ];
        for (field, min, max) in pairs {
            if min.map_or(false, |v| !v.is_finite()) || max.map_or(false, |v| !v.is_finite()) {
                return Err(ValidationError::NonFinite("constraint bound"));
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(ValidationError::InvertedBounds {
                        set: c.name.clone(),
                        field,
                        min,
                        max,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Validate every set in a catalog and that at most one is active.
pub fn validate_catalog(catalog: &ConstraintCatalog) -> Result<(), ValidationError> {
    for set in &catalog.sets {
        validate_constraint_set(set)?;
    }
    let active: Vec<String> = catalog
        .sets
        .iter()
        .filter(|s| s.active)
        .map(|s| format!("{}@{}", s.name, s.version))
        .collect();
    if active.len() > 1 {
        return Err(ValidationError::MultipleActiveSets(active));
    }
    Ok(())
}

fn validate_start(count: u64, weight_g: f64, duration_days: u32) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::NonPositiveCount);
    }
    if !weight_g.is_finite() {
        return Err(ValidationError::NonFinite("initial weight"));
    }
    if weight_g <= 0.0 {
        return Err(ValidationError::NonPositiveWeight(weight_g));
    }
    if duration_days == 0 {
        return Err(ValidationError::ZeroDuration);
    }
    Ok(())
}

fn validate_models(
    growth: &GrowthModelConfig,
    feed: &FeedModelConfig,
    mortality: &MortalityModelConfig,
    constraints: Option<&BiologicalConstraintSet>,
) -> Result<(), ValidationError> {
    validate_growth_model(growth)?;
    validate_feed_model(feed)?;
    validate_mortality_model(mortality)?;
    if let Some(c) = constraints {
        validate_constraint_set(c)?;
    }
    Ok(())
}

/// Validate a scenario and every model it references.
pub fn validate_scenario(s: &Scenario) -> Result<(), ValidationError> {
    if s.id.0.trim().is_empty() {
        return Err(ValidationError::EmptyName("scenario id"));
    }
    validate_start(s.initial_count, s.initial_weight_g, s.duration_days)?;
    validate_models(&s.growth, &s.feed, &s.mortality, s.constraints.as_ref())
}

/// Validate the pinned inputs of a run.
pub fn validate_snapshot(s: &ModelSnapshot) -> Result<(), ValidationError> {
    validate_start(s.initial_count, s.initial_weight_g, s.duration_days)?;
    validate_models(&s.growth, &s.feed, &s.mortality, s.constraints.as_ref())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn scenario() -> Scenario {
        Scenario {
            id: ScenarioId("base".to_string()),
            name: "Baseline".to_string(),
            initial_count: 10_000,
            initial_weight_g: 50.0,
            duration_days: 90,
            start_date: date(2024, 3, 1),
            growth: GrowthModelConfig {
                name: "TGC site A".to_string(),
                location: "Site A".to_string(),
                tgc: 2.5,
                n1: 1.0,
                n2: 1.0,
                temperature: TemperatureProfile {
                    ranges: vec![TemperatureRange {
                        start: date(2024, 1, 1),
                        end: date(2024, 12, 31),
                        value_c: 12.0,
                    }],
                    fill_gaps: false,
                    interpolation: InterpolationMethod::None,
                    merge_adjacent: true,
                },
            },
            feed: FeedModelConfig {
                name: "FCR flat".to_string(),
                basis: StageBasis::Day,
                segments: vec![FcrSegment {
                    stage: StageId("grow-out".to_string()),
                    fcr: 1.1,
                    from: 0.0,
                    to: None,
                }],
            },
            mortality: MortalityModelConfig {
                name: "Daily 0.05%".to_string(),
                rate: 0.0005,
                frequency: MortalityFrequency::Daily,
            },
            constraints: None,
            origin: ScenarioOrigin::Manual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{date, scenario};
    use super::*;
    use proptest::prelude::*;

    fn seg(stage: &str, from: f64, to: Option<f64>) -> FcrSegment {
        FcrSegment {
            stage: StageId(stage.to_string()),
            fcr: 1.0,
            from,
            to,
        }
    }

    #[test]
    fn baseline_scenario_is_valid() {
        validate_scenario(&scenario()).unwrap();
    }

    #[test]
    fn scenario_yaml_roundtrip() {
        let s = scenario();
        let text = serde_yaml::to_string(&s).unwrap();
        let back: Scenario = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn yaml_defaults_apply() {
        let text = r#"
name: TGC
tgc: 2.8
temperature:
  ranges:
    - { start: 2024-01-01, end: 2024-01-31, value_c: 8.0 }
"#;
        let g: GrowthModelConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(g.n1, 1.0);
        assert_eq!(g.n2, 1.0);
        assert!(g.temperature.merge_adjacent);
        assert!(!g.temperature.fill_gaps);
        assert_eq!(g.temperature.interpolation, InterpolationMethod::None);
        let m: MortalityModelConfig =
            serde_yaml::from_str("{ name: m, rate: 0.01, frequency: WEEKLY }").unwrap();
        assert_eq!(m.frequency, MortalityFrequency::Weekly);
    }

    #[test]
    fn rejects_bad_starting_state() {
        let mut s = scenario();
        s.initial_count = 0;
        assert_eq!(validate_scenario(&s), Err(ValidationError::NonPositiveCount));
        let mut s = scenario();
        s.initial_weight_g = 0.0;
        assert_eq!(
            validate_scenario(&s),
            Err(ValidationError::NonPositiveWeight(0.0))
        );
        let mut s = scenario();
        s.duration_days = 0;
        assert_eq!(validate_scenario(&s), Err(ValidationError::ZeroDuration));
    }

    #[test]
    fn rejects_non_positive_tgc() {
        let mut s = scenario();
        s.growth.tgc = 0.0;
        assert_eq!(
            validate_scenario(&s),
            Err(ValidationError::NonPositiveCoefficient(0.0))
        );
    }

    #[test]
    fn mortality_rate_must_be_below_one() {
        let mut s = scenario();
        s.mortality.rate = 1.0;
        assert_eq!(
            validate_scenario(&s),
            Err(ValidationError::MortalityRateOutOfRange(1.0))
        );
    }

    #[test]
    fn feed_segments_must_be_contiguous() {
        let mut f = scenario().feed;
        f.segments = vec![seg("fry", 0.0, Some(30.0)), seg("smolt", 31.0, None)];
        assert!(matches!(
            validate_feed_model(&f),
            Err(ValidationError::SegmentDiscontinuity { .. })
        ));
        f.segments = vec![seg("fry", 0.0, Some(30.0)), seg("smolt", 20.0, None)];
        assert!(matches!(
            validate_feed_model(&f),
            Err(ValidationError::SegmentDiscontinuity { .. })
        ));
        f.segments = vec![seg("fry", 0.0, None), seg("smolt", 30.0, None)];
        assert_eq!(
            validate_feed_model(&f),
            Err(ValidationError::OpenSegmentNotLast("fry".to_string()))
        );
        f.segments = vec![seg("fry", 0.0, Some(30.0)), seg("fry", 30.0, None)];
        assert_eq!(
            validate_feed_model(&f),
            Err(ValidationError::DuplicateStage("fry".to_string()))
        );
        f.segments = vec![seg("fry", 0.0, Some(30.0)), seg("smolt", 30.0, None)];
        validate_feed_model(&f).unwrap();
    }

    #[test]
    fn catalog_resolves_active_and_named_sets() {
        let set = |name: &str, version: u32, active: bool| BiologicalConstraintSet {
            name: name.to_string(),
            version,
            active,
            bounds: vec![],
        };
        let catalog = ConstraintCatalog {
            sets: vec![set("salmon", 1, false), set("salmon", 2, true), set("trout", 1, false)],
        };
        validate_catalog(&catalog).unwrap();
        assert_eq!(catalog.active().unwrap().version, 2);
        assert_eq!(catalog.find("salmon", Some(1)).unwrap().version, 1);
        assert_eq!(catalog.find("salmon", None).unwrap().version, 2);
        assert_eq!(catalog.resolve(Some("trout"), None).unwrap().name, "trout");
        assert!(catalog.find("cod", None).is_none());

        let two_active = ConstraintCatalog {
            sets: vec![set("a", 1, true), set("b", 1, true)],
        };
        assert!(matches!(
            validate_catalog(&two_active),
            Err(ValidationError::MultipleActiveSets(_))
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let c = BiologicalConstraintSet {
            name: "bad".to_string(),
            version: 1,
            active: true,
            bounds: vec![StageBounds {
                temperature_min_c: Some(18.0),
                temperature_max_c: Some(4.0),
                ..StageBounds::default()
            }],
        };
        assert!(matches!(
            validate_constraint_set(&c),
            Err(ValidationError::InvertedBounds { field: "temperature_c", .. })
        ));
    }

    #[test]
    fn from_batch_copies_state() {
        let base = scenario();
        let batch = BatchSnapshot {
            batch_id: "B-17".to_string(),
            population: 42_000,
            avg_weight_g: 120.5,
            snapshot_date: date(2024, 6, 1),
        };
        let s = Scenario::from_batch(
            ScenarioId("from-b17".to_string()),
            "From B-17",
            &batch,
            60,
            base.growth,
            base.feed,
            base.mortality,
        );
        assert_eq!(s.initial_count, 42_000);
        assert_eq!(s.initial_weight_g, 120.5);
        assert_eq!(s.start_date, date(2024, 6, 1));
        assert_eq!(s.last_date(), Some(date(2024, 7, 30)));
        assert!(matches!(s.origin, ScenarioOrigin::FromBatch { ref batch_id, .. } if batch_id == "B-17"));
    }

    #[test]
    fn weekly_mortality_is_scenario_relative() {
        let days: Vec<u32> = (0..22)
            .filter(|d| MortalityFrequency::Weekly.applies_on(*d))
            .collect();
        assert_eq!(days, vec![0, 7, 14, 21]);
        assert!((0..10).all(|d| MortalityFrequency::Daily.applies_on(d)));
    }

    proptest! {
        #[test]
        fn segment_contains_is_half_open(from in 0.0f64..1000.0, width in 0.001f64..1000.0) {
            let s = seg("x", from, Some(from + width));
            prop_assert!(s.contains(from));
            prop_assert!(!s.contains(from + width));
            prop_assert!(!s.contains(from - 0.0001));
        }
    }
}
