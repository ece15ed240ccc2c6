//! YAML scenario files.

use anyhow::{bail, Context, Result};
use aqua_core::*;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A scenario as written by hand. The starting state is either given
/// directly or copied from a batch snapshot. CSV paths are relative to the
/// YAML file and replace the inline ranges or segments they correspond to.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub id: String,
    pub name: String,
    pub duration_days: u32,
    #[serde(default)]
    pub initial_count: Option<u64>,
    #[serde(default)]
    pub initial_weight_g: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub batch: Option<BatchSnapshot>,
    pub growth: GrowthModelConfig,
    #[serde(default)]
    pub temperature_csv: Option<PathBuf>,
    pub feed: FeedModelConfig,
    #[serde(default)]
    pub fcr_csv: Option<PathBuf>,
    #[serde(default)]
    pub mortality: Option<MortalityModelConfig>,
    #[serde(default)]
    pub mortality_csv: Option<PathBuf>,
    #[serde(default)]
    pub constraints: ConstraintCatalog,
    /// `name` or `name@version`; the active set is used when absent.
    #[serde(default)]
    pub constraint_set: Option<String>,
}

/// Split `name@version` into its parts.
pub fn parse_set_ref(s: &str) -> Result<(&str, Option<u32>)> {
    match s.split_once('@') {
        Some((name, v)) => {
            let v = v
                .parse()
                .with_context(|| format!("bad constraint set version in '{s}'"))?;
            Ok((name, Some(v)))
        }
        None => Ok((s, None)),
    }
}

impl ScenarioFile {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parse scenario yaml")
    }

    /// Load a file and resolve it into a validated scenario.
    pub fn load(path: &Path, constraint_set: Option<&str>) -> Result<Scenario> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let file = Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        file.into_scenario(base, constraint_set)
            .with_context(|| format!("in {}", path.display()))
    }

    pub fn into_scenario(self, base_dir: &Path, constraint_set: Option<&str>) -> Result<Scenario> {
        let open = |p: &Path| {
            let full = base_dir.join(p);
            File::open(&full).with_context(|| format!("open {}", full.display()))
        };

        let mut growth = self.growth;
        if let Some(p) = &self.temperature_csv {
            growth.temperature.ranges = data_pipeline::read_temperature_ranges(open(p)?)
                .with_context(|| format!("temperature csv {}", p.display()))?;
        }
        let feed = match &self.fcr_csv {
            Some(p) => data_pipeline::read_fcr_segments(open(p)?, &self.feed.name, self.feed.basis)
                .with_context(|| format!("fcr csv {}", p.display()))?,
            None => self.feed,
        };
        let mortality = match (&self.mortality_csv, self.mortality) {
            (Some(p), m) => {
                let name = m.map_or_else(|| "Mortality".to_string(), |m| m.name);
                data_pipeline::read_mortality(open(p)?, &name)
                    .with_context(|| format!("mortality csv {}", p.display()))?
            }
            (None, Some(m)) => m,
            (None, None) => bail!("scenario {} has no mortality model", self.id),
        };

        validate_catalog(&self.constraints)?;
        let wanted = constraint_set.or(self.constraint_set.as_deref());
        let constraints = match wanted {
            Some(r) => {
                let (name, version) = parse_set_ref(r)?;
                match self.constraints.find(name, version) {
                    Some(set) => Some(set.clone()),
                    None => bail!("constraint set '{r}' not found"),
                }
            }
            None => self.constraints.active().cloned(),
        };
        if let Some(set) = &constraints {
            debug!(set = %set.name, version = set.version, "constraint set selected");
        }

        let id = ScenarioId(self.id);
        let mut scenario = match (self.batch, self.initial_count, self.initial_weight_g, self.start_date) {
            (Some(batch), None, None, None) => {
                info!(scenario = %id, batch = %batch.batch_id, "scenario derived from batch");
                Scenario::from_batch(
                    id,
                    self.name,
                    &batch,
                    self.duration_days,
                    growth,
                    feed,
                    mortality,
                )
            }
            (None, Some(initial_count), Some(initial_weight_g), Some(start_date)) => Scenario {
                id,
                name: self.name,
                initial_count,
                initial_weight_g,
                duration_days: self.duration_days,
                start_date,
                growth,
                feed,
                mortality,
                constraints: None,
                origin: ScenarioOrigin::Manual,
            },
            _ => bail!(
                "scenario {id} needs either `batch` or all of `initial_count`, `initial_weight_g`, `start_date`"
            ),
        };
        scenario.constraints = constraints;
        validate_scenario(&scenario)?;
        Ok(scenario)
    }
}
