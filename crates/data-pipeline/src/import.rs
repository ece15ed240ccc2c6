use anyhow::{anyhow, bail, Context, Result};
use aqua_core::{
    validate_feed_model, validate_mortality_model, FcrSegment, FeedModelConfig,
    MortalityFrequency, MortalityModelConfig, StageBasis, StageId, TemperatureRange,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TemperatureRow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    temperature_c: f64,
}

#[derive(Debug, Deserialize)]
struct FcrRow {
    stage: String,
    fcr: f64,
    from: f64,
    to: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MortalityRow {
    rate: f64,
    frequency: MortalityFrequency,
}

/// Deserialize every data row, paired with its line number.
fn rows<R: Read, T: DeserializeOwned>(input: R, what: &str) -> Result<Vec<(u64, T)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    let headers = reader
        .headers()
        .with_context(|| format!("read {what} header"))?
        .clone();
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read {what} row"))?;
        let line = record.position().map_or(0, |p| p.line());
        let row = record
            .deserialize(Some(&headers))
            .with_context(|| format!("{what} line {line}"))?;
        out.push((line, row));
    }
    if out.is_empty() {
        bail!("no {what} rows");
    }
    debug!(what, rows = out.len(), "csv parsed");
    Ok(out)
}

/// Read `start_date,end_date,temperature_c` rows. Dates are inclusive.
pub fn read_temperature_ranges<R: Read>(input: R) -> Result<Vec<TemperatureRange>> {
    rows::<_, TemperatureRow>(input, "temperature")?
        .into_iter()
        .map(|(line, r)| {
            if r.end_date < r.start_date {
                bail!(
                    "temperature line {line}: end {} before start {}",
                    r.end_date,
                    r.start_date
                );
            }
            if !r.temperature_c.is_finite() {
                bail!("temperature line {line}: non-finite temperature");
            }
            Ok(TemperatureRange {
                start: r.start_date,
                end: r.end_date,
                value_c: r.temperature_c,
            })
        })
        .collect()
}

/// Read `stage,fcr,from,to` rows into a feed model. An empty `to` leaves the
/// last segment open.
pub fn read_fcr_segments<R: Read>(
    input: R,
    name: &str,
    basis: StageBasis,
) -> Result<FeedModelConfig> {
    let mut segments = Vec::new();
    for (line, r) in rows::<_, FcrRow>(input, "fcr")? {
        if r.stage.is_empty() {
            bail!("fcr line {line}: empty stage");
        }
        if !r.fcr.is_finite() || r.fcr <= 0.0 {
            bail!("fcr line {line}: ratio {} must be positive", r.fcr);
        }
        if !r.from.is_finite() || r.from < 0.0 {
            bail!("fcr line {line}: invalid lower bound {}", r.from);
        }
        if let Some(to) = r.to.filter(|to| !(to.is_finite() && *to > r.from)) {
            bail!("fcr line {line}: upper bound {to} not above {}", r.from);
        }
        segments.push(FcrSegment {
            stage: StageId(r.stage),
            fcr: r.fcr,
            from: r.from,
            to: r.to,
        });
    }
    let config = FeedModelConfig {
        name: name.to_string(),
        basis,
        segments,
    };
    validate_feed_model(&config).map_err(|e| anyhow!("fcr segments: {e}"))?;
    Ok(config)
}

/// Read a single `rate,frequency` row.
pub fn read_mortality<R: Read>(input: R, name: &str) -> Result<MortalityModelConfig> {
    let mut rows = rows::<_, MortalityRow>(input, "mortality")?;
    if rows.len() != 1 {
        bail!("expected exactly one mortality row, found {}", rows.len());
    }
    let (line, r) = rows.remove(0);
    let config = MortalityModelConfig {
        name: name.to_string(),
        rate: r.rate,
        frequency: r.frequency,
    };
    validate_mortality_model(&config).map_err(|e| anyhow!("mortality line {line}: {e}"))?;
    Ok(config)
}
