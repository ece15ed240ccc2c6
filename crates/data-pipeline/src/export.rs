use anyhow::{Context, Result};
use aqua_analysis::{ComparisonRow, ComparisonTable, SensitivityOutcome, SensitivityRow};
use aqua_core::ProjectionRun;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

#[derive(Debug, Serialize)]
struct DayRecord<'a> {
    day_index: u32,
    date: NaiveDate,
    stage: &'a str,
    temperature_c: f64,
    weight_g: f64,
    population: u64,
    deaths: u64,
    biomass_kg: f64,
    feed_consumed_kg: f64,
    cumulative_feed_kg: f64,
    violation_count: usize,
    violations: String,
}

#[derive(Debug, Serialize)]
struct SensitivityRecord<'a> {
    parameter: String,
    variation_pct: f64,
    factor: f64,
    status: &'a str,
    final_weight_g: Option<f64>,
    final_population: Option<u64>,
    final_biomass_kg: Option<f64>,
    total_feed_kg: Option<f64>,
    error: Option<&'a str>,
}

/// One row per simulated day.
pub fn write_run_csv<W: Write>(out: W, run: &ProjectionRun) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for d in &run.days {
        writer
            .serialize(DayRecord {
                day_index: d.day_index,
                date: d.date,
                stage: &d.stage.0,
                temperature_c: d.temperature_c,
                weight_g: d.weight_g,
                population: d.population,
                deaths: d.deaths,
                biomass_kg: d.biomass_kg,
                feed_consumed_kg: d.feed_consumed_kg,
                cumulative_feed_kg: d.cumulative_feed_kg,
                violation_count: d.violations.len(),
                violations: d
                    .violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .with_context(|| format!("write day {}", d.day_index))?;
    }
    writer.flush().context("flush run csv")?;
    debug!(scenario = %run.scenario_id, rows = run.days.len(), "run exported");
    Ok(())
}

pub fn write_sensitivity_csv<W: Write>(out: W, rows: &[SensitivityRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for r in rows {
        let record = match &r.outcome {
            SensitivityOutcome::Completed(s) => SensitivityRecord {
                parameter: r.parameter.to_string(),
                variation_pct: r.variation_pct,
                factor: r.factor,
                status: "completed",
                final_weight_g: Some(s.final_weight_g),
                final_population: Some(s.final_population),
                final_biomass_kg: Some(s.final_biomass_kg),
                total_feed_kg: Some(s.total_feed_kg),
                error: None,
            },
            SensitivityOutcome::Failed { reason, .. } => SensitivityRecord {
                parameter: r.parameter.to_string(),
                variation_pct: r.variation_pct,
                factor: r.factor,
                status: "failed",
                final_weight_g: None,
                final_population: None,
                final_biomass_kg: None,
                total_feed_kg: None,
                error: Some(reason),
            },
        };
        writer
            .serialize(record)
            .with_context(|| format!("write variation {}%", r.variation_pct))?;
    }
    writer.flush().context("flush sensitivity csv")?;
    Ok(())
}

/// Columns are `scenario_id,status`, then each metric followed by its delta.
pub fn write_comparison_csv<W: Write>(out: W, table: &ComparisonTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["scenario_id".to_string(), "status".to_string()];
    for m in &table.metrics {
        header.push(m.name().to_string());
        header.push(format!("delta_{}", m.name()));
    }
    writer.write_record(&header).context("write comparison header")?;

    let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for row in &table.rows {
        let status = match row {
            ComparisonRow::NoRun { .. } => "no_run",
            ComparisonRow::Completed { .. } => "completed",
        };
        let mut record = vec![row.scenario_id().0.clone(), status.to_string()];
        for m in &table.metrics {
            record.push(cell(row.value(*m)));
            record.push(cell(row.delta(*m)));
        }
        writer
            .write_record(&record)
            .with_context(|| format!("write comparison row {}", row.scenario_id()))?;
    }
    writer.flush().context("flush comparison csv")?;
    Ok(())
}
