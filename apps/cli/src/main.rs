#![deny(warnings)]

//! Headless CLI for running growth projections, sensitivity sweeps and
//! scenario comparisons.

mod config;

use anyhow::{bail, Context, Result};
use aqua_analysis::{compare, MetricGroup, SensitivityOutcome, SensitivityParameter};
use aqua_core::{ProjectionRun, ScenarioId};
use aqua_models::TemperatureSeries;
use aqua_runtime::RunRegistry;
use clap::{Parser, Subcommand};
use config::ScenarioFile;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "aqua", version, long_version = LONG_VERSION, about)]
struct Cli {
    /// SQLite URL; scenarios and runs are stored there when given.
    #[arg(long, global = true)]
    db: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Project one scenario and print its summary.
    Run {
        scenario: PathBuf,
        /// Constraint set to check against, `name` or `name@version`.
        #[arg(long)]
        constraint_set: Option<String>,
        /// Write the day rows as CSV.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the whole run as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Re-run a scenario with one parameter scaled by each variation (%).
    Sensitivity {
        scenario: PathBuf,
        #[arg(long)]
        parameter: SensitivityParameter,
        #[arg(
            long,
            value_delimiter = ',',
            allow_hyphen_values = true,
            default_values_t = [-10.0, 0.0, 10.0]
        )]
        variations: Vec<f64>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Compare scenario files and stored runs side by side. The first
    /// scenario is the baseline.
    Compare {
        scenarios: Vec<PathBuf>,
        /// Stored scenario ids to include (needs --db).
        #[arg(long = "id")]
        ids: Vec<String>,
        #[arg(long, value_delimiter = ',', default_value = "all")]
        metrics: Vec<MetricGroup>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Export the stored run of a scenario as CSV (needs --db).
    Export {
        id: String,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List stored scenarios (needs --db).
    List,
    /// Delete a stored scenario and its run (needs --db).
    Delete { id: String },
    /// Print the resolved daily temperatures over a scenario's window.
    Temperature { scenario: PathBuf },
}

async fn open_db(url: &Option<String>) -> Result<Option<SqlitePool>> {
    match url {
        Some(url) => Ok(Some(persistence::init_db(url).await?)),
        None => Ok(None),
    }
}

fn require_db(pool: Option<SqlitePool>) -> Result<SqlitePool> {
    pool.context("this command needs --db")
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("create {}", path.display()))
}

fn print_summary(run: &ProjectionRun) {
    let s = run.summary();
    println!(
        "{} | days: {} | weight: {:.1} g | population: {} ({:.2}% survival) | biomass: {:.1} kg | feed: {:.1} kg | FCR: {} | SGR: {} | violations: {}",
        run.scenario_id,
        s.days,
        s.final_weight_g,
        s.final_population,
        s.survival_pct,
        s.final_biomass_kg,
        s.total_feed_kg,
        s.realized_fcr.map_or_else(|| "-".to_string(), |v| format!("{v:.3}")),
        s.sgr_pct_per_day.map_or_else(|| "-".to_string(), |v| format!("{v:.3}%/d")),
        s.violation_count
    );
}

async fn run(
    db: Option<SqlitePool>,
    path: &Path,
    constraint_set: Option<&str>,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let scenario = ScenarioFile::load(path, constraint_set)?;
    if let Some(pool) = &db {
        persistence::save_scenario(pool, &scenario).await?;
    }
    let run = aqua_runtime::run_projection(&scenario)
        .with_context(|| format!("projection of {}", scenario.id))?;

    if let Some(pool) = &db {
        persistence::replace_run(pool, &run).await?;
    }
    if let Some(out) = out {
        data_pipeline::write_run_csv(create(out)?, &run)?;
        info!(path = %out.display(), "day rows written");
    }
    if json {
        serde_json::to_writer_pretty(io::stdout().lock(), &run)?;
        println!();
    } else {
        print_summary(&run);
        for v in run.violations().take(10) {
            println!("  {v}");
        }
        if run.summary().violation_count > 10 {
            println!("  ...");
        }
    }
    Ok(())
}

fn sensitivity(
    path: &Path,
    parameter: SensitivityParameter,
    variations: &[f64],
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let scenario = ScenarioFile::load(path, None)?;
    let rows = aqua_analysis::analyze(&scenario, parameter, variations);
    if let Some(out) = out {
        data_pipeline::write_sensitivity_csv(create(out)?, &rows)?;
    }
    if json {
        serde_json::to_writer_pretty(io::stdout().lock(), &rows)?;
        println!();
        return Ok(());
    }
    for r in &rows {
        match &r.outcome {
            SensitivityOutcome::Completed(s) => println!(
                "{parameter} {:+.1}% | weight: {:.1} g | population: {} | biomass: {:.1} kg | feed: {:.1} kg",
                r.variation_pct, s.final_weight_g, s.final_population, s.final_biomass_kg, s.total_feed_kg
            ),
            SensitivityOutcome::Failed { reason, .. } => {
                println!("{parameter} {:+.1}% | failed: {reason}", r.variation_pct)
            }
        }
    }
    Ok(())
}

async fn compare_cmd(
    db: Option<SqlitePool>,
    paths: &[PathBuf],
    stored: &[String],
    groups: BTreeSet<MetricGroup>,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let registry = RunRegistry::new();
    let mut ids = Vec::new();

    let scenarios = paths
        .iter()
        .map(|p| ScenarioFile::load(p, None))
        .collect::<Result<Vec<_>>>()?;
    for (id, result) in aqua_runtime::run_many(&scenarios) {
        match result {
            Ok(run) => {
                registry.replace(run);
            }
            Err(e) => warn!(scenario = %id, error = %e, "projection failed; compared as no run"),
        }
        ids.push(id);
    }
    if !stored.is_empty() {
        let pool = require_db(db)?;
        for id in stored.iter().map(|s| ScenarioId(s.clone())) {
            if let Some(run) = persistence::load_latest_run(&pool, &id).await? {
                registry.replace(run);
            }
            ids.push(id);
        }
    }
    if ids.is_empty() {
        bail!("nothing to compare");
    }

    let table = compare(&ids, &groups, &registry);
    if let Some(out) = out {
        data_pipeline::write_comparison_csv(create(out)?, &table)?;
    }
    if json {
        serde_json::to_writer_pretty(io::stdout().lock(), &table)?;
        println!();
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    write!(stdout, "{:<20}", "scenario")?;
    for m in &table.metrics {
        write!(stdout, " {:>18}", m.name())?;
    }
    writeln!(stdout)?;
    for row in &table.rows {
        write!(stdout, "{:<20}", row.scenario_id().to_string())?;
        for m in &table.metrics {
            match (row.value(*m), row.delta(*m)) {
                (Some(v), Some(d)) if d != 0.0 => write!(stdout, " {:>10.2} ({:+.2})", v, d)?,
                (Some(v), _) => write!(stdout, " {:>18.2}", v)?,
                (None, _) => write!(stdout, " {:>18}", "no run")?,
            }
        }
        writeln!(stdout)?;
    }
    Ok(())
}

async fn export(db: Option<SqlitePool>, id: &str, out: Option<&Path>) -> Result<()> {
    let pool = require_db(db)?;
    let id = ScenarioId(id.to_string());
    let Some(run) = persistence::load_latest_run(&pool, &id).await? else {
        bail!("scenario {id} has no stored run");
    };
    match out {
        Some(out) => data_pipeline::write_run_csv(create(out)?, &run)?,
        None => data_pipeline::write_run_csv(io::stdout().lock(), &run)?,
    }
    Ok(())
}

async fn list(db: Option<SqlitePool>) -> Result<()> {
    let pool = require_db(db)?;
    for s in persistence::list_scenarios(&pool).await? {
        println!(
            "{:<20} {:<30} updated {} {}",
            s.id,
            s.name,
            s.updated_at,
            if s.has_run { "[run]" } else { "" }
        );
    }
    Ok(())
}

async fn delete(db: Option<SqlitePool>, id: &str) -> Result<()> {
    let pool = require_db(db)?;
    let id = ScenarioId(id.to_string());
    if !persistence::delete_scenario(&pool, &id).await? {
        bail!("scenario {id} not found");
    }
    println!("deleted {id}");
    Ok(())
}

fn temperature(path: &Path) -> Result<()> {
    let scenario = ScenarioFile::load(path, None)?;
    let series = TemperatureSeries::from_profile(&scenario.growth.temperature)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "date,temperature_c")?;
    for (date, value) in series.daily_values(scenario.start_date, scenario.duration_days) {
        match value {
            Some(v) => writeln!(stdout, "{date},{v}")?,
            None => writeln!(stdout, "{date},")?,
        }
    }
    if let Some(gap) = series.first_gap(scenario.start_date, scenario.duration_days) {
        warn!(%gap, "temperature series has no value from this date");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!(command = ?cli.command, db = ?cli.db, "starting CLI");
    let db = open_db(&cli.db).await?;

    match cli.command {
        Command::Run {
            scenario,
            constraint_set,
            out,
            json,
        } => run(db, &scenario, constraint_set.as_deref(), out.as_deref(), json).await,
        Command::Sensitivity {
            scenario,
            parameter,
            variations,
            out,
            json,
        } => sensitivity(&scenario, parameter, &variations, out.as_deref(), json),
        Command::Compare {
            scenarios,
            ids,
            metrics,
            out,
            json,
        } => {
            let groups = metrics.into_iter().collect();
            compare_cmd(db, &scenarios, &ids, groups, out.as_deref(), json).await
        }
        Command::Export { id, out } => export(db, &id, out.as_deref()).await,
        Command::List => list(db).await,
        Command::Delete { id } => delete(db, &id).await,
        Command::Temperature { scenario } => temperature(&scenario),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_variations() {
        let cli = Cli::try_parse_from([
            "aqua",
            "sensitivity",
            "s.yaml",
            "--parameter",
            "mortality",
            "--variations",
            "-20,0,20",
        ])
        .unwrap();
        match cli.command {
            Command::Sensitivity {
                parameter,
                variations,
                ..
            } => {
                assert_eq!(parameter, SensitivityParameter::Mortality);
                assert_eq!(variations, vec![-20.0, 0.0, 20.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_writes_one_csv_row_per_day() {
        let scenario = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/scenarios/baseline.yaml");
        let out = std::env::temp_dir().join(format!("aqua-run-{}.csv", std::process::id()));
        run(None, &scenario, None, Some(&out), false).await.unwrap();
        let days = ScenarioFile::load(&scenario, None).unwrap().duration_days as usize;
        let text = std::fs::read_to_string(&out).unwrap();
        std::fs::remove_file(&out).unwrap();
        assert_eq!(text.lines().count(), days + 1);
        assert!(text.starts_with("day_index,date,stage"));
    }

    #[test]
    fn compare_defaults_to_all_metrics() {
        let cli = Cli::try_parse_from(["aqua", "--db", "sqlite::memory:", "compare", "a.yaml", "--id", "b"])
            .unwrap();
        assert_eq!(cli.db.as_deref(), Some("sqlite::memory:"));
        match cli.command {
            Command::Compare { metrics, ids, .. } => {
                assert_eq!(metrics, vec![MetricGroup::All]);
                assert_eq!(ids, vec!["b".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
