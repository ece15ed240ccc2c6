#![deny(warnings)]

//! Persistence layer: SQLite store for scenarios and their latest projection
//! run.
//!
//! Scenarios are stored as JSON documents. A run is stored as its pinned
//! model snapshot plus one row per simulated day, and is always replaced as a
//! whole inside one transaction.

use anyhow::{bail, Context, Result};
use aqua_core::{ProjectionDay, ProjectionRun, Scenario, ScenarioId, StageId};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, info};

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/projections.db"
}

/// Open (creating if missing) and migrate the database at `url`.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid sqlite url {url}"))?
        .create_if_missing(true)
        .foreign_keys(true);
    // Every in-memory connection is its own database.
    let max_connections = if url.contains(":memory:") { 1 } else { 4 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("connect {url}"))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("run migrations")?;
    info!(%url, "database ready");
    Ok(pool)
}

/// Listing entry for a stored scenario.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ScenarioRow {
    pub id: String,
    pub name: String,
    pub updated_at: String,
    pub has_run: bool,
}

#[derive(Debug, FromRow)]
struct RunRow {
    id: i64,
    snapshot_json: String,
}

#[derive(Debug, FromRow)]
struct DayRow {
    day_index: i64,
    date: String,
    stage: String,
    temperature_c: f64,
    weight_g: f64,
    population: i64,
    deaths: i64,
    biomass_kg: f64,
    feed_consumed_kg: f64,
    cumulative_feed_kg: f64,
    violations_json: String,
}

impl TryFrom<DayRow> for ProjectionDay {
    type Error = anyhow::Error;

    fn try_from(r: DayRow) -> Result<Self> {
        Ok(ProjectionDay {
            day_index: u32::try_from(r.day_index).context("day_index out of range")?,
            date: NaiveDate::from_str(&r.date)
                .with_context(|| format!("bad date {} on day {}", r.date, r.day_index))?,
            stage: StageId(r.stage),
            temperature_c: r.temperature_c,
            weight_g: r.weight_g,
            population: u64::try_from(r.population).context("negative population")?,
            deaths: u64::try_from(r.deaths).context("negative deaths")?,
            biomass_kg: r.biomass_kg,
            feed_consumed_kg: r.feed_consumed_kg,
            cumulative_feed_kg: r.cumulative_feed_kg,
            violations: serde_json::from_str(&r.violations_json)
                .with_context(|| format!("violations on day {}", r.day_index))?,
        })
    }
}

/// Insert or update a scenario. An existing run is kept; it is stale until
/// the scenario is re-run.
pub async fn save_scenario(pool: &SqlitePool, scenario: &Scenario) -> Result<()> {
    let body = serde_json::to_string(scenario).context("serialize scenario")?;
    sqlx::query(
        "INSERT INTO scenarios (id, name, body_json) VALUES (?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, body_json = excluded.body_json, \
         updated_at = CURRENT_TIMESTAMP",
    )
    .bind(&scenario.id.0)
    .bind(&scenario.name)
    .bind(body)
    .execute(pool)
    .await
    .with_context(|| format!("save scenario {}", scenario.id))?;
    debug!(scenario = %scenario.id, "scenario saved");
    Ok(())
}

pub async fn load_scenario(pool: &SqlitePool, id: &ScenarioId) -> Result<Option<Scenario>> {
    let body: Option<String> = sqlx::query_scalar("SELECT body_json FROM scenarios WHERE id = ?")
        .bind(&id.0)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("load scenario {id}"))?;
    body.map(|b| serde_json::from_str(&b).with_context(|| format!("decode scenario {id}")))
        .transpose()
}

pub async fn list_scenarios(pool: &SqlitePool) -> Result<Vec<ScenarioRow>> {
    sqlx::query_as::<_, ScenarioRow>(
        "SELECT s.id, s.name, s.updated_at, EXISTS \
         (SELECT 1 FROM projection_runs r WHERE r.scenario_id = s.id) AS has_run \
         FROM scenarios s ORDER BY s.id",
    )
    .fetch_all(pool)
    .await
    .context("list scenarios")
}

/// Delete a scenario together with its run. Returns whether it existed.
pub async fn delete_scenario(pool: &SqlitePool, id: &ScenarioId) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin delete")?;
    delete_run_rows(&mut tx, id).await?;
    let deleted = sqlx::query("DELETE FROM scenarios WHERE id = ?")
        .bind(&id.0)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("delete scenario {id}"))?
        .rows_affected();
    tx.commit().await.context("commit delete")?;
    info!(scenario = %id, existed = deleted > 0, "scenario deleted");
    Ok(deleted > 0)
}

async fn delete_run_rows(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: &ScenarioId,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM projection_days WHERE run_id IN \
         (SELECT id FROM projection_runs WHERE scenario_id = ?)",
    )
    .bind(&id.0)
    .execute(&mut **tx)
    .await
    .context("delete day rows")?;
    sqlx::query("DELETE FROM projection_runs WHERE scenario_id = ?")
        .bind(&id.0)
        .execute(&mut **tx)
        .await
        .context("delete run row")?;
    Ok(())
}

/// Replace the stored run of a scenario. Readers see either the previous run
/// or the new one, never a mix. The scenario must already be saved.
pub async fn replace_run(pool: &SqlitePool, run: &ProjectionRun) -> Result<i64> {
    let id = &run.scenario_id;
    let snapshot = serde_json::to_string(&run.snapshot).context("serialize snapshot")?;
    let mut tx = pool.begin().await.context("begin replace")?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scenarios WHERE id = ?")
        .bind(&id.0)
        .fetch_one(&mut *tx)
        .await
        .context("check scenario")?;
    if exists == 0 {
        bail!("scenario {id} is not saved");
    }

    delete_run_rows(&mut tx, id).await?;
    let run_id = sqlx::query("INSERT INTO projection_runs (scenario_id, snapshot_json) VALUES (?, ?)")
        .bind(&id.0)
        .bind(snapshot)
        .execute(&mut *tx)
        .await
        .context("insert run")?
        .last_insert_rowid();

    for d in &run.days {
        let violations = serde_json::to_string(&d.violations).context("serialize violations")?;
        sqlx::query(
            "INSERT INTO projection_days (run_id, day_index, date, stage, temperature_c, weight_g, \
             population, deaths, biomass_kg, feed_consumed_kg, cumulative_feed_kg, violations_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(i64::from(d.day_index))
        .bind(d.date.to_string())
        .bind(&d.stage.0)
        .bind(d.temperature_c)
        .bind(d.weight_g)
        .bind(i64::try_from(d.population).context("population out of range")?)
        .bind(i64::try_from(d.deaths).context("deaths out of range")?)
        .bind(d.biomass_kg)
        .bind(d.feed_consumed_kg)
        .bind(d.cumulative_feed_kg)
        .bind(violations)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert day {}", d.day_index))?;
    }
    tx.commit().await.context("commit replace")?;
    info!(scenario = %id, run_id, days = run.days.len(), "run stored");
    Ok(run_id)
}

/// The stored run of a scenario, with days in order.
pub async fn load_latest_run(pool: &SqlitePool, id: &ScenarioId) -> Result<Option<ProjectionRun>> {
    let row = sqlx::query_as::<_, RunRow>(
        "SELECT id, snapshot_json FROM projection_runs WHERE scenario_id = ?",
    )
    .bind(&id.0)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("load run of {id}"))?;
    let Some(row) = row else {
        return Ok(None);
    };

    let days = sqlx::query_as::<_, DayRow>(
        "SELECT day_index, date, stage, temperature_c, weight_g, population, deaths, biomass_kg, \
         feed_consumed_kg, cumulative_feed_kg, violations_json \
         FROM projection_days WHERE run_id = ? ORDER BY day_index",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("load days of {id}"))?
    .into_iter()
    .map(ProjectionDay::try_from)
    .collect::<Result<Vec<_>>>()?;

    Ok(Some(ProjectionRun {
        scenario_id: id.clone(),
        snapshot: serde_json::from_str(&row.snapshot_json).context("decode snapshot")?,
        days,
    }))
}
