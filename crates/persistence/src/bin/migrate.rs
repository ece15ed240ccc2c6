#![deny(warnings)]

use anyhow::Context;
use persistence::default_sqlite_url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    // Ensure directory exists
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .filter(|p| !p.starts_with(":memory:"));
    if let Some(parent) = path.and_then(|p| std::path::Path::new(p).parent()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let pool = persistence::init_db(&url).await?;
    let scenarios = persistence::list_scenarios(&pool).await?;
    println!("DB migrated at {} ({} scenarios)", url, scenarios.len());
    Ok(())
}
