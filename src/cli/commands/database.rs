use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use crate::bootstrap::ensure_defaults;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::{DatabaseManager, PgStore, Store};
use crate::scheduler::sweep_once;
use crate::services::StepService;

async fn connect() -> anyhow::Result<PgStore> {
    let pool = DatabaseManager::connect(&config().database)
        .await
        .context("failed to connect to the database")?;
    Ok(PgStore::new(pool))
}

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    DatabaseManager::migrate(store.pool()).await?;
    output_success(&output_format, "Migrations applied", None)
}

pub async fn bootstrap(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    let defaults = ensure_defaults(&store, &config().bootstrap).await?;
    output_success(
        &output_format,
        "Defaults provisioned",
        Some(json!({
            "organization_id": defaults.organization_id,
            "team_id": defaults.team_id,
            "position_id": defaults.position_id,
        })),
    )
}

pub async fn sweep(output_format: OutputFormat) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(connect().await?);
    let finished = sweep_once(&StepService::new(store)).await;
    output_success(
        &output_format,
        &format!("Finished {} due steps", finished),
        Some(json!({ "finished": finished })),
    )
}
