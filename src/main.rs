use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sqlx::PgPool;
use tracing::{info, warn};

use acheer_api::app::{router, AppState};
use acheer_api::auth::AuthService;
use acheer_api::bootstrap::ensure_defaults;
use acheer_api::config::AppConfig;
use acheer_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use acheer_api::scheduler;

#[derive(Parser, Debug)]
#[command(name = "acheer-api")]
#[command(about = "Acheer API server")]
#[command(version)]
struct ServerArgs {
    #[arg(long, help = "Serve from the in-memory store instead of Postgres")]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = AppConfig::load()?;
    info!("Starting Acheer API in {:?} mode", config.environment);

    let (store, pool): (Arc<dyn Store>, Option<PgPool>) = if args.memory {
        warn!("Serving from the in-memory store; nothing is persisted");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        (store, None)
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
        (store, Some(pool))
    };

    let defaults = ensure_defaults(store.as_ref(), &config.bootstrap)
        .await
        .context("failed to provision defaults")?;

    let auth = AuthService::from_config(&config.security);
    let state = AppState::new(store, defaults, auth, pool);

    if config.scheduler.enabled {
        scheduler::spawn(
            state.services.steps.clone(),
            Duration::from_secs(config.scheduler.sweep_interval_secs.max(1)),
        );
    }

    let app = router(state, &config.security);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Acheer API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
