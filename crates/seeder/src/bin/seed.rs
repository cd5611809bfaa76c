//! Seed script - applies the SQL seeders configured in `seed.toml`
//!
//! Run with:
//! ```
//! cargo run -p seeder --bin seed [path/to/seed.toml]
//! ```

use std::path::{Path, PathBuf};

use seeder::config::{CONFIG_FILE_NAME, SeedConfig};
use seeder::{
    DirectorySource, PgHistoryStore, RunSummary, SeedClient, SeedError, SeedRunner,
    SqlScriptLoader,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir()?.join(CONFIG_FILE_NAME),
    };

    match run(&config_path).await {
        Ok(summary) => {
            tracing::info!("Seed completed!");
            tracing::info!("  Environment: {}", summary.environment);
            tracing::info!("  Executed: {}", summary.executed);
            tracing::info!("  Skipped: {}", summary.skipped);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Seeding failed: {e:#}");
            Err(e.into())
        }
    }
}

async fn run(config_path: &Path) -> Result<RunSummary, SeedError> {
    let config = SeedConfig::load(config_path)?;
    let database_url = config.database_url_with(|key| std::env::var(key).ok())?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    let result = seed(&pool, &config, config_path).await;
    pool.disconnect().await;
    result
}

async fn seed(
    pool: &PgPool,
    config: &SeedConfig,
    config_path: &Path,
) -> Result<RunSummary, SeedError> {
    let runner = SeedRunner::new(pool.clone(), config.runner.clone());

    let settings = runner.settings();
    if settings.track_runs && config.create_history_table {
        ensure_history_table(pool, &settings.seed_run_model).await;
    }

    let source = DirectorySource::new(config.seeders_dir(config_path), SqlScriptLoader)
        .with_pattern(&config.seeders_pattern);
    tracing::info!("Discovering seeders in {}", source.dir().display());

    runner.run_source(&source).await
}

/// Tracking degrades instead of failing the run when the table cannot be
/// created.
async fn ensure_history_table(pool: &PgPool, model: &str) {
    let created = match PgHistoryStore::new(pool.clone(), model) {
        Ok(store) => store.ensure_table().await,
        Err(e) => Err(e),
    };
    if let Err(e) = created {
        tracing::warn!("Could not create seed history table: {e}");
    }
}
