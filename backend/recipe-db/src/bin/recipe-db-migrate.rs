//! Apply the embedded schema and exit
//!
//! Reads `DATABASE_*` settings from the environment (and `.env`), waits for
//! PostgreSQL to accept connections, then runs every pending migration.
//! Set `LOG_FORMAT=json` for structured output.

use anyhow::{Context, Result};
use recipe_db::{Database, DatabaseConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = DatabaseConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load database config: {}", e))?;
    config.run_migrations = true;

    init_tracing(config.debug);
    info!(config = ?config, "Starting recipe-db-migrate");

    let db = Database::connect(&config)
        .await
        .context("Failed to migrate database")?;
    db.close().await;

    info!("Migrations applied");
    Ok(())
}
