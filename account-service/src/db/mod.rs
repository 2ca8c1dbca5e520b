//! PostgreSQL pool and schema migrations.

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connect the pool sized by `DatabaseConfig`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.url)
        .await?;

    tracing::info!("PostgreSQL pool ready");
    Ok(pool)
}

/// Apply the schema and the seeded role catalogue.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
