//! Database layer for meme-museum.
//!
//! Postgres in production, SQLite for local runs and tests. Both are reached
//! through the same SeaORM entities and repositories.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use museum_common::{AppError, Config, config::DatabaseConfig};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::log::LevelFilter;

/// Pool options for the configured database.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(config.log_statements)
        .sqlx_logging_level(LevelFilter::Debug);

    opt
}

/// Connect to the configured database.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let opt = connect_options(&config.database);

    let db = Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    tracing::info!(
        backend = ?db.get_database_backend(),
        max_connections = config.database.max_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
