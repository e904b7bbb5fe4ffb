//! Persistence for file records: the `files` entity, its migrations, and
//! the repository that enforces the record lifecycle.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use filemeta_common::{AppError, AppResult, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::log::LevelFilter;

/// Build pool options from the database section of the configuration.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout())
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .sqlx_logging(config.log_statements)
        .sqlx_logging_level(LevelFilter::Debug);

    opt
}

/// Open the connection pool.
pub async fn connect(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply pending migrations to the `files` schema.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();

    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    tracing::info!(applied = pending, "Migrations up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn db_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://filemeta@localhost/filemeta".to_string(),
            max_connections: 8,
            min_connections: 1,
            connect_timeout_secs: 3,
            acquire_timeout_secs: 4,
            idle_timeout_secs: 60,
            max_lifetime_secs: 120,
            log_statements: false,
        }
    }

    #[test]
    fn test_connect_options_follow_config() {
        let opt = connect_options(&db_config());

        assert_eq!(opt.get_url(), "postgres://filemeta@localhost/filemeta");
        assert_eq!(opt.get_max_connections(), Some(8));
        assert_eq!(opt.get_min_connections(), Some(1));
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(opt.get_acquire_timeout(), Some(Duration::from_secs(4)));
        assert_eq!(opt.get_idle_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(opt.get_max_lifetime(), Some(Duration::from_secs(120)));
        assert!(!opt.get_sqlx_logging());
    }
}
