//! Application configuration.

use serde::Deserialize;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Upload lifecycle configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Node identity configuration.
    #[serde(default)]
    pub node: NodeConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait when opening a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for a free pooled connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Seconds an unused connection stays in the pool.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Seconds after which a connection is recycled.
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    /// Log every SQL statement at debug level.
    #[serde(default = "default_true")]
    pub log_statements: bool,
}

/// Upload lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Age after which an upload still initializing is considered abandoned.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Interval between stale-upload sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Maximum number of records handled per sweep.
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Node identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    /// Snowflake worker ID, unique per running process (0..1024).
    #[serde(default)]
    pub worker_id: u16,
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

const fn default_idle_timeout_secs() -> u64 {
    600
}

const fn default_max_lifetime_secs() -> u64 {
    1800
}

const fn default_true() -> bool {
    true
}

const fn default_stale_after_secs() -> u64 {
    24 * 60 * 60
}

const fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

const fn default_sweep_batch_size() -> u64 {
    500
}

fn default_log_filter() -> String {
    "filemeta=info".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_batch_size: default_sweep_batch_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl DatabaseConfig {
    /// Timeout for opening a connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Timeout for acquiring a pooled connection.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Idle time before a pooled connection is closed.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Maximum lifetime of a pooled connection.
    #[must_use]
    pub const fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl UploadConfig {
    /// Age after which an initializing upload is swept.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Interval between sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `FILEMETA_ENV`)
    /// 4. Environment variables with `FILEMETA_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let env = std::env::var("FILEMETA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FILEMETA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(
            r#"
            [database]
            url = "postgres://localhost/filemeta"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.database.acquire_timeout(), Duration::from_secs(10));
        assert_eq!(config.database.idle_timeout(), Duration::from_secs(600));
        assert_eq!(config.database.max_lifetime(), Duration::from_secs(1_800));
        assert!(config.database.log_statements);
        assert_eq!(config.upload.stale_after(), Duration::from_secs(86_400));
        assert_eq!(config.upload.sweep_interval(), Duration::from_secs(3_600));
        assert_eq!(config.upload.sweep_batch_size, 500);
        assert_eq!(config.logging.filter, "filemeta=info");
        assert!(!config.logging.json);
        assert_eq!(config.node.worker_id, 0);
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
            [database]
            url = "postgres://db/filemeta"
            max_connections = 5
            acquire_timeout_secs = 3
            log_statements = false

            [upload]
            stale_after_secs = 60
            sweep_batch_size = 10

            [logging]
            json = true

            [node]
            worker_id = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.acquire_timeout(), Duration::from_secs(3));
        assert_eq!(config.database.idle_timeout_secs, 600);
        assert!(!config.database.log_statements);
        assert_eq!(config.upload.stale_after_secs, 60);
        assert_eq!(config.upload.sweep_interval_secs, 3_600);
        assert_eq!(config.upload.sweep_batch_size, 10);
        assert!(config.logging.json);
        assert_eq!(config.node.worker_id, 7);
    }

    #[test]
    fn test_database_url_required() {
        assert!(parse("[upload]\nstale_after_secs = 1\n").is_err());
    }
}
