//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use arena_ledger::db::DatabaseConfig;
use arena_ledger::ledger::LedgerConfig;
use arena_ledger::tournament::TournamentCatalog;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Where the ledger lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL via `DATABASE_URL`
    Postgres,
    /// Process memory; lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend `{other}` (expected postgres or memory)"),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Ledger backend
    pub storage: StorageBackend,
    /// Database configuration, used by the PostgreSQL backend
    pub database: DatabaseConfig,
    /// Retry, settlement and query tuning
    pub ledger: LedgerConfig,
    /// JSON file replacing the default tournament line-up
    pub tournaments_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `storage_override` - Optional backend override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let raw = std::env::var("SERVER_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("`{raw}` is not a socket address"),
                })?
            }
        };

        let storage = match storage_override {
            Some(storage) => storage,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(raw) => raw.parse()?,
                Err(_) => StorageBackend::Postgres,
            },
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let tournaments_file = std::env::var("TOURNAMENTS_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(ServerConfig {
            bind,
            storage,
            database,
            ledger: LedgerConfig::from_env(),
            tournaments_file,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.settlement_batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "SETTLEMENT_BATCH_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.ledger.settlement_poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SETTLEMENT_POLL_INTERVAL_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.ledger.leaderboard_size == 0 {
            return Err(ConfigError::Invalid {
                var: "LEADERBOARD_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.storage == StorageBackend::Postgres {
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }

    /// Load the tournament catalog, falling back to the default line-up
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Catalog` if the configured file is unreadable or malformed
    pub fn load_catalog(&self) -> Result<TournamentCatalog, ConfigError> {
        let Some(path) = &self.tournaments_file else {
            return Ok(TournamentCatalog::default());
        };

        let catalog_error = |reason: String| ConfigError::Catalog {
            path: path.display().to_string(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| catalog_error(e.to_string()))?;
        TournamentCatalog::from_json(&json).map_err(|e| catalog_error(e.to_string()))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Cannot load tournaments from {path}: {reason}")]
    Catalog { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            storage: StorageBackend::Postgres,
            database: DatabaseConfig::development(),
            ledger: LedgerConfig::default(),
            tournaments_file: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert_eq!(
            "Postgres".parse::<StorageBackend>().unwrap(),
            StorageBackend::Postgres
        );
        assert!(matches!(
            "sqlite".parse::<StorageBackend>(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_config_validation_zero_batch() {
        let mut config = config();
        config.ledger.settlement_batch_size = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SETTLEMENT_BATCH_SIZE"));
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = config();
        config.ledger.settlement_poll_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_pool_bounds_ignored_for_memory_backend() {
        let mut config = config();
        config.database.min_connections = 50;
        config.database.max_connections = 10;
        assert!(config.validate().is_err());

        config.storage = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_catalog_file() {
        let mut config = config();
        assert_eq!(config.load_catalog().unwrap().list().len(), 3);

        config.tournaments_file = Some(PathBuf::from("/nonexistent/tournaments.json"));
        let err = config.load_catalog().unwrap_err();
        assert!(matches!(err, ConfigError::Catalog { .. }));
    }
}
