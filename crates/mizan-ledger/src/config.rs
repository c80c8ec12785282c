//! Ledger configuration.
//!
//! Loaded from environment variables with fallback to defaults, or built
//! in code with the builder methods.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MIZAN_DATABASE_PATH` | `./mizan.db` |
//! | `MIZAN_MAX_CONNECTIONS` | `5` |
//! | `MIZAN_BUSY_TIMEOUT_MS` | `5000` |
//! | `MIZAN_TRANSACTION_TIMEOUT_MS` | `10000` |
//! | `MIZAN_INVOICE_ATTEMPTS` | `5` |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use mizan_db::DbConfig;

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long one statement waits for another writer's lock
    pub busy_timeout: Duration,

    /// Upper bound for one whole operation, lock waits included
    pub transaction_timeout: Duration,

    /// Tries per create when the generated invoice number is taken
    pub invoice_attempts: u32,

    /// Single-connection in-memory database
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./mizan.db"),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
            transaction_timeout: Duration::from_millis(10_000),
            invoice_attempts: 5,
            in_memory: false,
        }
    }
}

impl LedgerConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        LedgerConfig {
            database_path: database_path.into(),
            ..Default::default()
        }
    }

    /// In-memory database for tests.
    pub fn in_memory() -> Self {
        LedgerConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            in_memory: true,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            database_path: lookup("MIZAN_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "MIZAN_MAX_CONNECTIONS", defaults.max_connections)?,

            busy_timeout: Duration::from_millis(parse_or(
                &lookup,
                "MIZAN_BUSY_TIMEOUT_MS",
                defaults.busy_timeout.as_millis() as u64,
            )?),

            transaction_timeout: Duration::from_millis(parse_or(
                &lookup,
                "MIZAN_TRANSACTION_TIMEOUT_MS",
                defaults.transaction_timeout.as_millis() as u64,
            )?),

            invoice_attempts: parse_or(&lookup, "MIZAN_INVOICE_ATTEMPTS", defaults.invoice_attempts)?,

            in_memory: false,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn invoice_attempts(mut self, attempts: u32) -> Self {
        self.invoice_attempts = attempts;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("MIZAN_MAX_CONNECTIONS".to_string()));
        }
        if self.transaction_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("MIZAN_TRANSACTION_TIMEOUT_MS".to_string()));
        }
        if self.invoice_attempts == 0 {
            return Err(ConfigError::InvalidValue("MIZAN_INVOICE_ATTEMPTS".to_string()));
        }
        Ok(())
    }

    /// Storage settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        let base = if self.in_memory {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path).max_connections(self.max_connections)
        };
        base.busy_timeout(self.busy_timeout)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
