//! Store configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Result, StoreError};

fn default_max_connections() -> u32 {
    10
}

fn default_busy_timeout_seconds() -> u64 {
    5
}

fn default_max_users_per_team() -> i64 {
    50
}

fn default_cleanup_batch_size() -> i64 {
    1000
}

/// Store configuration parsed from `teamstore.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Connection URL, e.g. `sqlite://data/teamstore.db`.
    pub database_url: String,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_seconds")]
    pub busy_timeout_seconds: u64,
    /// Member capacity enforced by `save_multiple_members`; negative disables it.
    #[serde(default = "default_max_users_per_team")]
    pub max_users_per_team: i64,
    /// Rows removed per `cleanup_flags_batch` call by the admin CLI.
    #[serde(default = "default_cleanup_batch_size")]
    pub cleanup_batch_size: i64,
}

impl StoreConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| StoreError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a throwaway in-memory `SQLite` database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            busy_timeout_seconds: default_busy_timeout_seconds(),
            max_users_per_team: default_max_users_per_team(),
            cleanup_batch_size: default_cleanup_batch_size(),
        }
    }

    /// Busy timeout as a [`Duration`].
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(StoreError::Config("database_url must not be empty".into()));
        }

        if self.max_connections == 0 {
            return Err(StoreError::Config(
                "max_connections must be greater than zero".into(),
            ));
        }

        if self.cleanup_batch_size <= 0 {
            return Err(StoreError::Config(
                "cleanup_batch_size must be greater than zero".into(),
            ));
        }

        if !self.database_url.starts_with("sqlite:") {
            return Err(StoreError::Config(
                "database_url must use the sqlite: scheme".into(),
            ));
        }

        Ok(())
    }
}
