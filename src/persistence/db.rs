//! `SQLite` connection pool setup and schema bootstrap.

use std::fs;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::{Result, StoreConfig, StoreError};

use super::schema;

/// Alias for the shared pool.
pub type Database = SqlitePool;

/// Open the pool described by `config` and apply the schema.
///
/// Creates the database file (and its parent directory) when missing.
///
/// # Errors
///
/// Returns `StoreError::Config` for an unusable URL or directory, and
/// `StoreError::Db` if the connection or schema application fails.
pub async fn connect(config: &StoreConfig) -> Result<Database> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|err| StoreError::Config(format!("invalid database_url: {err}")))?
        .create_if_missing(true)
        .busy_timeout(config.busy_timeout());

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::Config(format!("failed to create db dir: {err}")))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    schema::bootstrap_schema(&pool).await?;
    info!(url = %config.database_url, "database ready");
    Ok(pool)
}

/// Open a single-connection in-memory database with the schema applied.
///
/// The connection is never recycled, so the database lives as long as the
/// pool.
///
/// # Errors
///
/// Returns `StoreError::Db` if the connection or schema application fails.
pub async fn connect_memory() -> Result<Database> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}
