#![forbid(unsafe_code)]

//! `teamstore-admin`: maintenance commands for a teamstore database.
//!
//! Loads the store configuration, opens the pool (bootstrapping the schema)
//! and runs one maintenance sweep per invocation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use teamstore::persistence::db;
use teamstore::persistence::dialect::Dialect;
use teamstore::persistence::Stores;
use teamstore::{Result, StoreConfig, StoreError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "teamstore-admin", about = "Teamstore maintenance commands", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create missing tables and indexes.
    Init,
    /// Move legacy scheme role ids out of every membership's roles column.
    MigrateTeamMembers,
    /// Strip custom roles from every team membership.
    ClearCustomRoles,
    /// Set every non-manual status to offline.
    ResetStatuses,
    /// Delete flagged-post preferences whose post no longer exists.
    CleanupFlags {
        /// Rows deleted per statement; defaults to `cleanup_batch_size`.
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Delete switched-off pre-release feature toggles.
    PruneFeatures,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| StoreError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = StoreConfig::load_from_path(&args.config)?;
    info!(config = %args.config.display(), "configuration loaded");

    let pool = Arc::new(db::connect(&config).await?);
    let stores = Stores::new(pool, Dialect::Sqlite);

    match args.command {
        Command::Init => info!("schema ready"),
        Command::MigrateTeamMembers => {
            let report = stores.team.migrate_all_team_members().await?;
            info!(batches = report.batches, rows = report.rows, "migration finished");
        }
        Command::ClearCustomRoles => {
            let updated = stores.team.clear_all_custom_role_assignments().await?;
            info!(updated, "custom roles cleared");
        }
        Command::ResetStatuses => {
            let rows = stores.status.reset_all().await?;
            info!(rows, "statuses reset");
        }
        Command::CleanupFlags { batch_size } => {
            let batch_size = batch_size.unwrap_or(config.cleanup_batch_size);
            if batch_size <= 0 {
                return Err(StoreError::InvalidInput(format!(
                    "batch size must be positive, got {batch_size}"
                )));
            }
            let mut total: u64 = 0;
            loop {
                let deleted = stores.preference.cleanup_flags_batch(batch_size).await?;
                if deleted == 0 {
                    break;
                }
                total += deleted;
                info!(deleted, total, "flag cleanup batch");
            }
            info!(total, "flag cleanup finished");
        }
        Command::PruneFeatures => {
            let rows = stores.preference.delete_unused_features().await?;
            info!(rows, "unused feature toggles pruned");
        }
    }

    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| StoreError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| StoreError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
