//! Persistence layer modules.

use std::sync::Arc;

pub mod db;
pub mod dialect;
pub mod job_store;
pub mod preference_store;
pub mod schema;
pub mod status_store;
pub mod system_store;
pub mod team_store;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

use tracing::debug;

use self::db::Database;
use self::dialect::Dialect;
use self::job_store::JobStore;
use self::preference_store::PreferenceStore;
use self::status_store::StatusStore;
use self::system_store::SystemStore;
use self::team_store::TeamStore;

/// Every store, sharing one pool and dialect.
#[derive(Clone)]
pub struct Stores {
    /// Teams and memberships.
    pub team: TeamStore,
    /// User preferences.
    pub preference: PreferenceStore,
    /// User presence.
    pub status: StatusStore,
    /// Background jobs.
    pub job: JobStore,
    /// System settings.
    pub system: SystemStore,
}

impl Stores {
    /// Build every store over `db`.
    #[must_use]
    pub fn new(db: Arc<Database>, dialect: Dialect) -> Self {
        debug!(dialect = dialect.name(), "building stores");
        Self {
            team: TeamStore::new(Arc::clone(&db), dialect),
            preference: PreferenceStore::new(Arc::clone(&db), dialect),
            status: StatusStore::new(Arc::clone(&db), dialect),
            job: JobStore::new(Arc::clone(&db), dialect),
            system: SystemStore::new(db, dialect),
        }
    }
}
