//! Status repository for `SQLite` persistence.

use std::sync::Arc;

use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::models::now_millis;
use crate::models::status::{Presence, Status};
use crate::{Result, StoreError};

use super::db::Database;
use super::dialect::{decode_error, Dialect, ErrorClass};

/// Window counted by [`StatusStore::get_total_active_users_count`] (ms).
const ACTIVE_WINDOW_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Repository wrapping `SQLite` queries for user presence.
#[derive(Clone)]
pub struct StatusStore {
    db: Arc<Database>,
    dialect: Dialect,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct StatusRow {
    user_id: String,
    status: String,
    manual: bool,
    last_activity_at: i64,
    active_channel: String,
}

impl StatusRow {
    /// Convert a database row into the domain model.
    fn into_status(self) -> Result<Status> {
        let status = Presence::parse(&self.status)
            .ok_or_else(|| decode_error(format!("invalid status: {}", self.status)))?;
        Ok(Status {
            user_id: self.user_id,
            status,
            manual: self.manual,
            last_activity_at: self.last_activity_at,
            active_channel: self.active_channel,
        })
    }
}

impl StatusStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>, dialect: Dialect) -> Self {
        Self { db, dialect }
    }

    /// Insert the status, or overwrite the user's existing one.
    ///
    /// A concurrent insert of the same user between the existence probe and
    /// the insert is absorbed by retrying as an update.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if a statement fails.
    pub async fn save_or_update(&self, status: &Status) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM Status WHERE UserId = ?1")
            .bind(&status.user_id)
            .fetch_optional(self.db.as_ref())
            .await?;
        if exists.is_some() {
            return self.overwrite(status).await;
        }

        let inserted = sqlx::query(
            "INSERT INTO Status (UserId, Status, Manual, LastActivityAt, ActiveChannel)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&status.user_id)
        .bind(status.status.as_str())
        .bind(status.manual)
        .bind(status.last_activity_at)
        .bind(&status.active_channel)
        .execute(self.db.as_ref())
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if self.dialect.classify(&err) == ErrorClass::UniqueViolation => {
                debug!(user_id = %status.user_id, "status inserted concurrently, updating instead");
                self.overwrite(status).await
            }
            Err(err) => Err(StoreError::Db(err)),
        }
    }

    async fn overwrite(&self, status: &Status) -> Result<()> {
        sqlx::query(
            "UPDATE Status SET Status = ?1, Manual = ?2, LastActivityAt = ?3, ActiveChannel = ?4
             WHERE UserId = ?5",
        )
        .bind(status.status.as_str())
        .bind(status.manual)
        .bind(status.last_activity_at)
        .bind(&status.active_channel)
        .bind(&status.user_id)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Retrieve the user's status.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user has no status.
    pub async fn get(&self, user_id: &str) -> Result<Status> {
        let row: Option<StatusRow> = sqlx::query_as("SELECT * FROM Status WHERE UserId = ?1")
            .bind(user_id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.ok_or_else(|| StoreError::not_found("status", user_id))?
            .into_status()
    }

    /// Statuses of the listed users; users without one are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_by_ids(&self, user_ids: &[String]) -> Result<Vec<Status>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM Status WHERE UserId IN (");
        let mut list = qb.separated(", ");
        for user_id in user_ids {
            list.push_bind(user_id.clone());
        }
        list.push_unseparated(")");

        let rows: Vec<StatusRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        rows.into_iter().map(StatusRow::into_status).collect()
    }

    /// Set every status that was not chosen manually to offline.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn reset_all(&self) -> Result<u64> {
        let sql = format!(
            "UPDATE Status SET Status = ?1 WHERE Manual = {}",
            self.dialect.bool_literal(false)
        );
        let result = sqlx::query(&sql)
            .bind(Presence::Offline.as_str())
            .execute(self.db.as_ref())
            .await?;
        debug!(rows = result.rows_affected(), "reset statuses to offline");
        Ok(result.rows_affected())
    }

    /// Users active within the last 24 hours.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_total_active_users_count(&self) -> Result<i64> {
        let since = now_millis() - ACTIVE_WINDOW_MILLIS;
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(UserId) FROM Status WHERE LastActivityAt > ?1")
                .bind(since)
                .fetch_one(self.db.as_ref())
                .await?;
        Ok(count)
    }

    /// Record the user's latest activity time.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn update_last_activity_at(&self, user_id: &str, last_activity_at: i64) -> Result<()> {
        sqlx::query("UPDATE Status SET LastActivityAt = ?1 WHERE UserId = ?2")
            .bind(last_activity_at)
            .bind(user_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}
