//! System settings repository for `SQLite` persistence.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::models::system::System;
use crate::{Result, StoreError};

use super::db::Database;
use super::dialect::Dialect;

const SELECT_SYSTEM: &str = "SELECT Name, COALESCE(Value, '') AS Value FROM Systems";

/// Repository wrapping `SQLite` queries for system key/value settings.
#[derive(Clone)]
pub struct SystemStore {
    db: Arc<Database>,
    dialect: Dialect,
}

impl SystemStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>, dialect: Dialect) -> Self {
        Self { db, dialect }
    }

    /// Insert a new setting.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the name is taken.
    pub async fn save(&self, system: &System) -> Result<()> {
        sqlx::query("INSERT INTO Systems (Name, Value) VALUES (?1, ?2)")
            .bind(&system.name)
            .bind(&system.value)
            .execute(self.db.as_ref())
            .await
            .map_err(|err| {
                self.dialect
                    .write_error(err, || format!("system setting {} already exists", system.name))
            })?;
        Ok(())
    }

    /// Update the setting if it exists, otherwise insert it.
    ///
    /// The probe and the write are separate statements; two callers racing
    /// on a new name can still collide on the insert.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a concurrent insert won the race.
    pub async fn save_or_update(&self, system: &System) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM Systems WHERE Name = ?1")
            .bind(&system.name)
            .fetch_optional(self.db.as_ref())
            .await?;
        if exists.is_some() {
            self.update(system).await
        } else {
            self.save(system).await
        }
    }

    /// Overwrite an existing setting.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no setting has that name.
    pub async fn update(&self, system: &System) -> Result<()> {
        let result = sqlx::query("UPDATE Systems SET Value = ?1 WHERE Name = ?2")
            .bind(&system.value)
            .bind(&system.name)
            .execute(self.db.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("system", &system.name));
        }
        Ok(())
    }

    /// Every setting as a name to value map.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<System> = sqlx::query_as(SELECT_SYSTEM)
            .fetch_all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(|s| (s.name, s.value)).collect())
    }

    /// Retrieve one setting.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no setting has that name.
    pub async fn get_by_name(&self, name: &str) -> Result<System> {
        let sql = format!("{SELECT_SYSTEM} WHERE Name = ?1");
        sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(self.db.as_ref())
            .await?
            .ok_or_else(|| StoreError::not_found("system", name))
    }

    /// Remove a setting, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if a statement fails.
    pub async fn permanent_delete_by_name(&self, name: &str) -> Result<Option<System>> {
        let mut tx = self.db.begin().await?;
        let sql = format!("{SELECT_SYSTEM} WHERE Name = ?1");
        let existing: Option<System> = sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM Systems WHERE Name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(existing)
    }

    /// Insert the setting unless one with the same name exists.
    ///
    /// Runs at serializable isolation: of several callers racing on one
    /// name, exactly one inserts and every caller gets the stored setting
    /// back. The transaction rolls back if any statement fails.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the transaction cannot be opened, a
    /// statement fails, or the commit fails.
    pub async fn insert_if_exists(&self, system: &System) -> Result<System> {
        let mut tx = self.db.begin_with(self.dialect.begin_serializable()).await?;

        let sql = format!("{SELECT_SYSTEM} WHERE Name = ?1");
        let existing: Option<System> = sqlx::query_as(&sql)
            .bind(&system.name)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(existing) = existing {
            debug!(name = %existing.name, "system setting already present");
            tx.commit().await?;
            return Ok(existing);
        }

        sqlx::query("INSERT INTO Systems (Name, Value) VALUES (?1, ?2)")
            .bind(&system.name)
            .bind(&system.value)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(name = %system.name, "system setting inserted");
        Ok(system.clone())
    }
}
