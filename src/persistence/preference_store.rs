//! Preference repository for `SQLite` persistence.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::debug;

use crate::models::preference::{
    Preference, FEATURE_TOGGLE_PREFIX, PREFERENCE_CATEGORY_ADVANCED_SETTINGS,
    PREFERENCE_CATEGORY_FLAGGED_POST,
};
use crate::{Result, StoreError};

use super::db::Database;
use super::dialect::Dialect;

/// Repository wrapping `SQLite` queries for user preferences.
#[derive(Clone)]
pub struct PreferenceStore {
    db: Arc<Database>,
    dialect: Dialect,
}

impl PreferenceStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>, dialect: Dialect) -> Self {
        Self { db, dialect }
    }

    /// Upsert every preference in one transaction.
    ///
    /// Nothing is written unless every preference is valid and stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an invalid preference,
    /// `StoreError::Conflict` if a concurrent writer inserted the same key
    /// first, or `StoreError::Db` for other failures.
    pub async fn save(&self, preferences: &[Preference]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        for preference in preferences {
            preference.is_valid()?;
            self.upsert(&mut tx, preference).await?;
        }
        tx.commit().await?;
        debug!(count = preferences.len(), "saved preferences");
        Ok(())
    }

    async fn upsert(&self, conn: &mut SqliteConnection, preference: &Preference) -> Result<()> {
        if let Some(clause) = self
            .dialect
            .upsert_clause(&["UserId", "Category", "Name"], &["Value"])
        {
            let sql = format!(
                "INSERT INTO Preferences (UserId, Category, Name, Value) VALUES (?1, ?2, ?3, ?4) {clause}"
            );
            sqlx::query(&sql)
                .bind(&preference.user_id)
                .bind(&preference.category)
                .bind(&preference.name)
                .bind(&preference.value)
                .execute(&mut *conn)
                .await?;
            return Ok(());
        }

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM Preferences WHERE UserId = ?1 AND Category = ?2 AND Name = ?3",
        )
        .bind(&preference.user_id)
        .bind(&preference.category)
        .bind(&preference.name)
        .fetch_one(&mut *conn)
        .await?;

        if count == 1 {
            sqlx::query(
                "UPDATE Preferences SET Value = ?1 WHERE UserId = ?2 AND Category = ?3 AND Name = ?4",
            )
            .bind(&preference.value)
            .bind(&preference.user_id)
            .bind(&preference.category)
            .bind(&preference.name)
            .execute(&mut *conn)
            .await?;
            return Ok(());
        }

        sqlx::query("INSERT INTO Preferences (UserId, Category, Name, Value) VALUES (?1, ?2, ?3, ?4)")
            .bind(&preference.user_id)
            .bind(&preference.category)
            .bind(&preference.name)
            .bind(&preference.value)
            .execute(&mut *conn)
            .await
            .map_err(|err| {
                self.dialect.write_error(err, || {
                    format!(
                        "preference already exists (user_id={}, category={}, name={})",
                        preference.user_id, preference.category, preference.name
                    )
                })
            })?;
        Ok(())
    }

    /// Retrieve one preference.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the preference does not exist.
    pub async fn get(&self, user_id: &str, category: &str, name: &str) -> Result<Preference> {
        sqlx::query_as(
            "SELECT UserId, Category, Name, Value FROM Preferences
             WHERE UserId = ?1 AND Category = ?2 AND Name = ?3",
        )
        .bind(user_id)
        .bind(category)
        .bind(name)
        .fetch_optional(self.db.as_ref())
        .await?
        .ok_or_else(|| {
            StoreError::not_found(
                "preference",
                format!("user_id={user_id} category={category} name={name}"),
            )
        })
    }

    /// Every preference of the user in `category`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_category(&self, user_id: &str, category: &str) -> Result<Vec<Preference>> {
        let rows = sqlx::query_as(
            "SELECT UserId, Category, Name, Value FROM Preferences
             WHERE UserId = ?1 AND Category = ?2 ORDER BY Name",
        )
        .bind(user_id)
        .bind(category)
        .fetch_all(self.db.as_ref())
        .await?;
        Ok(rows)
    }

    /// Every preference of the user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all(&self, user_id: &str) -> Result<Vec<Preference>> {
        let rows = sqlx::query_as(
            "SELECT UserId, Category, Name, Value FROM Preferences
             WHERE UserId = ?1 ORDER BY Category, Name",
        )
        .bind(user_id)
        .fetch_all(self.db.as_ref())
        .await?;
        Ok(rows)
    }

    /// Remove every preference of the user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn permanent_delete_by_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM Preferences WHERE UserId = ?1")
            .bind(user_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Remove one preference.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn delete(&self, user_id: &str, category: &str, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM Preferences WHERE UserId = ?1 AND Category = ?2 AND Name = ?3")
            .bind(user_id)
            .bind(category)
            .bind(name)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Remove the user's preferences in `category`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn delete_category(&self, user_id: &str, category: &str) -> Result<()> {
        sqlx::query("DELETE FROM Preferences WHERE UserId = ?1 AND Category = ?2")
            .bind(user_id)
            .bind(category)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Remove the `(category, name)` preference of every user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn delete_category_and_name(&self, category: &str, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM Preferences WHERE Category = ?1 AND Name = ?2")
            .bind(category)
            .bind(name)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Delete up to `limit` flagged-post preferences whose post is gone.
    ///
    /// Returns the number of rows deleted; callers repeat until it is zero.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn cleanup_flags_batch(&self, limit: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM Preferences
             WHERE Category = ?1 AND Name IN (
                 SELECT * FROM (
                     SELECT Preferences.Name FROM Preferences
                     LEFT JOIN Posts ON Preferences.Name = Posts.Id
                     WHERE Preferences.Category = ?1 AND Posts.Id IS NULL
                     LIMIT ?2
                 ) AS t
             )",
        )
        .bind(PREFERENCE_CATEGORY_FLAGGED_POST)
        .bind(limit)
        .execute(self.db.as_ref())
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete pre-release feature toggles that were switched off.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn delete_unused_features(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM Preferences WHERE Category = ?1 AND Value = ?2 AND Name LIKE ?3",
        )
        .bind(PREFERENCE_CATEGORY_ADVANCED_SETTINGS)
        .bind("false")
        .bind(format!("{FEATURE_TOGGLE_PREFIX}%"))
        .execute(self.db.as_ref())
        .await?;
        debug!(
            rows = result.rows_affected(),
            "deleted unused feature toggles"
        );
        Ok(result.rows_affected())
    }
}
