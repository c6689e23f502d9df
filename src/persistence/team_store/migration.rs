//! Cursor-driven sweeps over every team membership.
//!
//! Both sweeps walk the `(TeamId, UserId)` key space in ascending order, one
//! transaction per batch, so an interrupted run can resume from the last
//! returned cursor.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::ID_LENGTH;
use crate::roles::{is_built_in_role, partition_scheme_roles, SchemeFlags};
use crate::Result;

use super::TeamStore;

/// Rows per transaction in [`TeamStore::migrate_team_members`].
pub const MIGRATION_BATCH_SIZE: i64 = 100;

/// Rows per transaction in [`TeamStore::clear_all_custom_role_assignments`].
pub const CLEAR_ROLES_BATCH_SIZE: i64 = 1000;

/// Position in the membership key space; rows strictly after it are next.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MemberCursor {
    /// Team id of the last processed row.
    pub team_id: String,
    /// User id of the last processed row.
    pub user_id: String,
}

impl MemberCursor {
    /// Cursor before the first membership.
    #[must_use]
    pub fn start() -> Self {
        Self::default()
    }

    fn zeros() -> Self {
        let zeros = "0".repeat(ID_LENGTH);
        Self {
            team_id: zeros.clone(),
            user_id: zeros,
        }
    }
}

/// Totals of a completed [`TeamStore::migrate_all_team_members`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Committed batches.
    pub batches: usize,
    /// Rows rewritten.
    pub rows: usize,
}

#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct LegacyMemberRow {
    team_id: String,
    user_id: String,
    roles: String,
    scheme_guest: Option<bool>,
    scheme_user: Option<bool>,
    scheme_admin: Option<bool>,
}

impl TeamStore {
    /// Rewrite the next batch of memberships after `cursor` so that scheme
    /// role ids live only in the flags.
    ///
    /// Null flags are written as false. Returns the key of the last row
    /// processed, or `None` once no rows remain.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if a statement or the commit fails; the batch
    /// is rolled back.
    pub async fn migrate_team_members(&self, cursor: &MemberCursor) -> Result<Option<MemberCursor>> {
        Ok(self.migrate_batch(cursor).await?.map(|(next, _)| next))
    }

    async fn migrate_batch(&self, cursor: &MemberCursor) -> Result<Option<(MemberCursor, usize)>> {
        let mut tx = self.db.begin().await?;

        let rows: Vec<LegacyMemberRow> = sqlx::query_as(
            "SELECT TeamId, UserId, Roles, SchemeGuest, SchemeUser, SchemeAdmin
             FROM TeamMembers
             WHERE (TeamId, UserId) > (?1, ?2)
             ORDER BY TeamId, UserId
             LIMIT ?3",
        )
        .bind(&cursor.team_id)
        .bind(&cursor.user_id)
        .bind(MIGRATION_BATCH_SIZE)
        .fetch_all(&mut *tx)
        .await?;

        let Some(last) = rows.last() else {
            return Ok(None);
        };
        let next = MemberCursor {
            team_id: last.team_id.clone(),
            user_id: last.user_id.clone(),
        };

        for row in &rows {
            let flags = SchemeFlags {
                guest: row.scheme_guest.unwrap_or(false),
                user: row.scheme_user.unwrap_or(false),
                admin: row.scheme_admin.unwrap_or(false),
            };
            let partitioned = partition_scheme_roles(flags, row.roles.split_whitespace());

            sqlx::query(
                "UPDATE TeamMembers SET Roles = ?1, SchemeGuest = ?2, SchemeUser = ?3, SchemeAdmin = ?4
                 WHERE TeamId = ?5 AND UserId = ?6",
            )
            .bind(partitioned.explicit.join(" "))
            .bind(partitioned.flags.guest)
            .bind(partitioned.flags.user)
            .bind(partitioned.flags.admin)
            .bind(&row.team_id)
            .bind(&row.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            team_id = %next.team_id,
            user_id = %next.user_id,
            rows = rows.len(),
            "migrated team member batch"
        );
        Ok(Some((next, rows.len())))
    }

    /// Run [`migrate_team_members`](Self::migrate_team_members) from the
    /// start until no rows remain.
    ///
    /// # Errors
    ///
    /// Returns the first batch error; earlier batches stay committed.
    pub async fn migrate_all_team_members(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        let mut cursor = MemberCursor::start();
        while let Some((next, rows)) = self.migrate_batch(&cursor).await? {
            report.batches += 1;
            report.rows += rows;
            cursor = next;
        }
        info!(
            batches = report.batches,
            rows = report.rows,
            "team member migration complete"
        );
        Ok(report)
    }

    /// Strip every role that is not built in from all memberships.
    ///
    /// Returns the number of rows rewritten; rows whose roles are already
    /// built-in only are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if a statement or commit fails; batches
    /// committed before the failure stay committed.
    pub async fn clear_all_custom_role_assignments(&self) -> Result<u64> {
        let mut cursor = MemberCursor::zeros();
        let mut updated: u64 = 0;

        loop {
            let mut tx = self.db.begin().await?;
            let rows: Vec<(String, String, String)> = sqlx::query_as(
                "SELECT TeamId, UserId, Roles FROM TeamMembers
                 WHERE (TeamId, UserId) > (?1, ?2)
                 ORDER BY TeamId, UserId
                 LIMIT ?3",
            )
            .bind(&cursor.team_id)
            .bind(&cursor.user_id)
            .bind(CLEAR_ROLES_BATCH_SIZE)
            .fetch_all(&mut *tx)
            .await?;

            let Some((last_team, last_user, _)) = rows.last() else {
                break;
            };
            cursor = MemberCursor {
                team_id: last_team.clone(),
                user_id: last_user.clone(),
            };

            for (team_id, user_id, roles) in &rows {
                let kept = roles
                    .split_whitespace()
                    .filter(|role| is_built_in_role(role))
                    .collect::<Vec<_>>()
                    .join(" ");
                if kept == *roles {
                    continue;
                }
                sqlx::query("UPDATE TeamMembers SET Roles = ?1 WHERE TeamId = ?2 AND UserId = ?3")
                    .bind(&kept)
                    .bind(team_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                updated += 1;
            }

            tx.commit().await?;
            debug!(rows = rows.len(), updated, "cleared custom roles batch");
        }

        info!(updated, "custom team role assignments cleared");
        Ok(updated)
    }
}
