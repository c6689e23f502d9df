//! Team repository for `SQLite` persistence.
//!
//! Team entity operations live here; membership operations are in
//! [`members`] and the cursor-driven role sweeps in [`migration`].

use std::sync::Arc;

use sqlx::{QueryBuilder, Sqlite};

use crate::models::team::{Team, TeamForExport, TeamType};
use crate::models::now_millis;
use crate::{Result, StoreError};

use super::db::Database;
use super::dialect::{decode_error, wildcard_search_term, Dialect};

mod members;
mod migration;

pub use self::migration::{
    MemberCursor, MigrationReport, CLEAR_ROLES_BATCH_SIZE, MIGRATION_BATCH_SIZE,
};

/// Repository for team and team membership records.
#[derive(Clone)]
pub struct TeamStore {
    db: Arc<Database>,
    dialect: Dialect,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct TeamRow {
    id: String,
    create_at: i64,
    update_at: i64,
    delete_at: i64,
    display_name: String,
    name: String,
    description: String,
    email: String,
    #[sqlx(rename = "Type")]
    team_type: String,
    company_name: String,
    allowed_domains: String,
    invite_id: String,
    allow_open_invite: bool,
    last_team_icon_update: i64,
    scheme_id: Option<String>,
    group_constrained: Option<bool>,
}

impl TeamRow {
    /// Convert a database row into the domain model.
    fn into_team(self) -> Result<Team> {
        let team_type = parse_team_type(&self.team_type)?;
        Ok(Team {
            id: self.id,
            create_at: self.create_at,
            update_at: self.update_at,
            delete_at: self.delete_at,
            display_name: self.display_name,
            name: self.name,
            description: self.description,
            email: self.email,
            team_type,
            company_name: self.company_name,
            allowed_domains: self.allowed_domains,
            invite_id: self.invite_id,
            allow_open_invite: self.allow_open_invite,
            last_team_icon_update: self.last_team_icon_update,
            scheme_id: self.scheme_id,
            group_constrained: self.group_constrained,
        })
    }
}

#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct TeamExportRow {
    #[sqlx(flatten)]
    team: TeamRow,
    scheme_name: Option<String>,
}

fn parse_team_type(s: &str) -> Result<TeamType> {
    match s {
        "O" => Ok(TeamType::Open),
        "I" => Ok(TeamType::Invite),
        other => Err(decode_error(format!("invalid team type: {other}"))),
    }
}

fn into_teams(rows: Vec<TeamRow>) -> Result<Vec<Team>> {
    rows.into_iter().map(TeamRow::into_team).collect()
}

impl TeamStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>, dialect: Dialect) -> Self {
        Self { db, dialect }
    }

    /// Insert a new team.
    ///
    /// Assigns the id, invite id and creation timestamps.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the team already has an id,
    /// `StoreError::Validation` if it is invalid, and
    /// `StoreError::Conflict` if a team with the same name exists.
    pub async fn save(&self, team: &Team) -> Result<Team> {
        if !team.id.is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "cannot save an existing team: id={}",
                team.id
            )));
        }

        let mut team = team.clone();
        team.pre_save();
        team.is_valid()?;

        sqlx::query(
            "INSERT INTO Teams (Id, CreateAt, UpdateAt, DeleteAt, DisplayName, Name, Description,
             Email, Type, CompanyName, AllowedDomains, InviteId, AllowOpenInvite,
             LastTeamIconUpdate, SchemeId, GroupConstrained)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&team.id)
        .bind(team.create_at)
        .bind(team.update_at)
        .bind(team.delete_at)
        .bind(&team.display_name)
        .bind(&team.name)
        .bind(&team.description)
        .bind(&team.email)
        .bind(team.team_type.as_str())
        .bind(&team.company_name)
        .bind(&team.allowed_domains)
        .bind(&team.invite_id)
        .bind(team.allow_open_invite)
        .bind(team.last_team_icon_update)
        .bind(&team.scheme_id)
        .bind(team.group_constrained)
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            self.dialect
                .write_error(err, || format!("a team named {} already exists", team.name))
        })?;

        Ok(team)
    }

    /// Update an existing team, preserving its creation time.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the team is invalid,
    /// `StoreError::NotFound` if it does not exist, `StoreError::Conflict` if
    /// the new name is taken, and `StoreError::StaleWrite` if the update did
    /// not affect exactly one row.
    pub async fn update(&self, team: &Team) -> Result<Team> {
        let mut team = team.clone();
        team.pre_update();
        team.is_valid()?;

        let old = self.get(&team.id).await?;
        team.create_at = old.create_at;
        team.update_at = now_millis();

        let result = sqlx::query(
            "UPDATE Teams SET CreateAt = ?1, UpdateAt = ?2, DeleteAt = ?3, DisplayName = ?4,
             Name = ?5, Description = ?6, Email = ?7, Type = ?8, CompanyName = ?9,
             AllowedDomains = ?10, InviteId = ?11, AllowOpenInvite = ?12,
             LastTeamIconUpdate = ?13, SchemeId = ?14, GroupConstrained = ?15
             WHERE Id = ?16",
        )
        .bind(team.create_at)
        .bind(team.update_at)
        .bind(team.delete_at)
        .bind(&team.display_name)
        .bind(&team.name)
        .bind(&team.description)
        .bind(&team.email)
        .bind(team.team_type.as_str())
        .bind(&team.company_name)
        .bind(&team.allowed_domains)
        .bind(&team.invite_id)
        .bind(team.allow_open_invite)
        .bind(team.last_team_icon_update)
        .bind(&team.scheme_id)
        .bind(team.group_constrained)
        .bind(&team.id)
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            self.dialect
                .write_error(err, || format!("a team named {} already exists", team.name))
        })?;

        if result.rows_affected() != 1 {
            return Err(StoreError::StaleWrite(format!(
                "team update touched {} rows: id={}",
                result.rows_affected(),
                team.id
            )));
        }

        Ok(team)
    }

    /// Retrieve a team by identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the team does not exist.
    pub async fn get(&self, id: &str) -> Result<Team> {
        let row: Option<TeamRow> = sqlx::query_as("SELECT * FROM Teams WHERE Id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.ok_or_else(|| StoreError::not_found("team", id))?
            .into_team()
    }

    /// Retrieve a team by its invite id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `invite_id` is empty or unknown.
    pub async fn get_by_invite_id(&self, invite_id: &str) -> Result<Team> {
        if invite_id.is_empty() {
            return Err(StoreError::not_found("team", "invite_id="));
        }
        let row: Option<TeamRow> = sqlx::query_as("SELECT * FROM Teams WHERE InviteId = ?1")
            .bind(invite_id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.ok_or_else(|| StoreError::not_found("team", format!("invite_id={invite_id}")))?
            .into_team()
    }

    /// Retrieve a team by its unique name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no team has that name.
    pub async fn get_by_name(&self, name: &str) -> Result<Team> {
        let row: Option<TeamRow> = sqlx::query_as("SELECT * FROM Teams WHERE Name = ?1")
            .bind(name)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.ok_or_else(|| StoreError::not_found("team", format!("name={name}")))?
            .into_team()
    }

    /// Retrieve every team named in `names`.
    ///
    /// Duplicate names are looked up once.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` unless every name matched a team.
    pub async fn get_by_names(&self, names: &[String]) -> Result<Vec<Team>> {
        let mut unique: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(&name.as_str()) {
                unique.push(name);
            }
        }
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM Teams WHERE Name IN (");
        let mut list = qb.separated(", ");
        for name in &unique {
            list.push_bind((*name).to_owned());
        }
        list.push_unseparated(")");

        let rows: Vec<TeamRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        if rows.len() != unique.len() {
            return Err(StoreError::not_found("team", format!("names={}", unique.join(","))));
        }
        into_teams(rows)
    }

    fn search_predicate(&self) -> String {
        format!(
            "({} OR {})",
            self.dialect.match_clause("Name"),
            self.dialect.match_clause("DisplayName")
        )
    }

    async fn search_where(&self, filter: &str, term: &str) -> Result<Vec<Team>> {
        let term = wildcard_search_term(term);
        let sql = format!("SELECT * FROM Teams WHERE {filter}{}", self.search_predicate());
        let rows: Vec<TeamRow> = sqlx::query_as(&sql)
            .bind(&term)
            .bind(&term)
            .fetch_all(self.db.as_ref())
            .await?;
        into_teams(rows)
    }

    /// Teams whose name or display name contains `term`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn search_all(&self, term: &str) -> Result<Vec<Team>> {
        self.search_where("", term).await
    }

    /// One page of [`search_all`](Self::search_all) results plus the total
    /// number of matches.
    ///
    /// The total is computed by a separate statement.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if either query fails.
    pub async fn search_all_paged(
        &self,
        term: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Team>, i64)> {
        let term = wildcard_search_term(term);
        let predicate = self.search_predicate();

        let sql = format!(
            "SELECT * FROM Teams WHERE {predicate} ORDER BY DisplayName, Name LIMIT ? OFFSET ?"
        );
        let rows: Vec<TeamRow> = sqlx::query_as(&sql)
            .bind(&term)
            .bind(&term)
            .bind(per_page)
            .bind(page.saturating_mul(per_page))
            .fetch_all(self.db.as_ref())
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM Teams WHERE {predicate}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&term)
            .bind(&term)
            .fetch_one(self.db.as_ref())
            .await?;

        Ok((into_teams(rows)?, total))
    }

    /// Open, discoverable teams matching `term`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn search_open(&self, term: &str) -> Result<Vec<Team>> {
        let filter = format!(
            "Type = 'O' AND AllowOpenInvite = {} AND ",
            self.dialect.bool_literal(true)
        );
        self.search_where(&filter, term).await
    }

    /// Private or invite-only teams matching `term`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn search_private(&self, term: &str) -> Result<Vec<Team>> {
        let filter = format!(
            "(Type != 'O' OR AllowOpenInvite = {}) AND ",
            self.dialect.bool_literal(false)
        );
        self.search_where(&filter, term).await
    }

    /// Every team ordered by display name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all(&self) -> Result<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as("SELECT * FROM Teams ORDER BY DisplayName")
            .fetch_all(self.db.as_ref())
            .await?;
        into_teams(rows)
    }

    /// A page of teams ordered by display name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_page(&self, offset: i64, limit: i64) -> Result<Vec<Team>> {
        let rows: Vec<TeamRow> =
            sqlx::query_as("SELECT * FROM Teams ORDER BY DisplayName LIMIT ?1 OFFSET ?2")
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.as_ref())
                .await?;
        into_teams(rows)
    }

    /// Active teams the user is an active member of.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_teams_by_user_id(&self, user_id: &str) -> Result<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            "SELECT Teams.* FROM Teams
             JOIN TeamMembers ON TeamMembers.TeamId = Teams.Id
             WHERE TeamMembers.UserId = ?1 AND TeamMembers.DeleteAt = 0 AND Teams.DeleteAt = 0",
        )
        .bind(user_id)
        .fetch_all(self.db.as_ref())
        .await?;
        into_teams(rows)
    }

    async fn listing(&self, open_invite: bool, page: Option<(i64, i64)>) -> Result<Vec<Team>> {
        let mut sql = format!(
            "SELECT * FROM Teams WHERE AllowOpenInvite = {} ORDER BY DisplayName",
            self.dialect.bool_literal(open_invite)
        );
        let rows: Vec<TeamRow> = if let Some((offset, limit)) = page {
            sql.push_str(" LIMIT ?1 OFFSET ?2");
            sqlx::query_as(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.as_ref())
                .await?
        } else {
            sqlx::query_as(&sql).fetch_all(self.db.as_ref()).await?
        };
        into_teams(rows)
    }

    /// Every team that allows open invites.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_team_listing(&self) -> Result<Vec<Team>> {
        self.listing(true, None).await
    }

    /// A page of teams that allow open invites.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_team_page_listing(&self, offset: i64, limit: i64) -> Result<Vec<Team>> {
        self.listing(true, Some((offset, limit))).await
    }

    /// Every team that does not allow open invites.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_private_team_listing(&self) -> Result<Vec<Team>> {
        self.listing(false, None).await
    }

    /// A page of public teams.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_public_team_page_listing(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Team>> {
        self.listing(true, Some((offset, limit))).await
    }

    /// A page of private teams.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_private_team_page_listing(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Team>> {
        self.listing(false, Some((offset, limit))).await
    }

    /// Remove a team row. Soft deletion is an [`update`](Self::update) with
    /// `delete_at` set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn permanent_delete(&self, team_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM Teams WHERE Id = ?1")
            .bind(team_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(sql).fetch_one(self.db.as_ref()).await?;
        Ok(count)
    }

    /// Number of active teams that allow open invites.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn analytics_public_team_count(&self) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM Teams WHERE DeleteAt = 0 AND AllowOpenInvite = {}",
            self.dialect.bool_literal(true)
        );
        self.count(&sql).await
    }

    /// Number of active teams that do not allow open invites.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn analytics_private_team_count(&self) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM Teams WHERE DeleteAt = 0 AND AllowOpenInvite = {}",
            self.dialect.bool_literal(false)
        );
        self.count(&sql).await
    }

    /// Number of teams, optionally including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn analytics_team_count(&self, include_deleted: bool) -> Result<i64> {
        if include_deleted {
            self.count("SELECT COUNT(*) FROM Teams").await
        } else {
            self.count("SELECT COUNT(*) FROM Teams WHERE DeleteAt = 0").await
        }
    }

    /// Number of active teams using `scheme_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn analytics_get_team_count_for_scheme(&self, scheme_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM Teams WHERE SchemeId = ?1 AND DeleteAt = 0")
                .bind(scheme_id)
                .fetch_one(self.db.as_ref())
                .await?;
        Ok(count)
    }

    /// Number of active group-constrained teams.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn group_synced_team_count(&self) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM Teams WHERE GroupConstrained = {} AND DeleteAt = 0",
            self.dialect.bool_literal(true)
        );
        self.count(&sql).await
    }

    /// Record a new team icon; also bumps `UpdateAt`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn update_last_team_icon_update(&self, team_id: &str, cur_time: i64) -> Result<()> {
        sqlx::query("UPDATE Teams SET LastTeamIconUpdate = ?1, UpdateAt = ?1 WHERE Id = ?2")
            .bind(cur_time)
            .bind(team_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// A page of teams using `scheme_id`, ordered by display name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_teams_by_scheme(
        &self,
        scheme_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            "SELECT * FROM Teams WHERE SchemeId = ?1 ORDER BY DisplayName LIMIT ?2 OFFSET ?3",
        )
        .bind(scheme_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.as_ref())
        .await?;
        into_teams(rows)
    }

    /// Detach every team from its scheme.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn reset_all_team_schemes(&self) -> Result<()> {
        sqlx::query("UPDATE Teams SET SchemeId = ''")
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Up to `limit` teams with an id greater than `after_id`, in id order,
    /// each with its scheme name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_for_export_after(
        &self,
        limit: i64,
        after_id: &str,
    ) -> Result<Vec<TeamForExport>> {
        let rows: Vec<TeamExportRow> = sqlx::query_as(
            "SELECT Teams.*, Schemes.Name AS SchemeName
             FROM Teams
             LEFT JOIN Schemes ON Teams.SchemeId = Schemes.Id
             WHERE Teams.Id > ?1
             ORDER BY Teams.Id
             LIMIT ?2",
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TeamForExport {
                    team: row.team.into_team()?,
                    scheme_name: row.scheme_name,
                })
            })
            .collect()
    }
}
