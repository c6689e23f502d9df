//! Team membership operations.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, warn};

use crate::models::channel::ChannelUnread;
use crate::models::team_member::{
    TeamMember, TeamMemberForExport, TeamMemberSort, TeamMembersGetOptions,
    ViewUsersRestrictions,
};
use crate::persistence::dialect::decode_error;
use crate::roles::{partition_scheme_roles, resolve_team_roles, SchemeDefaults, SchemeFlags};
use crate::{Result, StoreError};

use super::TeamStore;

/// Membership columns plus the team scheme's default roles.
const MEMBER_COLUMNS: &str = "TeamMembers.TeamId AS TeamId, TeamMembers.UserId AS UserId, \
     TeamMembers.Roles AS Roles, TeamMembers.DeleteAt AS DeleteAt, \
     TeamMembers.SchemeGuest AS SchemeGuest, TeamMembers.SchemeUser AS SchemeUser, \
     TeamMembers.SchemeAdmin AS SchemeAdmin, \
     TeamScheme.DefaultTeamGuestRole AS DefaultGuestRole, \
     TeamScheme.DefaultTeamUserRole AS DefaultUserRole, \
     TeamScheme.DefaultTeamAdminRole AS DefaultAdminRole";

const MEMBER_FROM: &str = "FROM TeamMembers \
     LEFT JOIN Teams ON TeamMembers.TeamId = Teams.Id \
     LEFT JOIN Schemes TeamScheme ON Teams.SchemeId = TeamScheme.Id";

/// Joined membership row as read from storage.
#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct TeamMemberRow {
    team_id: String,
    user_id: String,
    roles: String,
    delete_at: i64,
    scheme_guest: Option<bool>,
    scheme_user: Option<bool>,
    scheme_admin: Option<bool>,
    default_guest_role: Option<String>,
    default_user_role: Option<String>,
    default_admin_role: Option<String>,
}

impl TeamMemberRow {
    /// Resolve the stored columns into a domain membership.
    fn into_member(self) -> TeamMember {
        let flags = SchemeFlags {
            guest: self.scheme_guest.unwrap_or(false),
            user: self.scheme_user.unwrap_or(false),
            admin: self.scheme_admin.unwrap_or(false),
        };
        let defaults = SchemeDefaults::from_columns(
            self.default_guest_role,
            self.default_user_role,
            self.default_admin_role,
        );
        let resolved = resolve_team_roles(flags, &defaults, self.roles.split_whitespace());

        TeamMember {
            team_id: self.team_id,
            user_id: self.user_id,
            roles: resolved.roles_string(),
            delete_at: self.delete_at,
            scheme_guest: resolved.flags.guest,
            scheme_user: resolved.flags.user,
            scheme_admin: resolved.flags.admin,
            explicit_roles: resolved.explicit_roles_string(),
        }
    }
}

fn into_members(rows: Vec<TeamMemberRow>) -> Vec<TeamMember> {
    rows.into_iter().map(TeamMemberRow::into_member).collect()
}

#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct SchemeDefaultsRow {
    team_id: String,
    default_guest_role: Option<String>,
    default_user_role: Option<String>,
    default_admin_role: Option<String>,
}

#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct MemberExportRow {
    team_id: String,
    user_id: String,
    roles: String,
    delete_at: i64,
    scheme_guest: bool,
    scheme_user: Option<bool>,
    scheme_admin: Option<bool>,
    team_name: String,
}

#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct ChannelUnreadRow {
    team_id: String,
    channel_id: String,
    msg_count: i64,
    mention_count: i64,
    notify_props: String,
}

impl ChannelUnreadRow {
    fn into_unread(self) -> Result<ChannelUnread> {
        let notify_props = if self.notify_props.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&self.notify_props).map_err(|err| {
                decode_error(format!(
                    "invalid notify props for channel {}: {err}",
                    self.channel_id
                ))
            })?
        };
        Ok(ChannelUnread {
            team_id: self.team_id,
            channel_id: self.channel_id,
            msg_count: self.msg_count,
            mention_count: self.mention_count,
            notify_props,
        })
    }
}

/// Visibility filter applied to membership queries.
enum RestrictionFilter<'r> {
    Unrestricted,
    DenyAll,
    Join {
        teams: Option<&'r [String]>,
        channels: Option<&'r [String]>,
    },
}

impl<'r> RestrictionFilter<'r> {
    fn new(restrictions: Option<&'r ViewUsersRestrictions>) -> Self {
        match restrictions {
            None => Self::Unrestricted,
            Some(r) if r.denies_all() => Self::DenyAll,
            Some(r) => Self::Join {
                teams: r.allowed_teams(),
                channels: r.allowed_channels(),
            },
        }
    }

    fn is_distinct(&self) -> bool {
        matches!(self, Self::Join { .. })
    }

    /// Joins for listing queries; the visible user is aliased `ru`.
    fn push_member_joins(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if self.is_distinct() {
            qb.push(" JOIN Users ru ON (TeamMembers.UserId = ru.Id)");
            self.push_membership_joins(qb, "ru.Id");
        }
    }

    /// Joins for count queries, which already join `Users`.
    fn push_stats_joins(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        self.push_membership_joins(qb, "Users.Id");
    }

    fn push_membership_joins(&self, qb: &mut QueryBuilder<'_, Sqlite>, user_ref: &str) {
        let Self::Join { teams, channels } = self else {
            return;
        };
        if let Some(teams) = teams {
            qb.push(format!(
                " JOIN TeamMembers rtm ON (rtm.UserId = {user_ref} AND rtm.DeleteAt = 0 AND rtm.TeamId IN ("
            ));
            let mut list = qb.separated(", ");
            for team_id in *teams {
                list.push_bind(team_id.clone());
            }
            list.push_unseparated("))");
        }
        if let Some(channels) = channels {
            qb.push(format!(
                " JOIN ChannelMembers rcm ON (rcm.UserId = {user_ref} AND rcm.ChannelId IN ("
            ));
            let mut list = qb.separated(", ");
            for channel_id in *channels {
                list.push_bind(channel_id.clone());
            }
            list.push_unseparated("))");
        }
    }

    fn push_predicate(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if matches!(self, Self::DenyAll) {
            qb.push(" AND 1 = 0");
        }
    }
}

fn member_select(distinct: bool) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT ");
    if distinct {
        qb.push("DISTINCT ");
    }
    qb.push(MEMBER_COLUMNS).push(" ").push(MEMBER_FROM);
    qb
}

fn push_in_list(qb: &mut QueryBuilder<'_, Sqlite>, values: &[&str]) {
    qb.push(" IN (");
    let mut list = qb.separated(", ");
    for value in values {
        list.push_bind((*value).to_owned());
    }
    list.push_unseparated(")");
}

/// Scheme default roles of each listed team, keyed by team id.
///
/// Teams without a scheme map to empty defaults; unknown teams are absent.
async fn scheme_defaults_by_team(
    conn: &mut SqliteConnection,
    team_ids: &[&str],
) -> Result<HashMap<String, SchemeDefaults>> {
    if team_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT Teams.Id AS TeamId, \
         TeamScheme.DefaultTeamGuestRole AS DefaultGuestRole, \
         TeamScheme.DefaultTeamUserRole AS DefaultUserRole, \
         TeamScheme.DefaultTeamAdminRole AS DefaultAdminRole \
         FROM Teams LEFT JOIN Schemes TeamScheme ON Teams.SchemeId = TeamScheme.Id \
         WHERE Teams.Id",
    );
    push_in_list(&mut qb, team_ids);

    let rows: Vec<SchemeDefaultsRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let defaults = SchemeDefaults::from_columns(
                row.default_guest_role,
                row.default_user_role,
                row.default_admin_role,
            );
            (row.team_id, defaults)
        })
        .collect())
}

/// Active memberships (membership and user both not deleted) per team.
async fn active_member_counts(
    conn: &mut SqliteConnection,
    team_ids: &[&str],
) -> Result<HashMap<String, i64>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT TeamMembers.TeamId, COUNT(*) FROM TeamMembers \
         JOIN Users ON TeamMembers.UserId = Users.Id \
         WHERE TeamMembers.DeleteAt = 0 AND Users.DeleteAt = 0 AND TeamMembers.TeamId",
    );
    push_in_list(&mut qb, team_ids);
    qb.push(" GROUP BY TeamMembers.TeamId");

    let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&mut *conn).await?;
    Ok(rows.into_iter().collect())
}

fn resolve_member(member: &TeamMember, defaults: Option<&SchemeDefaults>) -> TeamMember {
    let none = SchemeDefaults::default();
    let resolved = resolve_team_roles(
        member.scheme_flags(),
        defaults.unwrap_or(&none),
        member.explicit_roles.split_whitespace(),
    );
    member.with_resolved_roles(&resolved)
}

impl TeamStore {
    /// Insert a batch of memberships in one statement.
    ///
    /// Every member is validated before any statement runs. Unless
    /// `max_users_per_team` is negative, the batch is rejected when any team
    /// would end up with more active members than the limit. Legacy scheme
    /// role ids in `explicit_roles` are moved into the scheme flags before the
    /// row is written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an invalid member,
    /// `StoreError::LimitExceeded` when a team is full, and
    /// `StoreError::Conflict` if any membership already exists.
    pub async fn save_multiple_members(
        &self,
        members: &[TeamMember],
        max_users_per_team: i64,
    ) -> Result<Vec<TeamMember>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut new_per_team: HashMap<&str, i64> = HashMap::new();
        for member in members {
            member.is_valid()?;
            *new_per_team.entry(member.team_id.as_str()).or_default() += 1;
        }
        let team_ids: Vec<&str> = new_per_team.keys().copied().collect();

        let mut tx = self.db.begin().await?;
        let defaults = scheme_defaults_by_team(&mut tx, &team_ids).await?;

        if max_users_per_team >= 0 {
            let counts = active_member_counts(&mut tx, &team_ids).await?;
            for (team_id, added) in &new_per_team {
                let existing = counts.get(*team_id).copied().unwrap_or(0);
                if existing + added > max_users_per_team {
                    warn!(
                        team_id,
                        existing,
                        added,
                        max_users_per_team,
                        "team member limit reached"
                    );
                    return Err(StoreError::LimitExceeded(format!(
                        "team {team_id} has {existing} active members, cannot add {added} (max {max_users_per_team})"
                    )));
                }
            }
        }

        let resolved: Vec<TeamMember> = members
            .iter()
            .map(|member| resolve_member(member, defaults.get(&member.team_id)))
            .collect();

        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO TeamMembers (TeamId, UserId, Roles, DeleteAt, SchemeGuest, SchemeUser, SchemeAdmin) ",
        );
        qb.push_values(&resolved, |mut row, member| {
            row.push_bind(member.team_id.clone())
                .push_bind(member.user_id.clone())
                .push_bind(member.explicit_roles.clone())
                .push_bind(member.delete_at)
                .push_bind(member.scheme_guest)
                .push_bind(member.scheme_user)
                .push_bind(member.scheme_admin);
        });
        qb.build().execute(&mut *tx).await.map_err(|err| {
            self.dialect
                .write_error(err, || "team membership already exists".to_owned())
        })?;
        tx.commit().await?;

        debug!(count = resolved.len(), "saved team members");
        Ok(resolved)
    }

    /// Insert a single membership.
    ///
    /// # Errors
    ///
    /// See [`save_multiple_members`](Self::save_multiple_members).
    pub async fn save_member(
        &self,
        member: &TeamMember,
        max_users_per_team: i64,
    ) -> Result<TeamMember> {
        let mut saved = self
            .save_multiple_members(std::slice::from_ref(member), max_users_per_team)
            .await?;
        saved
            .pop()
            .ok_or_else(|| StoreError::not_found("team_member", &member.user_id))
    }

    /// Write each membership with its own statement, then resolve roles for
    /// the whole set with one scheme lookup.
    ///
    /// A member with no matching row is written as a no-op. Every member is
    /// validated before the first statement runs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an invalid member and
    /// `StoreError::Db` if a statement fails.
    pub async fn update_multiple_members(&self, members: &[TeamMember]) -> Result<Vec<TeamMember>> {
        for member in members {
            member.is_valid()?;
        }

        for member in members {
            let partitioned =
                partition_scheme_roles(member.scheme_flags(), member.explicit_roles.split_whitespace());

            sqlx::query(
                "UPDATE TeamMembers SET Roles = ?1, DeleteAt = ?2, SchemeGuest = ?3,
                 SchemeUser = ?4, SchemeAdmin = ?5
                 WHERE TeamId = ?6 AND UserId = ?7",
            )
            .bind(partitioned.explicit.join(" "))
            .bind(member.delete_at)
            .bind(partitioned.flags.guest)
            .bind(partitioned.flags.user)
            .bind(partitioned.flags.admin)
            .bind(&member.team_id)
            .bind(&member.user_id)
            .execute(self.db.as_ref())
            .await?;
        }

        let mut team_ids: Vec<&str> = members.iter().map(|m| m.team_id.as_str()).collect();
        team_ids.sort_unstable();
        team_ids.dedup();

        let mut conn = self.db.acquire().await?;
        let defaults = scheme_defaults_by_team(&mut conn, &team_ids).await?;

        Ok(members
            .iter()
            .map(|member| resolve_member(member, defaults.get(&member.team_id)))
            .collect())
    }

    /// Update a single membership.
    ///
    /// # Errors
    ///
    /// See [`update_multiple_members`](Self::update_multiple_members).
    pub async fn update_member(&self, member: &TeamMember) -> Result<TeamMember> {
        let mut updated = self
            .update_multiple_members(std::slice::from_ref(member))
            .await?;
        updated
            .pop()
            .ok_or_else(|| StoreError::not_found("team_member", &member.user_id))
    }

    /// Retrieve one membership, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user never joined the team.
    pub async fn get_member(&self, team_id: &str, user_id: &str) -> Result<TeamMember> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} {MEMBER_FROM}
             WHERE TeamMembers.TeamId = ?1 AND TeamMembers.UserId = ?2"
        );
        let row: Option<TeamMemberRow> = sqlx::query_as(&sql)
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.map(TeamMemberRow::into_member).ok_or_else(|| {
            StoreError::not_found("team_member", format!("team_id={team_id} user_id={user_id}"))
        })
    }

    /// A page of the team's active memberships.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_members(
        &self,
        team_id: &str,
        offset: i64,
        limit: i64,
        options: &TeamMembersGetOptions,
    ) -> Result<Vec<TeamMember>> {
        let filter = RestrictionFilter::new(options.view_restrictions.as_ref());
        let mut qb = member_select(filter.is_distinct());

        if options.sort == TeamMemberSort::Username || options.exclude_deleted_users {
            qb.push(" LEFT JOIN Users ON TeamMembers.UserId = Users.Id");
        }
        filter.push_member_joins(&mut qb);

        qb.push(" WHERE TeamMembers.TeamId = ")
            .push_bind(team_id.to_owned())
            .push(" AND TeamMembers.DeleteAt = 0");
        if options.exclude_deleted_users {
            qb.push(" AND Users.DeleteAt = 0");
        }
        filter.push_predicate(&mut qb);

        qb.push(match options.sort {
            TeamMemberSort::UserId => " ORDER BY TeamMembers.UserId",
            TeamMemberSort::Username => " ORDER BY Users.Username",
        });
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<TeamMemberRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        Ok(into_members(rows))
    }

    /// Active memberships of the listed users in the team.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if `user_ids` is empty.
    pub async fn get_members_by_ids(
        &self,
        team_id: &str,
        user_ids: &[String],
        restrictions: Option<&ViewUsersRestrictions>,
    ) -> Result<Vec<TeamMember>> {
        if user_ids.is_empty() {
            return Err(StoreError::InvalidInput(
                "get_members_by_ids requires at least one user id".into(),
            ));
        }

        let filter = RestrictionFilter::new(restrictions);
        let mut qb = member_select(filter.is_distinct());
        filter.push_member_joins(&mut qb);

        qb.push(" WHERE TeamMembers.TeamId = ")
            .push_bind(team_id.to_owned())
            .push(" AND TeamMembers.DeleteAt = 0 AND TeamMembers.UserId");
        let ids: Vec<&str> = user_ids.iter().map(String::as_str).collect();
        push_in_list(&mut qb, &ids);
        filter.push_predicate(&mut qb);

        let rows: Vec<TeamMemberRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        Ok(into_members(rows))
    }

    /// Every membership of the user, including deleted ones.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_teams_for_user(&self, user_id: &str) -> Result<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} {MEMBER_FROM}
             WHERE TeamMembers.UserId = ?1 ORDER BY TeamMembers.TeamId"
        );
        let rows: Vec<TeamMemberRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(self.db.as_ref())
            .await?;
        Ok(into_members(rows))
    }

    /// One page of [`get_teams_for_user`](Self::get_teams_for_user).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_teams_for_user_with_pagination(
        &self,
        user_id: &str,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} {MEMBER_FROM}
             WHERE TeamMembers.UserId = ?1 ORDER BY TeamMembers.TeamId LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<TeamMemberRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(per_page)
            .bind(page.saturating_mul(per_page))
            .fetch_all(self.db.as_ref())
            .await?;
        Ok(into_members(rows))
    }

    async fn member_count(
        &self,
        team_id: &str,
        restrictions: Option<&ViewUsersRestrictions>,
        active_users_only: bool,
    ) -> Result<i64> {
        let filter = RestrictionFilter::new(restrictions);
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(DISTINCT TeamMembers.UserId) FROM TeamMembers \
             JOIN Users ON TeamMembers.UserId = Users.Id",
        );
        filter.push_stats_joins(&mut qb);
        qb.push(" WHERE TeamMembers.DeleteAt = 0 AND TeamMembers.TeamId = ")
            .push_bind(team_id.to_owned());
        if active_users_only {
            qb.push(" AND Users.DeleteAt = 0");
        }
        filter.push_predicate(&mut qb);

        let count: i64 = qb.build_query_scalar().fetch_one(self.db.as_ref()).await?;
        Ok(count)
    }

    /// Distinct users with an active membership of the team.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_total_member_count(
        &self,
        team_id: &str,
        restrictions: Option<&ViewUsersRestrictions>,
    ) -> Result<i64> {
        self.member_count(team_id, restrictions, false).await
    }

    /// Like [`get_total_member_count`](Self::get_total_member_count), but
    /// skips deleted users.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_active_member_count(
        &self,
        team_id: &str,
        restrictions: Option<&ViewUsersRestrictions>,
    ) -> Result<i64> {
        self.member_count(team_id, restrictions, true).await
    }

    /// Delete the listed users' memberships of the team.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn remove_members(&self, team_id: &str, user_ids: &[String]) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM TeamMembers WHERE TeamId = ");
        qb.push_bind(team_id.to_owned()).push(" AND UserId");
        let ids: Vec<&str> = user_ids.iter().map(String::as_str).collect();
        push_in_list(&mut qb, &ids);
        qb.build().execute(self.db.as_ref()).await?;
        Ok(())
    }

    /// Delete one membership.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn remove_member(&self, team_id: &str, user_id: &str) -> Result<()> {
        self.remove_members(team_id, &[user_id.to_owned()]).await
    }

    /// Delete every membership of the team.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn remove_all_members_by_team(&self, team_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM TeamMembers WHERE TeamId = ?1")
            .bind(team_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Delete every membership of the user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn remove_all_members_by_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM TeamMembers WHERE UserId = ?1")
            .bind(user_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Ids of active teams the user actively belongs to.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_user_team_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT TeamMembers.TeamId FROM TeamMembers
             JOIN Teams ON TeamMembers.TeamId = Teams.Id
             WHERE TeamMembers.UserId = ?1 AND TeamMembers.DeleteAt = 0 AND Teams.DeleteAt = 0",
        )
        .bind(user_id)
        .fetch_all(self.db.as_ref())
        .await?;
        Ok(ids)
    }

    /// Whether the user has an active membership of any listed team.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn user_belongs_to_teams(&self, user_id: &str, team_ids: &[String]) -> Result<bool> {
        if team_ids.is_empty() {
            return Ok(false);
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM TeamMembers WHERE UserId = ");
        qb.push_bind(user_id.to_owned())
            .push(" AND DeleteAt = 0 AND TeamId");
        let ids: Vec<&str> = team_ids.iter().map(String::as_str).collect();
        push_in_list(&mut qb, &ids);

        let count: i64 = qb.build_query_scalar().fetch_one(self.db.as_ref()).await?;
        Ok(count > 0)
    }

    /// The user's memberships of active teams, shaped for export.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_team_members_for_export(
        &self,
        user_id: &str,
    ) -> Result<Vec<TeamMemberForExport>> {
        let rows: Vec<MemberExportRow> = sqlx::query_as(
            "SELECT TeamMembers.TeamId AS TeamId, TeamMembers.UserId AS UserId,
                    TeamMembers.Roles AS Roles, TeamMembers.DeleteAt AS DeleteAt,
                    (TeamMembers.SchemeGuest IS NOT NULL AND TeamMembers.SchemeGuest) AS SchemeGuest,
                    TeamMembers.SchemeUser AS SchemeUser, TeamMembers.SchemeAdmin AS SchemeAdmin,
                    Teams.Name AS TeamName
             FROM TeamMembers
             JOIN Teams ON TeamMembers.TeamId = Teams.Id
             WHERE TeamMembers.UserId = ?1 AND Teams.DeleteAt = 0",
        )
        .bind(user_id)
        .fetch_all(self.db.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TeamMemberForExport {
                team_id: row.team_id,
                user_id: row.user_id,
                roles: row.roles,
                delete_at: row.delete_at,
                scheme_guest: row.scheme_guest,
                scheme_user: row.scheme_user,
                scheme_admin: row.scheme_admin,
                team_name: row.team_name,
            })
            .collect())
    }

    /// Make exactly the listed users scheme admins of the team.
    ///
    /// Every other active, non-guest member loses the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn update_members_role(&self, team_id: &str, admin_user_ids: &[String]) -> Result<()> {
        let yes = self.dialect.bool_literal(true);
        let no = self.dialect.bool_literal(false);

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE TeamMembers SET SchemeAdmin = ");
        if admin_user_ids.is_empty() {
            qb.push(no);
        } else {
            qb.push("CASE WHEN UserId");
            let ids: Vec<&str> = admin_user_ids.iter().map(String::as_str).collect();
            push_in_list(&mut qb, &ids);
            qb.push(format!(" THEN {yes} ELSE {no} END"));
        }
        qb.push(" WHERE TeamId = ")
            .push_bind(team_id.to_owned())
            .push(format!(
                " AND (SchemeGuest = {no} OR SchemeGuest IS NULL) AND DeleteAt = 0"
            ));

        let result = qb.build().execute(self.db.as_ref()).await?;
        debug!(team_id, rows = result.rows_affected(), "updated team admin roles");
        Ok(())
    }

    async fn channel_unreads(
        &self,
        team_clause: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<Vec<ChannelUnread>> {
        let sql = format!(
            "SELECT Channels.TeamId AS TeamId, Channels.Id AS ChannelId,
                    (Channels.TotalMsgCount - ChannelMembers.MsgCount) AS MsgCount,
                    ChannelMembers.MentionCount AS MentionCount,
                    ChannelMembers.NotifyProps AS NotifyProps
             FROM Channels
             JOIN ChannelMembers ON Channels.Id = ChannelMembers.ChannelId
             WHERE ChannelMembers.UserId = ?1 AND Channels.DeleteAt = 0 AND Channels.TeamId {team_clause} ?2"
        );
        let rows: Vec<ChannelUnreadRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(team_id)
            .fetch_all(self.db.as_ref())
            .await?;
        rows.into_iter().map(ChannelUnreadRow::into_unread).collect()
    }

    /// Unread counters for the user's channels outside `exclude_team_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails or notify props do not
    /// decode.
    pub async fn get_channel_unreads_for_all_teams(
        &self,
        exclude_team_id: &str,
        user_id: &str,
    ) -> Result<Vec<ChannelUnread>> {
        self.channel_unreads("!=", exclude_team_id, user_id).await
    }

    /// Unread counters for the user's channels in `team_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails or notify props do not
    /// decode.
    pub async fn get_channel_unreads_for_team(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Vec<ChannelUnread>> {
        self.channel_unreads("=", team_id, user_id).await
    }
}
