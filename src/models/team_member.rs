//! Team membership model and listing options.

use serde::{Deserialize, Serialize};

use crate::roles::{ResolvedRoles, SchemeFlags};
use crate::{Result, StoreError};

use super::{char_len, is_valid_id};

/// Maximum length of the stored explicit roles column.
pub const TEAM_MEMBER_ROLES_MAX_LENGTH: usize = 64;

/// A user's membership of a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TeamMember {
    /// Team identifier.
    pub team_id: String,
    /// User identifier.
    pub user_id: String,
    /// Effective roles: explicit roles plus scheme-implied roles.
    pub roles: String,
    /// Soft-delete time (ms); zero while active.
    pub delete_at: i64,
    /// Member holds the scheme guest role.
    pub scheme_guest: bool,
    /// Member holds the scheme user role.
    pub scheme_user: bool,
    /// Member holds the scheme admin role.
    pub scheme_admin: bool,
    /// Roles assigned directly rather than through the scheme.
    pub explicit_roles: String,
}

impl TeamMember {
    /// Construct an active membership with the scheme user role.
    #[must_use]
    pub fn new(team_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            user_id: user_id.into(),
            scheme_user: true,
            ..Self::default()
        }
    }

    /// Scheme flags carried by this membership.
    #[must_use]
    pub fn scheme_flags(&self) -> SchemeFlags {
        SchemeFlags {
            guest: self.scheme_guest,
            user: self.scheme_user,
            admin: self.scheme_admin,
        }
    }

    /// Copy of this membership with roles and flags replaced by `resolved`.
    #[must_use]
    pub fn with_resolved_roles(&self, resolved: &ResolvedRoles) -> Self {
        Self {
            team_id: self.team_id.clone(),
            user_id: self.user_id.clone(),
            roles: resolved.roles_string(),
            delete_at: self.delete_at,
            scheme_guest: resolved.flags.guest,
            scheme_user: resolved.flags.user,
            scheme_admin: resolved.flags.admin,
            explicit_roles: resolved.explicit_roles_string(),
        }
    }

    /// Validate the membership before any statement is issued.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` naming the first invalid field.
    pub fn is_valid(&self) -> Result<()> {
        if !is_valid_id(&self.team_id) {
            return Err(StoreError::Validation(format!(
                "team member team_id is invalid: {}",
                self.team_id
            )));
        }
        if !is_valid_id(&self.user_id) {
            return Err(StoreError::Validation(format!(
                "team member user_id is invalid: {}",
                self.user_id
            )));
        }
        if char_len(&self.explicit_roles) > TEAM_MEMBER_ROLES_MAX_LENGTH {
            return Err(StoreError::Validation(format!(
                "team member roles too long (team_id={}, user_id={})",
                self.team_id, self.user_id
            )));
        }
        Ok(())
    }
}

/// Membership row shaped for bulk export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TeamMemberForExport {
    /// Team identifier.
    pub team_id: String,
    /// User identifier.
    pub user_id: String,
    /// Stored roles column.
    pub roles: String,
    /// Soft-delete time (ms).
    pub delete_at: i64,
    /// Scheme guest flag; absent flags export as false.
    pub scheme_guest: bool,
    /// Scheme user flag.
    pub scheme_user: Option<bool>,
    /// Scheme admin flag.
    pub scheme_admin: Option<bool>,
    /// URL name of the team.
    pub team_name: String,
}

/// Which users a caller may see.
///
/// `None` lists are unrestricted; `Some` lists name the teams or channels a
/// visible user must belong to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ViewUsersRestrictions {
    /// Teams whose members are visible.
    pub teams: Option<Vec<String>>,
    /// Channels whose members are visible.
    pub channels: Option<Vec<String>>,
}

impl ViewUsersRestrictions {
    /// Whether the caller can see nobody at all.
    #[must_use]
    pub fn denies_all(&self) -> bool {
        matches!((&self.teams, &self.channels), (Some(t), Some(c)) if t.is_empty() && c.is_empty())
    }

    /// Allowed teams, when the list is present and non-empty.
    #[must_use]
    pub fn allowed_teams(&self) -> Option<&[String]> {
        self.teams.as_deref().filter(|t| !t.is_empty())
    }

    /// Allowed channels, when the list is present and non-empty.
    #[must_use]
    pub fn allowed_channels(&self) -> Option<&[String]> {
        self.channels.as_deref().filter(|c| !c.is_empty())
    }
}

/// Ordering for membership listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamMemberSort {
    /// Order by user id.
    #[default]
    UserId,
    /// Order by username; requires a join to the users table.
    Username,
}

/// Options for [`TeamStore::get_members`](crate::persistence::team_store::TeamStore::get_members).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TeamMembersGetOptions {
    /// Result ordering.
    pub sort: TeamMemberSort,
    /// Skip memberships of soft-deleted users.
    pub exclude_deleted_users: bool,
    /// Visibility restrictions of the caller.
    pub view_restrictions: Option<ViewUsersRestrictions>,
}
