//! Team role identifiers and scheme role resolution.
//!
//! A membership carries its scheme-derived roles as three booleans and any
//! other roles as a space-separated token list. Rows written before the
//! scheme migration may still hold the scheme role ids inside the token
//! list; [`resolve_team_roles`] reconciles both shapes on every read and
//! write.

/// Well-known id of the team guest role.
pub const TEAM_GUEST_ROLE_ID: &str = "team_guest";
/// Well-known id of the team user role.
pub const TEAM_USER_ROLE_ID: &str = "team_user";
/// Well-known id of the team admin role.
pub const TEAM_ADMIN_ROLE_ID: &str = "team_admin";

/// Names of every role shipped with the product.
///
/// Role tokens outside this set are custom assignments.
pub const BUILT_IN_ROLES: &[&str] = &[
    "channel_guest",
    "channel_user",
    "channel_admin",
    TEAM_GUEST_ROLE_ID,
    TEAM_USER_ROLE_ID,
    TEAM_ADMIN_ROLE_ID,
    "team_post_all",
    "team_post_all_public",
    "system_guest",
    "system_user",
    "system_post_all",
    "system_post_all_public",
    "system_user_access_token",
    "system_user_manager",
    "system_read_only_admin",
    "system_manager",
    "system_admin",
];

/// Whether `role` is one of [`BUILT_IN_ROLES`].
#[must_use]
pub fn is_built_in_role(role: &str) -> bool {
    BUILT_IN_ROLES.contains(&role)
}

/// The three scheme membership flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemeFlags {
    /// Member holds the scheme guest role.
    pub guest: bool,
    /// Member holds the scheme user role.
    pub user: bool,
    /// Member holds the scheme admin role.
    pub admin: bool,
}

/// Default role names configured by the team's scheme.
///
/// Empty strings mean the team has no scheme (or the scheme leaves that
/// level unset) and the well-known ids apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeDefaults {
    /// Role granted to scheme guests.
    pub guest_role: String,
    /// Role granted to scheme users.
    pub user_role: String,
    /// Role granted to scheme admins.
    pub admin_role: String,
}

impl SchemeDefaults {
    /// Build defaults from nullable column values.
    #[must_use]
    pub fn from_columns(
        guest_role: Option<String>,
        user_role: Option<String>,
        admin_role: Option<String>,
    ) -> Self {
        Self {
            guest_role: guest_role.unwrap_or_default(),
            user_role: user_role.unwrap_or_default(),
            admin_role: admin_role.unwrap_or_default(),
        }
    }

    fn implied_roles(&self, flags: SchemeFlags) -> impl Iterator<Item = &str> {
        [
            (flags.guest, self.guest_role.as_str(), TEAM_GUEST_ROLE_ID),
            (flags.user, self.user_role.as_str(), TEAM_USER_ROLE_ID),
            (flags.admin, self.admin_role.as_str(), TEAM_ADMIN_ROLE_ID),
        ]
        .into_iter()
        .filter(|(active, _, _)| *active)
        .map(|(_, configured, fallback)| {
            if configured.is_empty() {
                fallback
            } else {
                configured
            }
        })
    }
}

/// Outcome of splitting a token list into scheme flags and explicit roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedRoles {
    /// Non-scheme tokens, first-seen order, each once.
    pub explicit: Vec<String>,
    /// Input flags OR-ed with any scheme role ids found among the tokens.
    pub flags: SchemeFlags,
}

/// Result of [`resolve_team_roles`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRoles {
    /// Explicit roles followed by scheme-implied roles, without duplicates.
    pub roles: Vec<String>,
    /// Explicit roles only.
    pub explicit_roles: Vec<String>,
    /// Resolved scheme flags.
    pub flags: SchemeFlags,
}

impl ResolvedRoles {
    /// Effective roles as a space-separated string.
    #[must_use]
    pub fn roles_string(&self) -> String {
        self.roles.join(" ")
    }

    /// Explicit roles as a space-separated string.
    #[must_use]
    pub fn explicit_roles_string(&self) -> String {
        self.explicit_roles.join(" ")
    }
}

/// Move scheme role ids out of `tokens` and into the flags.
pub fn partition_scheme_roles<'a, I>(flags: SchemeFlags, tokens: I) -> PartitionedRoles
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = PartitionedRoles {
        explicit: Vec::new(),
        flags,
    };
    for token in tokens {
        match token {
            TEAM_GUEST_ROLE_ID => result.flags.guest = true,
            TEAM_USER_ROLE_ID => result.flags.user = true,
            TEAM_ADMIN_ROLE_ID => result.flags.admin = true,
            other => push_unique(&mut result.explicit, other),
        }
    }
    result
}

/// Compute the effective roles of a team membership.
///
/// Scheme role ids found in `tokens` are absorbed into the flags; each
/// active flag then contributes its scheme default (or the well-known id when
/// the default is empty) unless the role is already listed.
pub fn resolve_team_roles<'a, I>(
    flags: SchemeFlags,
    defaults: &SchemeDefaults,
    tokens: I,
) -> ResolvedRoles
where
    I: IntoIterator<Item = &'a str>,
{
    let partitioned = partition_scheme_roles(flags, tokens);
    let mut roles = partitioned.explicit.clone();
    for implied in defaults.implied_roles(partitioned.flags) {
        push_unique(&mut roles, implied);
    }

    ResolvedRoles {
        roles,
        explicit_roles: partitioned.explicit,
        flags: partitioned.flags,
    }
}

fn push_unique(list: &mut Vec<String>, role: &str) {
    if !list.iter().any(|existing| existing == role) {
        list.push(role.to_owned());
    }
}
