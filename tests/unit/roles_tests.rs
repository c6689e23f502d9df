//! Unit tests for team role resolution.
//!
//! Validates:
//! - Scheme role ids in the token list are absorbed into the flags
//! - Explicit roles keep first-seen order and appear once
//! - Scheme defaults replace the well-known ids when configured
//! - Implied roles are never listed twice

use teamstore::roles::{
    is_built_in_role, partition_scheme_roles, resolve_team_roles, SchemeDefaults, SchemeFlags,
    TEAM_ADMIN_ROLE_ID, TEAM_GUEST_ROLE_ID, TEAM_USER_ROLE_ID,
};

fn flags(guest: bool, user: bool, admin: bool) -> SchemeFlags {
    SchemeFlags { guest, user, admin }
}

#[test]
fn no_flags_no_tokens_yields_nothing() {
    let resolved = resolve_team_roles(SchemeFlags::default(), &SchemeDefaults::default(), []);
    assert!(resolved.roles.is_empty());
    assert!(resolved.explicit_roles.is_empty());
    assert_eq!(resolved.flags, SchemeFlags::default());
}

#[test]
fn user_flag_without_scheme_implies_team_user() {
    let resolved = resolve_team_roles(flags(false, true, false), &SchemeDefaults::default(), []);
    assert_eq!(resolved.roles, vec![TEAM_USER_ROLE_ID]);
    assert!(resolved.explicit_roles.is_empty());
}

#[test]
fn admin_member_gets_user_and_admin_roles_in_order() {
    let resolved = resolve_team_roles(
        flags(false, true, true),
        &SchemeDefaults::default(),
        ["custom"],
    );
    assert_eq!(resolved.roles, vec!["custom", TEAM_USER_ROLE_ID, TEAM_ADMIN_ROLE_ID]);
    assert_eq!(resolved.explicit_roles_string(), "custom");
    assert_eq!(resolved.roles_string(), "custom team_user team_admin");
}

#[test]
fn legacy_tokens_set_flags_and_leave_explicit_list() {
    let resolved = resolve_team_roles(
        SchemeFlags::default(),
        &SchemeDefaults::default(),
        "team_user team_admin custom".split_whitespace(),
    );
    assert_eq!(resolved.flags, flags(false, true, true));
    assert_eq!(resolved.explicit_roles, vec!["custom"]);
    assert_eq!(resolved.roles, vec!["custom", TEAM_USER_ROLE_ID, TEAM_ADMIN_ROLE_ID]);
}

#[test]
fn scheme_defaults_replace_well_known_ids() {
    let defaults = SchemeDefaults::from_columns(
        Some("acme_guest".into()),
        Some("acme_user".into()),
        Some(String::new()),
    );
    let resolved = resolve_team_roles(flags(false, true, true), &defaults, []);
    assert_eq!(resolved.roles, vec!["acme_user", TEAM_ADMIN_ROLE_ID]);

    let guest = resolve_team_roles(flags(true, false, false), &defaults, []);
    assert_eq!(guest.roles, vec!["acme_guest"]);
}

#[test]
fn null_scheme_columns_behave_like_no_scheme() {
    let defaults = SchemeDefaults::from_columns(None, None, None);
    assert_eq!(defaults, SchemeDefaults::default());
    let resolved = resolve_team_roles(flags(true, false, false), &defaults, []);
    assert_eq!(resolved.roles, vec![TEAM_GUEST_ROLE_ID]);
}

#[test]
fn implied_role_listed_explicitly_appears_once() {
    let defaults = SchemeDefaults::from_columns(None, Some("acme_user".into()), None);
    let resolved = resolve_team_roles(flags(false, true, false), &defaults, ["acme_user"]);
    assert_eq!(resolved.roles, vec!["acme_user"]);
    assert_eq!(resolved.explicit_roles, vec!["acme_user"]);
}

#[test]
fn duplicate_tokens_are_kept_once() {
    let resolved = resolve_team_roles(
        SchemeFlags::default(),
        &SchemeDefaults::default(),
        ["b", "a", "b", "a"],
    );
    assert_eq!(resolved.explicit_roles, vec!["b", "a"]);
}

#[test]
fn partition_ors_tokens_into_existing_flags() {
    let partitioned = partition_scheme_roles(flags(true, false, false), ["team_admin", "x"]);
    assert_eq!(partitioned.flags, flags(true, false, true));
    assert_eq!(partitioned.explicit, vec!["x"]);
}

#[test]
fn built_in_role_set_recognises_product_roles() {
    assert!(is_built_in_role("team_user"));
    assert!(is_built_in_role("channel_admin"));
    assert!(is_built_in_role("system_admin"));
    assert!(!is_built_in_role("custom_role"));
}
