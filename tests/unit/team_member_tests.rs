//! Unit tests for team membership persistence.
//!
//! Validates:
//! - Saved and fetched members carry resolved roles
//! - Legacy scheme role ids never reach the stored roles column
//! - Listing options, visibility restrictions and counts
//! - Removal, admin role sync, export and channel unread counters

use std::collections::HashMap;

use teamstore::models::new_id;
use teamstore::models::team::Team;
use teamstore::models::team_member::{
    TeamMember, TeamMemberSort, TeamMembersGetOptions, ViewUsersRestrictions,
};
use teamstore::persistence::db::Database;
use teamstore::persistence::Stores;
use teamstore::StoreError;

use super::test_helpers::{insert_scheme, insert_user, join, save_team, stored_roles, stores};

async fn schemed_team(stores: &Stores, db: &Database) -> Team {
    let scheme_id = insert_scheme(
        db,
        "acme",
        Some("acme_guest"),
        Some("acme_user"),
        Some("acme_admin"),
    )
    .await;
    let mut team = Team::new("schemed", "Schemed");
    team.scheme_id = Some(scheme_id);
    stores.team.save(&team).await.expect("save team")
}

async fn insert_channel_member(
    db: &Database,
    team_id: &str,
    user_id: &str,
    total: i64,
    seen: i64,
    props: &str,
) -> String {
    let channel_id = new_id();
    sqlx::query("INSERT INTO Channels (Id, TeamId, TotalMsgCount, DeleteAt) VALUES (?1, ?2, ?3, 0)")
        .bind(&channel_id)
        .bind(team_id)
        .bind(total)
        .execute(db)
        .await
        .expect("insert channel");
    sqlx::query(
        "INSERT INTO ChannelMembers (ChannelId, UserId, MsgCount, MentionCount, NotifyProps)
         VALUES (?1, ?2, ?3, 1, ?4)",
    )
    .bind(&channel_id)
    .bind(user_id)
    .bind(seen)
    .bind(props)
    .execute(db)
    .await
    .expect("insert channel member");
    channel_id
}

#[tokio::test]
async fn saved_member_gets_team_user_role() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;

    let saved = join(&stores, &team.id, &user).await;
    assert_eq!(saved.roles, "team_user");
    assert_eq!(saved.explicit_roles, "");
    assert_eq!(stored_roles(&db, &team.id, &user).await, "");

    let fetched = stores.team.get_member(&team.id, &user).await.expect("get");
    assert_eq!(fetched, saved);
}

#[tokio::test]
async fn scheme_defaults_replace_team_roles() {
    let (db, stores) = stores().await;
    let team = schemed_team(&stores, &db).await;
    let user = insert_user(&db, "ann", false).await;

    let mut member = TeamMember::new(&team.id, &user);
    member.scheme_admin = true;
    let saved = stores.team.save_member(&member, -1).await.expect("save");
    assert_eq!(saved.roles, "acme_user acme_admin");

    let fetched = stores.team.get_member(&team.id, &user).await.expect("get");
    assert_eq!(fetched.roles, "acme_user acme_admin");
}

#[tokio::test]
async fn legacy_tokens_move_into_flags_on_save() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;

    let member = TeamMember {
        team_id: team.id.clone(),
        user_id: user.clone(),
        explicit_roles: "team_user team_admin custom".into(),
        ..TeamMember::default()
    };
    let saved = stores.team.save_member(&member, -1).await.expect("save");

    assert!(saved.scheme_user);
    assert!(saved.scheme_admin);
    assert_eq!(saved.explicit_roles, "custom");
    assert_eq!(saved.roles, "custom team_user team_admin");
    assert_eq!(stored_roles(&db, &team.id, &user).await, "custom");
}

#[tokio::test]
async fn duplicate_membership_is_conflict() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;
    join(&stores, &team.id, &user).await;

    let err = stores
        .team
        .save_member(&TeamMember::new(&team.id, &user), -1)
        .await
        .expect_err("duplicate");
    assert!(err.is_conflict());
}

#[tokio::test]
async fn invalid_member_rejects_whole_batch() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;

    let batch = [
        TeamMember::new(&team.id, &user),
        TeamMember::new(&team.id, "not-an-id"),
    ];
    let err = stores
        .team
        .save_multiple_members(&batch, -1)
        .await
        .expect_err("invalid");
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(stores
        .team
        .get_member(&team.id, &user)
        .await
        .expect_err("nothing written")
        .is_not_found());
}

#[tokio::test]
async fn update_member_strips_scheme_tokens() {
    let (db, stores) = stores().await;
    let team = schemed_team(&stores, &db).await;
    let user = insert_user(&db, "ann", false).await;
    let mut member = join(&stores, &team.id, &user).await;

    member.explicit_roles = "team_admin helper".into();
    let updated = stores.team.update_member(&member).await.expect("update");
    assert!(updated.scheme_admin);
    assert_eq!(updated.explicit_roles, "helper");
    assert_eq!(updated.roles, "helper acme_user acme_admin");
    assert_eq!(stored_roles(&db, &team.id, &user).await, "helper");

    let fetched = stores.team.get_member(&team.id, &user).await.expect("get");
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn invalid_member_blocks_whole_update() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;
    let mut member = join(&stores, &team.id, &user).await;

    member.explicit_roles = "helper".into();
    let batch = [member, TeamMember::new(&team.id, "not-an-id")];
    let err = stores
        .team
        .update_multiple_members(&batch)
        .await
        .expect_err("invalid");
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(stored_roles(&db, &team.id, &user).await, "");
}

#[tokio::test]
async fn get_member_includes_deleted_and_reports_missing() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;
    let mut member = join(&stores, &team.id, &user).await;
    member.delete_at = 7;
    stores.team.update_member(&member).await.expect("leave");

    let fetched = stores.team.get_member(&team.id, &user).await.expect("get");
    assert_eq!(fetched.delete_at, 7);

    let err = stores
        .team
        .get_member(&team.id, &new_id())
        .await
        .expect_err("missing");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_members_orders_filters_and_pages() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let mut names = HashMap::new();
    for (username, deleted) in [("zed", false), ("amy", false), ("bob", true)] {
        let id = insert_user(&db, username, deleted).await;
        join(&stores, &team.id, &id).await;
        names.insert(id, username);
    }
    let left = insert_user(&db, "cat", false).await;
    let mut membership = join(&stores, &team.id, &left).await;
    membership.delete_at = 1;
    stores.team.update_member(&membership).await.expect("leave");

    let by_id = stores
        .team
        .get_members(&team.id, 0, 10, &TeamMembersGetOptions::default())
        .await
        .expect("members");
    assert_eq!(by_id.len(), 3);
    assert!(by_id.windows(2).all(|w| w[0].user_id < w[1].user_id));

    let options = TeamMembersGetOptions {
        sort: TeamMemberSort::Username,
        exclude_deleted_users: true,
        view_restrictions: None,
    };
    let by_name = stores
        .team
        .get_members(&team.id, 0, 10, &options)
        .await
        .expect("members");
    let usernames: Vec<_> = by_name.iter().map(|m| names[&m.user_id]).collect();
    assert_eq!(usernames, vec!["amy", "zed"]);

    let second = stores
        .team
        .get_members(&team.id, 1, 1, &options)
        .await
        .expect("page");
    assert_eq!(names[&second[0].user_id], "zed");
}

#[tokio::test]
async fn view_restrictions_limit_visible_members() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let other = save_team(&stores, "beta", "Beta", true).await;
    let shared = insert_user(&db, "ann", false).await;
    let in_channel = insert_user(&db, "ben", false).await;
    let hidden = insert_user(&db, "cy", false).await;
    for user in [&shared, &in_channel, &hidden] {
        join(&stores, &team.id, user).await;
    }
    join(&stores, &other.id, &shared).await;
    let channel = insert_channel_member(&db, &team.id, &in_channel, 0, 0, "{}").await;

    let deny = ViewUsersRestrictions {
        teams: Some(Vec::new()),
        channels: Some(Vec::new()),
    };
    let options = TeamMembersGetOptions {
        view_restrictions: Some(deny.clone()),
        ..TeamMembersGetOptions::default()
    };
    assert!(stores
        .team
        .get_members(&team.id, 0, 10, &options)
        .await
        .expect("deny")
        .is_empty());
    assert_eq!(
        stores
            .team
            .get_total_member_count(&team.id, Some(&deny))
            .await
            .expect("count"),
        0
    );

    let by_team = ViewUsersRestrictions {
        teams: Some(vec![other.id.clone()]),
        channels: None,
    };
    let options = TeamMembersGetOptions {
        view_restrictions: Some(by_team.clone()),
        ..TeamMembersGetOptions::default()
    };
    let visible = stores
        .team
        .get_members(&team.id, 0, 10, &options)
        .await
        .expect("by team");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].user_id, shared);
    assert_eq!(
        stores
            .team
            .get_total_member_count(&team.id, Some(&by_team))
            .await
            .expect("count"),
        1
    );

    let by_channel = ViewUsersRestrictions {
        teams: None,
        channels: Some(vec![channel]),
    };
    let visible = stores
        .team
        .get_members_by_ids(
            &team.id,
            &[shared.clone(), in_channel.clone(), hidden.clone()],
            Some(&by_channel),
        )
        .await
        .expect("by channel");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].user_id, in_channel);
}

#[tokio::test]
async fn get_members_by_ids_requires_ids() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let user = insert_user(&db, "ann", false).await;
    join(&stores, &team.id, &user).await;

    let err = stores
        .team
        .get_members_by_ids(&team.id, &[], None)
        .await
        .expect_err("empty");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let found = stores
        .team
        .get_members_by_ids(&team.id, &[user.clone(), new_id()], None)
        .await
        .expect("ids");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].roles, "team_user");
}

#[tokio::test]
async fn teams_for_user_include_deleted_memberships() {
    let (db, stores) = stores().await;
    let user = insert_user(&db, "ann", false).await;
    let mut team_ids = Vec::new();
    for name in ["alpha", "beta", "gamma"] {
        let team = save_team(&stores, name, name, true).await;
        join(&stores, &team.id, &user).await;
        team_ids.push(team.id);
    }
    let mut left = stores.team.get_member(&team_ids[0], &user).await.expect("member");
    left.delete_at = 3;
    stores.team.update_member(&left).await.expect("leave");
    team_ids.sort();

    let all = stores.team.get_teams_for_user(&user).await.expect("all");
    assert_eq!(all.len(), 3);
    let ids: Vec<_> = all.iter().map(|m| m.team_id.clone()).collect();
    assert_eq!(ids, team_ids);

    let page = stores
        .team
        .get_teams_for_user_with_pagination(&user, 1, 2)
        .await
        .expect("page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].team_id, team_ids[2]);
}

#[tokio::test]
async fn member_counts_distinguish_deleted_users() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    for (name, deleted) in [("ann", false), ("ben", false), ("cy", true)] {
        let user = insert_user(&db, name, deleted).await;
        join(&stores, &team.id, &user).await;
    }

    assert_eq!(
        stores.team.get_total_member_count(&team.id, None).await.expect("total"),
        3
    );
    assert_eq!(
        stores.team.get_active_member_count(&team.id, None).await.expect("active"),
        2
    );
}

#[tokio::test]
async fn remove_members_by_list_team_and_user() {
    let (db, stores) = stores().await;
    let alpha = save_team(&stores, "alpha", "Alpha", true).await;
    let beta = save_team(&stores, "beta", "Beta", true).await;
    let users = [
        insert_user(&db, "ann", false).await,
        insert_user(&db, "ben", false).await,
        insert_user(&db, "cy", false).await,
    ];
    for user in &users {
        join(&stores, &alpha.id, user).await;
        join(&stores, &beta.id, user).await;
    }

    stores.team.remove_members(&alpha.id, &[]).await.expect("no-op");
    stores
        .team
        .remove_members(&alpha.id, &users[..2])
        .await
        .expect("remove");
    assert_eq!(stores.team.get_total_member_count(&alpha.id, None).await.expect("count"), 1);

    stores.team.remove_member(&alpha.id, &users[2]).await.expect("remove one");
    assert_eq!(stores.team.get_total_member_count(&alpha.id, None).await.expect("count"), 0);

    stores.team.remove_all_members_by_user(&users[0]).await.expect("by user");
    assert_eq!(stores.team.get_total_member_count(&beta.id, None).await.expect("count"), 2);

    stores.team.remove_all_members_by_team(&beta.id).await.expect("by team");
    assert!(stores.team.get_teams_for_user(&users[1]).await.expect("teams").is_empty());
}

#[tokio::test]
async fn user_team_ids_and_membership_checks() {
    let (db, stores) = stores().await;
    let user = insert_user(&db, "ann", false).await;
    let active = save_team(&stores, "active", "Active", true).await;
    let mut deleted = save_team(&stores, "deleted", "Deleted", true).await;
    let unrelated = save_team(&stores, "unrelated", "Unrelated", true).await;
    join(&stores, &active.id, &user).await;
    join(&stores, &deleted.id, &user).await;
    deleted.delete_at = 9;
    stores.team.update(&deleted).await.expect("delete team");

    let ids = stores.team.get_user_team_ids(&user).await.expect("ids");
    assert_eq!(ids, vec![active.id.clone()]);

    assert!(stores
        .team
        .user_belongs_to_teams(&user, &[unrelated.id.clone(), active.id.clone()])
        .await
        .expect("belongs"));
    assert!(!stores
        .team
        .user_belongs_to_teams(&user, &[unrelated.id.clone()])
        .await
        .expect("belongs"));
    assert!(!stores.team.user_belongs_to_teams(&user, &[]).await.expect("empty"));
}

#[tokio::test]
async fn export_reports_team_name_and_null_flags() {
    let (db, stores) = stores().await;
    let user = insert_user(&db, "ann", false).await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let legacy = save_team(&stores, "legacy", "Legacy", true).await;
    join(&stores, &team.id, &user).await;
    sqlx::query("INSERT INTO TeamMembers (TeamId, UserId, Roles, DeleteAt) VALUES (?1, ?2, 'team_user', 0)")
        .bind(&legacy.id)
        .bind(&user)
        .execute(db.as_ref())
        .await
        .expect("legacy row");

    let exported = stores
        .team
        .get_team_members_for_export(&user)
        .await
        .expect("export");
    assert_eq!(exported.len(), 2);

    let modern = exported.iter().find(|m| m.team_name == "alpha").expect("alpha");
    assert_eq!(modern.scheme_user, Some(true));
    assert!(!modern.scheme_guest);

    let old = exported.iter().find(|m| m.team_name == "legacy").expect("legacy");
    assert_eq!(old.roles, "team_user");
    assert!(!old.scheme_guest);
    assert_eq!(old.scheme_user, None);
    assert_eq!(old.scheme_admin, None);
}

#[tokio::test]
async fn update_members_role_syncs_admin_flags() {
    let (db, stores) = stores().await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    let ann = insert_user(&db, "ann", false).await;
    let ben = insert_user(&db, "ben", false).await;
    let guest = insert_user(&db, "gus", false).await;
    join(&stores, &team.id, &ann).await;
    let mut admin = TeamMember::new(&team.id, &ben);
    admin.scheme_admin = true;
    stores.team.save_member(&admin, -1).await.expect("admin");
    let mut guest_member = TeamMember::new(&team.id, &guest);
    guest_member.scheme_user = false;
    guest_member.scheme_guest = true;
    guest_member.scheme_admin = true;
    stores.team.save_member(&guest_member, -1).await.expect("guest");

    stores
        .team
        .update_members_role(&team.id, &[ann.clone()])
        .await
        .expect("sync");
    assert!(stores.team.get_member(&team.id, &ann).await.expect("ann").scheme_admin);
    assert!(!stores.team.get_member(&team.id, &ben).await.expect("ben").scheme_admin);
    assert!(stores.team.get_member(&team.id, &guest).await.expect("guest").scheme_admin);

    stores.team.update_members_role(&team.id, &[]).await.expect("clear");
    assert!(!stores.team.get_member(&team.id, &ann).await.expect("ann").scheme_admin);
}

#[tokio::test]
async fn channel_unreads_split_by_team() {
    let (db, stores) = stores().await;
    let user = insert_user(&db, "ann", false).await;
    let alpha = save_team(&stores, "alpha", "Alpha", true).await;
    let beta = save_team(&stores, "beta", "Beta", true).await;
    let alpha_channel = insert_channel_member(&db, &alpha.id, &user, 10, 4, r#"{"desktop":"all"}"#).await;
    let beta_channel = insert_channel_member(&db, &beta.id, &user, 3, 3, "").await;

    let in_alpha = stores
        .team
        .get_channel_unreads_for_team(&alpha.id, &user)
        .await
        .expect("team unreads");
    assert_eq!(in_alpha.len(), 1);
    assert_eq!(in_alpha[0].channel_id, alpha_channel);
    assert_eq!(in_alpha[0].msg_count, 6);
    assert_eq!(in_alpha[0].mention_count, 1);
    assert_eq!(in_alpha[0].notify_props.get("desktop").map(String::as_str), Some("all"));

    let elsewhere = stores
        .team
        .get_channel_unreads_for_all_teams(&alpha.id, &user)
        .await
        .expect("other unreads");
    assert_eq!(elsewhere.len(), 1);
    assert_eq!(elsewhere[0].channel_id, beta_channel);
    assert_eq!(elsewhere[0].msg_count, 0);
    assert!(elsewhere[0].notify_props.is_empty());
}

#[tokio::test]
async fn malformed_notify_props_fail_to_decode() {
    let (db, stores) = stores().await;
    let user = insert_user(&db, "ann", false).await;
    let team = save_team(&stores, "alpha", "Alpha", true).await;
    insert_channel_member(&db, &team.id, &user, 1, 0, "not json").await;

    let err = stores
        .team
        .get_channel_unreads_for_team(&team.id, &user)
        .await
        .expect_err("decode");
    assert!(matches!(err, StoreError::Db(_)));
}
