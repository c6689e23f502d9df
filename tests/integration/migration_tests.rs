//! Integration tests for the membership sweeps.
//!
//! Validates:
//! - Legacy role tokens move into scheme flags batch by batch
//! - The cursor walks the key space in order and ends with `None`
//! - Custom role clearing keeps built-in roles and counts rewritten rows

use teamstore::models::new_id;
use teamstore::persistence::team_store::{MemberCursor, MIGRATION_BATCH_SIZE};

use super::test_helpers::{insert_legacy_member, memory_stores, save_team, stored_roles};

#[tokio::test]
async fn cursor_walks_every_legacy_row() {
    let (db, stores) = memory_stores().await;
    let team = save_team(&stores, "alpha").await;
    let total = usize::try_from(MIGRATION_BATCH_SIZE).expect("batch size") + 20;
    let mut users = Vec::new();
    for _ in 0..total {
        let user = new_id();
        insert_legacy_member(&db, &team.id, &user, "team_user team_admin custom").await;
        users.push(user);
    }
    users.sort();

    let first = stores
        .team
        .migrate_team_members(&MemberCursor::start())
        .await
        .expect("batch")
        .expect("cursor");
    let boundary = usize::try_from(MIGRATION_BATCH_SIZE).expect("batch size") - 1;
    assert_eq!(first.team_id, team.id);
    assert_eq!(first.user_id, users[boundary]);

    let second = stores
        .team
        .migrate_team_members(&first)
        .await
        .expect("batch")
        .expect("cursor");
    assert_eq!(second.user_id, users[total - 1]);

    assert!(stores
        .team
        .migrate_team_members(&second)
        .await
        .expect("done")
        .is_none());

    for user in &users {
        assert_eq!(stored_roles(&db, &team.id, user).await, "custom");
        let member = stores.team.get_member(&team.id, user).await.expect("member");
        assert!(member.scheme_user);
        assert!(member.scheme_admin);
        assert!(!member.scheme_guest);
        assert_eq!(member.roles, "custom team_user team_admin");
    }
}

#[tokio::test]
async fn migrate_all_reports_batches_and_rows() {
    let (db, stores) = memory_stores().await;
    let alpha = save_team(&stores, "alpha").await;
    let beta = save_team(&stores, "beta").await;
    for team in [&alpha, &beta] {
        for _ in 0..60 {
            insert_legacy_member(&db, &team.id, &new_id(), "team_guest").await;
        }
    }

    let report = stores.team.migrate_all_team_members().await.expect("migrate");
    assert_eq!(report.rows, 120);
    assert_eq!(report.batches, 2);

    let guests: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM TeamMembers WHERE SchemeGuest = 1 AND SchemeUser = 0 AND Roles = ''",
    )
    .fetch_one(db.as_ref())
    .await
    .expect("count");
    assert_eq!(guests, 120);

    let again = stores.team.migrate_all_team_members().await.expect("rerun");
    assert_eq!(again.rows, 120);
}

#[tokio::test]
async fn clearing_custom_roles_keeps_built_ins() {
    let (db, stores) = memory_stores().await;
    let team = save_team(&stores, "alpha").await;
    let custom = new_id();
    let mixed = new_id();
    let plain = new_id();
    insert_legacy_member(&db, &team.id, &custom, "helper").await;
    insert_legacy_member(&db, &team.id, &mixed, "team_user reviewer team_admin").await;
    insert_legacy_member(&db, &team.id, &plain, "team_user").await;

    let updated = stores
        .team
        .clear_all_custom_role_assignments()
        .await
        .expect("clear");
    assert_eq!(updated, 2);

    assert_eq!(stored_roles(&db, &team.id, &custom).await, "");
    assert_eq!(stored_roles(&db, &team.id, &mixed).await, "team_user team_admin");
    assert_eq!(stored_roles(&db, &team.id, &plain).await, "team_user");

    assert_eq!(
        stores
            .team
            .clear_all_custom_role_assignments()
            .await
            .expect("rerun"),
        0
    );
}
