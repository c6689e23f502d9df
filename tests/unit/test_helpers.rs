//! Shared fixtures for store tests.

use std::sync::Arc;

use teamstore::models::new_id;
use teamstore::models::team::{Team, TeamType};
use teamstore::models::team_member::TeamMember;
use teamstore::persistence::db::{self, Database};
use teamstore::persistence::dialect::Dialect;
use teamstore::persistence::Stores;

/// In-memory database plus every store over it.
pub async fn stores() -> (Arc<Database>, Stores) {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let stores = Stores::new(Arc::clone(&db), Dialect::Sqlite);
    (db, stores)
}

pub async fn insert_user(db: &Database, username: &str, deleted: bool) -> String {
    let id = new_id();
    sqlx::query("INSERT INTO Users (Id, Username, DeleteAt) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(username)
        .bind(if deleted { 1_i64 } else { 0 })
        .execute(db)
        .await
        .expect("insert user");
    id
}

pub async fn insert_scheme(
    db: &Database,
    name: &str,
    guest: Option<&str>,
    user: Option<&str>,
    admin: Option<&str>,
) -> String {
    let id = new_id();
    sqlx::query(
        "INSERT INTO Schemes (Id, Name, DefaultTeamGuestRole, DefaultTeamUserRole, DefaultTeamAdminRole)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&id)
    .bind(name)
    .bind(guest)
    .bind(user)
    .bind(admin)
    .execute(db)
    .await
    .expect("insert scheme");
    id
}

pub async fn save_team(stores: &Stores, name: &str, display_name: &str, open: bool) -> Team {
    let mut team = Team::new(name, display_name);
    team.allow_open_invite = open;
    team.team_type = if open { TeamType::Open } else { TeamType::Invite };
    stores.team.save(&team).await.expect("save team")
}

pub async fn join(stores: &Stores, team_id: &str, user_id: &str) -> TeamMember {
    stores
        .team
        .save_member(&TeamMember::new(team_id, user_id), -1)
        .await
        .expect("save member")
}

pub async fn stored_roles(db: &Database, team_id: &str, user_id: &str) -> String {
    sqlx::query_scalar("SELECT Roles FROM TeamMembers WHERE TeamId = ?1 AND UserId = ?2")
        .bind(team_id)
        .bind(user_id)
        .fetch_one(db)
        .await
        .expect("roles column")
}
