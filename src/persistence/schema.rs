//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`; safe to
//! re-run on every startup. Column names and sizes match the physical
//! schema shared with existing installations.

use sqlx::SqlitePool;

use crate::Result;

/// Tables owned by the stores in this crate.
const OWNED_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS Teams (
    Id                  VARCHAR(26) PRIMARY KEY NOT NULL,
    CreateAt            BIGINT NOT NULL DEFAULT 0,
    UpdateAt            BIGINT NOT NULL DEFAULT 0,
    DeleteAt            BIGINT NOT NULL DEFAULT 0,
    DisplayName         VARCHAR(64) NOT NULL DEFAULT '',
    Name                VARCHAR(64) NOT NULL UNIQUE,
    Description         VARCHAR(255) NOT NULL DEFAULT '',
    Email               VARCHAR(128) NOT NULL DEFAULT '',
    Type                VARCHAR(255) NOT NULL DEFAULT 'O',
    CompanyName         VARCHAR(64) NOT NULL DEFAULT '',
    AllowedDomains      VARCHAR(1000) NOT NULL DEFAULT '',
    InviteId            VARCHAR(32) NOT NULL DEFAULT '',
    AllowOpenInvite     BOOLEAN NOT NULL DEFAULT 0,
    LastTeamIconUpdate  BIGINT NOT NULL DEFAULT 0,
    SchemeId            VARCHAR(255),
    GroupConstrained    BOOLEAN
);

CREATE TABLE IF NOT EXISTS TeamMembers (
    TeamId      VARCHAR(26) NOT NULL,
    UserId      VARCHAR(26) NOT NULL,
    Roles       VARCHAR(64) NOT NULL DEFAULT '',
    DeleteAt    BIGINT NOT NULL DEFAULT 0,
    SchemeUser  BOOLEAN,
    SchemeAdmin BOOLEAN,
    SchemeGuest BOOLEAN,
    PRIMARY KEY (TeamId, UserId)
);

CREATE TABLE IF NOT EXISTS Preferences (
    UserId      VARCHAR(26) NOT NULL,
    Category    VARCHAR(32) NOT NULL,
    Name        VARCHAR(32) NOT NULL,
    Value       VARCHAR(2000) NOT NULL DEFAULT '',
    PRIMARY KEY (UserId, Category, Name)
);

CREATE TABLE IF NOT EXISTS Status (
    UserId          VARCHAR(26) PRIMARY KEY NOT NULL,
    Status          VARCHAR(32) NOT NULL,
    Manual          BOOLEAN NOT NULL DEFAULT 0,
    LastActivityAt  BIGINT NOT NULL DEFAULT 0,
    ActiveChannel   VARCHAR(26) NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS Jobs (
    Id              VARCHAR(26) PRIMARY KEY NOT NULL,
    Type            VARCHAR(32) NOT NULL,
    Priority        BIGINT NOT NULL DEFAULT 0,
    CreateAt        BIGINT NOT NULL DEFAULT 0,
    StartAt         BIGINT NOT NULL DEFAULT 0,
    LastActivityAt  BIGINT NOT NULL DEFAULT 0,
    Status          VARCHAR(32) NOT NULL,
    Progress        BIGINT NOT NULL DEFAULT 0,
    Data            VARCHAR(1024)
);

CREATE TABLE IF NOT EXISTS Systems (
    Name    VARCHAR(64) PRIMARY KEY NOT NULL,
    Value   VARCHAR(1024)
);

CREATE INDEX IF NOT EXISTS idx_teams_name ON Teams(Name);
CREATE INDEX IF NOT EXISTS idx_teams_invite_id ON Teams(InviteId);
CREATE INDEX IF NOT EXISTS idx_teams_update_at ON Teams(UpdateAt);
CREATE INDEX IF NOT EXISTS idx_teams_create_at ON Teams(CreateAt);
CREATE INDEX IF NOT EXISTS idx_teams_delete_at ON Teams(DeleteAt);
CREATE INDEX IF NOT EXISTS idx_teams_scheme_id ON Teams(SchemeId);
CREATE INDEX IF NOT EXISTS idx_teammembers_team_id ON TeamMembers(TeamId);
CREATE INDEX IF NOT EXISTS idx_teammembers_user_id ON TeamMembers(UserId);
CREATE INDEX IF NOT EXISTS idx_teammembers_delete_at ON TeamMembers(DeleteAt);
CREATE INDEX IF NOT EXISTS idx_preferences_user_id ON Preferences(UserId);
CREATE INDEX IF NOT EXISTS idx_preferences_category ON Preferences(Category);
CREATE INDEX IF NOT EXISTS idx_preferences_name ON Preferences(Name);
CREATE INDEX IF NOT EXISTS idx_status_user_id ON Status(UserId);
CREATE INDEX IF NOT EXISTS idx_status_status ON Status(Status);
CREATE INDEX IF NOT EXISTS idx_jobs_type ON Jobs(Type);
";

/// Collaborator tables owned by other parts of the application.
///
/// Only the columns the stores read are declared; an existing table with
/// more columns is left untouched.
const COLLABORATOR_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS Schemes (
    Id                      VARCHAR(26) PRIMARY KEY NOT NULL,
    Name                    VARCHAR(64) NOT NULL DEFAULT '',
    DefaultTeamGuestRole    VARCHAR(64),
    DefaultTeamUserRole     VARCHAR(64),
    DefaultTeamAdminRole    VARCHAR(64)
);

CREATE TABLE IF NOT EXISTS Users (
    Id          VARCHAR(26) PRIMARY KEY NOT NULL,
    Username    VARCHAR(64) NOT NULL DEFAULT '',
    DeleteAt    BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS Channels (
    Id              VARCHAR(26) PRIMARY KEY NOT NULL,
    TeamId          VARCHAR(26) NOT NULL DEFAULT '',
    TotalMsgCount   BIGINT NOT NULL DEFAULT 0,
    DeleteAt        BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS ChannelMembers (
    ChannelId       VARCHAR(26) NOT NULL,
    UserId          VARCHAR(26) NOT NULL,
    MsgCount        BIGINT NOT NULL DEFAULT 0,
    MentionCount    BIGINT NOT NULL DEFAULT 0,
    NotifyProps     VARCHAR(2000) NOT NULL DEFAULT '{}',
    PRIMARY KEY (ChannelId, UserId)
);

CREATE TABLE IF NOT EXISTS Posts (
    Id  VARCHAR(26) PRIMARY KEY NOT NULL
);
";

/// Apply all table and index definitions to the connected database.
///
/// Safe to call on every startup.
///
/// # Errors
///
/// Returns `StoreError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(OWNED_TABLES).execute(pool).await?;
    sqlx::raw_sql(COLLABORATOR_TABLES).execute(pool).await?;
    Ok(())
}
