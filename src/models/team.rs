//! Team model.

use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

use super::{char_len, is_valid_id, new_id, now_millis};

/// Maximum display name length.
pub const TEAM_DISPLAY_NAME_MAX_RUNES: usize = 64;
/// Maximum URL name length.
pub const TEAM_NAME_MAX_LENGTH: usize = 64;
/// Minimum URL name length.
pub const TEAM_NAME_MIN_LENGTH: usize = 2;
/// Maximum description length.
pub const TEAM_DESCRIPTION_MAX_RUNES: usize = 255;
/// Maximum contact email length.
pub const TEAM_EMAIL_MAX_LENGTH: usize = 128;
/// Maximum company name length.
pub const TEAM_COMPANY_NAME_MAX_RUNES: usize = 64;
/// Maximum allowed-domains list length.
pub const TEAM_ALLOWED_DOMAINS_MAX_LENGTH: usize = 1000;

/// Team visibility type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TeamType {
    /// Anyone may discover the team.
    #[default]
    #[serde(rename = "O")]
    Open,
    /// Membership by invitation only.
    #[serde(rename = "I")]
    Invite,
}

impl TeamType {
    /// Single-letter column encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "O",
            Self::Invite => "I",
        }
    }
}

/// A team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Team {
    /// Identifier; empty until saved.
    pub id: String,
    /// Creation time (ms).
    pub create_at: i64,
    /// Last update time (ms).
    pub update_at: i64,
    /// Soft-delete time (ms); zero while active.
    pub delete_at: i64,
    /// Human-readable name.
    pub display_name: String,
    /// Unique URL name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Contact email.
    pub email: String,
    /// Visibility type.
    #[serde(rename = "type")]
    pub team_type: TeamType,
    /// Company name.
    pub company_name: String,
    /// Comma or space separated email domains allowed to join.
    pub allowed_domains: String,
    /// Invite token.
    pub invite_id: String,
    /// Whether users may join without an invite.
    pub allow_open_invite: bool,
    /// Time the team icon last changed (ms).
    pub last_team_icon_update: i64,
    /// Permission scheme, if any.
    pub scheme_id: Option<String>,
    /// Whether membership is driven by group sync.
    pub group_constrained: Option<bool>,
}

impl Team {
    /// Construct an unsaved open team.
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Assign identity and creation metadata before the first insert.
    pub fn pre_save(&mut self) {
        if self.id.is_empty() {
            self.id = new_id();
        }
        self.create_at = now_millis();
        self.update_at = self.create_at;
        self.name = self.name.trim().to_lowercase();
        self.display_name = self.display_name.trim().to_owned();
        self.email = self.email.trim().to_lowercase();
        if self.invite_id.is_empty() {
            self.invite_id = new_id();
        }
    }

    /// Refresh update metadata before an update.
    pub fn pre_update(&mut self) {
        self.update_at = now_millis();
        self.name = self.name.trim().to_lowercase();
        self.display_name = self.display_name.trim().to_owned();
        self.email = self.email.trim().to_lowercase();
    }

    /// Validate the team before any statement is issued.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` naming the first invalid field.
    pub fn is_valid(&self) -> Result<()> {
        let invalid = |field: &str| {
            Err(StoreError::Validation(format!(
                "team {field} is invalid (id={})",
                self.id
            )))
        };

        if !is_valid_id(&self.id) {
            return invalid("id");
        }
        if self.create_at == 0 {
            return invalid("create_at");
        }
        if self.update_at == 0 {
            return invalid("update_at");
        }
        if self.email.len() > TEAM_EMAIL_MAX_LENGTH
            || (!self.email.is_empty() && !self.email.contains('@'))
        {
            return invalid("email");
        }
        if self.display_name.is_empty() || char_len(&self.display_name) > TEAM_DISPLAY_NAME_MAX_RUNES
        {
            return invalid("display_name");
        }
        if !is_valid_team_name(&self.name) {
            return invalid("name");
        }
        if char_len(&self.description) > TEAM_DESCRIPTION_MAX_RUNES {
            return invalid("description");
        }
        if char_len(&self.company_name) > TEAM_COMPANY_NAME_MAX_RUNES {
            return invalid("company_name");
        }
        if self.allowed_domains.len() > TEAM_ALLOWED_DOMAINS_MAX_LENGTH {
            return invalid("allowed_domains");
        }
        Ok(())
    }
}

/// Team URL names start with a letter and contain only lowercase ASCII
/// letters, digits and dashes.
#[must_use]
pub fn is_valid_team_name(name: &str) -> bool {
    let len = name.len();
    if !(TEAM_NAME_MIN_LENGTH..=TEAM_NAME_MAX_LENGTH).contains(&len) {
        return false;
    }
    let mut bytes = name.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_lowercase())
        && bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A team together with its scheme name, for bulk export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TeamForExport {
    /// The exported team.
    #[serde(flatten)]
    pub team: Team,
    /// Name of the team's scheme, if it has one.
    pub scheme_name: Option<String>,
}
