//! User presence status model.

use serde::{Deserialize, Serialize};

/// Presence value shown for a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Active recently.
    Online,
    /// Idle.
    Away,
    /// Do not disturb.
    Dnd,
    /// Not connected.
    Offline,
}

impl Presence {
    /// Column encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        }
    }

    /// Parse the column encoding.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "away" => Some(Self::Away),
            "dnd" => Some(Self::Dnd),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

/// A user's presence record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Status {
    /// Owning user.
    pub user_id: String,
    /// Current presence.
    pub status: Presence,
    /// Set explicitly by the user rather than by activity tracking.
    pub manual: bool,
    /// Last activity time (ms).
    pub last_activity_at: i64,
    /// Channel the user last viewed.
    pub active_channel: String,
}

impl Status {
    /// Construct a status record.
    #[must_use]
    pub fn new(user_id: impl Into<String>, status: Presence, manual: bool, last_activity_at: i64) -> Self {
        Self {
            user_id: user_id.into(),
            status,
            manual,
            last_activity_at,
            active_channel: String::new(),
        }
    }
}
