//! Channel unread counters read alongside team membership.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unread counters for one channel the user belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChannelUnread {
    /// Team owning the channel.
    pub team_id: String,
    /// Channel identifier.
    pub channel_id: String,
    /// Messages posted since the user last viewed the channel.
    pub msg_count: i64,
    /// Unread mentions of the user.
    pub mention_count: i64,
    /// The member's notification properties.
    pub notify_props: HashMap<String, String>,
}
