//! System key/value setting model.

use serde::{Deserialize, Serialize};

/// One system-wide setting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "PascalCase")]
pub struct System {
    /// Setting name.
    pub name: String,
    /// Setting value.
    pub value: String,
}

impl System {
    /// Construct a setting.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
