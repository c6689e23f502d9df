//! User preference model.

use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

use super::{char_len, is_valid_id};

/// Category holding flagged posts; the preference name is the post id.
pub const PREFERENCE_CATEGORY_FLAGGED_POST: &str = "flagged_post";
/// Category holding advanced settings and feature toggles.
pub const PREFERENCE_CATEGORY_ADVANCED_SETTINGS: &str = "advanced_settings";
/// Name prefix of pre-release feature toggles.
pub const FEATURE_TOGGLE_PREFIX: &str = "feature_enabled_";

/// Maximum category length.
pub const PREFERENCE_CATEGORY_MAX_LENGTH: usize = 32;
/// Maximum name length.
pub const PREFERENCE_NAME_MAX_LENGTH: usize = 32;
/// Maximum value length.
pub const PREFERENCE_VALUE_MAX_LENGTH: usize = 2000;

/// One user preference keyed by (user, category, name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "PascalCase")]
pub struct Preference {
    /// Owning user.
    pub user_id: String,
    /// Preference category.
    pub category: String,
    /// Preference name within the category.
    pub name: String,
    /// Opaque value.
    pub value: String,
}

impl Preference {
    /// Construct a preference.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category: category.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Validate the preference before any statement is issued.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` naming the first invalid field.
    pub fn is_valid(&self) -> Result<()> {
        let invalid = |field: &str| {
            Err(StoreError::Validation(format!(
                "preference {field} is invalid (user_id={}, category={}, name={})",
                self.user_id, self.category, self.name
            )))
        };

        if !is_valid_id(&self.user_id) {
            return invalid("user_id");
        }
        if self.category.is_empty() || char_len(&self.category) > PREFERENCE_CATEGORY_MAX_LENGTH {
            return invalid("category");
        }
        if char_len(&self.name) > PREFERENCE_NAME_MAX_LENGTH {
            return invalid("name");
        }
        if char_len(&self.value) > PREFERENCE_VALUE_MAX_LENGTH {
            return invalid("value");
        }
        Ok(())
    }
}
