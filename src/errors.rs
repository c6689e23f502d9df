//! Error types shared across the stores.

use std::fmt::{Display, Formatter};

/// Shared store result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error enumeration covering every failure mode of the persistence layer.
#[derive(Debug)]
pub enum StoreError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// A lookup by key matched no row.
    NotFound {
        /// Entity kind that was looked up (e.g. `team`).
        entity: &'static str,
        /// Key used for the lookup.
        key: String,
    },
    /// An insert violated a unique or primary-key constraint.
    Conflict(String),
    /// A write that must touch exactly one row touched a different number.
    StaleWrite(String),
    /// Domain object failed self-validation; no statement was issued.
    Validation(String),
    /// Caller passed an argument the store cannot act on.
    InvalidInput(String),
    /// Team capacity would be exceeded by the requested insert.
    LimitExceeded(String),
    /// Any other backend failure, forwarded unchanged.
    Db(sqlx::Error),
}

impl StoreError {
    /// Build a `NotFound` error for `entity` looked up by `key`.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Whether this error reports a missing row.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error reports a uniqueness violation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::NotFound { entity, key } => write!(f, "not found: {entity} {key}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::StaleWrite(msg) => write!(f, "stale write: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            Self::Db(err) => write!(f, "db: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err)
    }
}
