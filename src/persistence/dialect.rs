//! Per-backend SQL dialect capabilities.
//!
//! The stores render every backend-sensitive fragment through a [`Dialect`]:
//! boolean literals, the case-insensitive match operator, the upsert clause,
//! the statements that open a serializable transaction, and the mapping of
//! driver errors onto the store error taxonomy.

use crate::StoreError;

/// Escape character used when neutralising search wildcards.
pub const SEARCH_ESCAPE: char = '\\';

/// Structured classification of a driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The statement matched no row.
    NotFound,
    /// A unique or primary-key constraint rejected the write.
    UniqueViolation,
    /// Anything else; forwarded unchanged.
    Other,
}

/// Supported SQL backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// `SQLite` 3.24 or newer.
    #[default]
    Sqlite,
    /// `PostgreSQL`.
    Postgres,
    /// `MySQL` / `MariaDB`.
    MySql,
}

impl Dialect {
    /// Short backend name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        }
    }

    /// Literal spelling of a boolean in a WHERE clause.
    #[must_use]
    pub fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Postgres, true) => "true",
            (Self::Postgres, false) => "false",
            (Self::Sqlite | Self::MySql, true) => "1",
            (Self::Sqlite | Self::MySql, false) => "0",
        }
    }

    /// Case-insensitive pattern operator.
    #[must_use]
    pub fn match_operator(self) -> &'static str {
        match self {
            Self::Postgres => "ILIKE",
            Self::Sqlite | Self::MySql => "LIKE",
        }
    }

    /// `column <op> ?` with an explicit escape clause where the backend has
    /// no default escape character.
    #[must_use]
    pub fn match_clause(self, column: &str) -> String {
        match self {
            Self::Sqlite => format!("{column} LIKE ? ESCAPE '{SEARCH_ESCAPE}'"),
            Self::Postgres | Self::MySql => format!("{column} {} ?", self.match_operator()),
        }
    }

    /// Trailing clause turning an `INSERT` into an upsert.
    ///
    /// Returns `None` for backends where the stores probe for the row and
    /// branch to `INSERT` or `UPDATE` instead.
    #[must_use]
    pub fn upsert_clause(self, conflict_columns: &[&str], update_columns: &[&str]) -> Option<String> {
        match self {
            Self::Sqlite => {
                let sets = update_columns
                    .iter()
                    .map(|col| format!("{col} = excluded.{col}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!(
                    "ON CONFLICT ({}) DO UPDATE SET {sets}",
                    conflict_columns.join(", ")
                ))
            }
            Self::MySql => {
                let sets = update_columns
                    .iter()
                    .map(|col| format!("{col} = VALUES({col})"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("ON DUPLICATE KEY UPDATE {sets}"))
            }
            Self::Postgres => None,
        }
    }

    /// Statement text that opens a transaction at serializable isolation.
    #[must_use]
    pub fn begin_serializable(self) -> &'static str {
        match self {
            // SQLite transactions are serializable; IMMEDIATE takes the write
            // lock up front so racing writers queue instead of failing late.
            Self::Sqlite => "BEGIN IMMEDIATE",
            Self::Postgres => "BEGIN ISOLATION LEVEL SERIALIZABLE",
            Self::MySql => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE; START TRANSACTION",
        }
    }

    /// Classify a driver error for this backend.
    #[must_use]
    pub fn classify(self, err: &sqlx::Error) -> ErrorClass {
        match err {
            sqlx::Error::RowNotFound => ErrorClass::NotFound,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                let code = code.as_deref().unwrap_or_default();
                let message = db_err.message();
                let unique = match self {
                    // SQLITE_CONSTRAINT_PRIMARYKEY / SQLITE_CONSTRAINT_UNIQUE
                    Self::Sqlite => {
                        matches!(code, "1555" | "2067")
                            || message.contains("UNIQUE constraint failed")
                    }
                    Self::Postgres => code == "23505",
                    Self::MySql => code == "1062" || message.contains("Duplicate entry"),
                };
                if unique {
                    ErrorClass::UniqueViolation
                } else {
                    ErrorClass::Other
                }
            }
            _ => ErrorClass::Other,
        }
    }

    /// Map a failed write to `Conflict` when it violated a unique key, or
    /// forward it unchanged.
    pub fn write_error(self, err: sqlx::Error, conflict: impl FnOnce() -> String) -> StoreError {
        match self.classify(&err) {
            ErrorClass::UniqueViolation => StoreError::Conflict(conflict()),
            ErrorClass::NotFound | ErrorClass::Other => StoreError::Db(err),
        }
    }
}

/// Error for a stored value that does not decode into the domain model.
pub(crate) fn decode_error(message: String) -> StoreError {
    StoreError::Db(sqlx::Error::Decode(message.into()))
}

/// Neutralise `LIKE` wildcards in a user-supplied term and wrap it for a
/// case-insensitive substring match.
///
/// Any escape character in the input is dropped first so callers cannot
/// smuggle their own escapes.
#[must_use]
pub fn wildcard_search_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        match ch {
            SEARCH_ESCAPE => {}
            '_' | '%' => {
                escaped.push(SEARCH_ESCAPE);
                escaped.push(ch);
            }
            other => escaped.extend(other.to_lowercase()),
        }
    }
    escaped.push('%');
    escaped
}
