use std::error::Error;

use teamstore::StoreError;

#[test]
fn not_found_display_names_entity_and_key() {
    let err = StoreError::not_found("team", "abc");
    assert_eq!(err.to_string(), "not found: team abc");
    assert!(err.is_not_found());
    assert!(!err.is_conflict());
}

#[test]
fn variants_use_distinct_prefixes() {
    let cases = [
        (StoreError::Config("x".into()), "config: x"),
        (StoreError::Conflict("x".into()), "conflict: x"),
        (StoreError::StaleWrite("x".into()), "stale write: x"),
        (StoreError::Validation("x".into()), "validation: x"),
        (StoreError::InvalidInput("x".into()), "invalid input: x"),
        (StoreError::LimitExceeded("x".into()), "limit exceeded: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn conflict_is_classified() {
    assert!(StoreError::Conflict("dup".into()).is_conflict());
}

#[test]
fn sqlx_errors_convert_to_db_with_source() {
    let err: StoreError = sqlx::Error::RowNotFound.into();
    assert!(matches!(err, StoreError::Db(_)));
    assert!(err.to_string().starts_with("db:"));
    assert!(err.source().is_some());
}

#[test]
fn toml_errors_convert_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
    let err: StoreError = toml_err.into();
    assert!(err.to_string().starts_with("config: invalid config:"));
    assert!(err.source().is_none());
}
