//! Integration tests for opening a file database.
//!
//! Validates:
//! - The database file and its directory are created on first connect
//! - Reconnecting re-applies the schema without losing rows

use std::sync::Arc;

use teamstore::models::system::System;
use teamstore::persistence::db;
use teamstore::persistence::dialect::Dialect;
use teamstore::persistence::Stores;

use super::test_helpers::file_config;

#[tokio::test]
async fn reconnect_keeps_existing_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = file_config(&dir.path().join("nested"), 2);

    {
        let pool = Arc::new(db::connect(&config).await.expect("first connect"));
        let stores = Stores::new(Arc::clone(&pool), Dialect::Sqlite);
        stores
            .system
            .save(&System::new("Version", "1"))
            .await
            .expect("save");
        pool.close().await;
    }
    assert!(dir.path().join("nested").join("teamstore.db").exists());

    let pool = Arc::new(db::connect(&config).await.expect("second connect"));
    let stores = Stores::new(pool, Dialect::Sqlite);
    let stored = stores.system.get_by_name("Version").await.expect("get");
    assert_eq!(stored.value, "1");
}
