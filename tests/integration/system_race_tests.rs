//! Integration tests for concurrent system setting inserts on a file
//! database.

use std::collections::HashSet;
use std::sync::Arc;

use teamstore::models::system::System;
use teamstore::persistence::db;
use teamstore::persistence::dialect::Dialect;
use teamstore::persistence::Stores;

use super::test_helpers::file_config;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_inserts_agree_on_one_winner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = Arc::new(db::connect(&file_config(dir.path(), 4)).await.expect("db"));
    let stores = Stores::new(Arc::clone(&pool), Dialect::Sqlite);

    let mut handles = Vec::new();
    for i in 0..8 {
        let system = stores.system.clone();
        handles.push(tokio::spawn(async move {
            system
                .insert_if_exists(&System::new("InstallationId", format!("node-{i}")))
                .await
        }));
    }

    let mut values = HashSet::new();
    for handle in handles {
        let stored = handle.await.expect("join").expect("insert");
        values.insert(stored.value);
    }
    assert_eq!(values.len(), 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Systems WHERE Name = 'InstallationId'")
        .fetch_one(pool.as_ref())
        .await
        .expect("count");
    assert_eq!(rows, 1);

    let stored = stores
        .system
        .get_by_name("InstallationId")
        .await
        .expect("get");
    assert!(values.contains(&stored.value));
}
