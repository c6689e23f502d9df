//! Unit tests for system setting persistence.

use teamstore::models::system::System;

use super::test_helpers::stores;

#[tokio::test]
async fn save_get_and_conflict() {
    let (_db, stores) = stores().await;
    stores
        .system
        .save(&System::new("Version", "1"))
        .await
        .expect("save");

    let stored = stores.system.get_by_name("Version").await.expect("get");
    assert_eq!(stored.value, "1");
    assert!(stores
        .system
        .save(&System::new("Version", "2"))
        .await
        .expect_err("duplicate")
        .is_conflict());
    assert!(stores
        .system
        .get_by_name("Missing")
        .await
        .expect_err("missing")
        .is_not_found());
}

#[tokio::test]
async fn save_or_update_and_update() {
    let (_db, stores) = stores().await;
    stores
        .system
        .save_or_update(&System::new("Mode", "a"))
        .await
        .expect("insert");
    stores
        .system
        .save_or_update(&System::new("Mode", "b"))
        .await
        .expect("overwrite");
    assert_eq!(stores.system.get_by_name("Mode").await.expect("get").value, "b");

    stores
        .system
        .update(&System::new("Mode", "c"))
        .await
        .expect("update");
    assert_eq!(stores.system.get_by_name("Mode").await.expect("get").value, "c");
    assert!(stores
        .system
        .update(&System::new("Ghost", "x"))
        .await
        .expect_err("missing")
        .is_not_found());
}

#[tokio::test]
async fn get_returns_all_settings() {
    let (db, stores) = stores().await;
    stores
        .system
        .save(&System::new("A", "1"))
        .await
        .expect("save");
    sqlx::query("INSERT INTO Systems (Name, Value) VALUES ('B', NULL)")
        .execute(db.as_ref())
        .await
        .expect("null value");

    let all = stores.system.get().await.expect("all");
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("A").map(String::as_str), Some("1"));
    assert_eq!(all.get("B").map(String::as_str), Some(""));
}

#[tokio::test]
async fn permanent_delete_returns_removed_setting() {
    let (_db, stores) = stores().await;
    stores
        .system
        .save(&System::new("Temp", "x"))
        .await
        .expect("save");

    let removed = stores
        .system
        .permanent_delete_by_name("Temp")
        .await
        .expect("delete");
    assert_eq!(removed, Some(System::new("Temp", "x")));
    assert!(stores
        .system
        .permanent_delete_by_name("Temp")
        .await
        .expect("second delete")
        .is_none());
}

#[tokio::test]
async fn insert_if_exists_keeps_first_value() {
    let (_db, stores) = stores().await;
    let first = stores
        .system
        .insert_if_exists(&System::new("InstallationDate", "100"))
        .await
        .expect("insert");
    assert_eq!(first.value, "100");

    let second = stores
        .system
        .insert_if_exists(&System::new("InstallationDate", "200"))
        .await
        .expect("existing");
    assert_eq!(second.value, "100");
    assert_eq!(
        stores
            .system
            .get_by_name("InstallationDate")
            .await
            .expect("get")
            .value,
        "100"
    );
}
