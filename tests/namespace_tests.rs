//! File-backed namespace tests.
//!
//! Exercise the public API against an on-disk SQLite database, including
//! reopening the file and sharing one table between namespaces.

use serde_json::json;
use sqlkv::{
    ErrorKind, KvNamespace, ListOptions, NamespaceOptions, PruneTrigger, PutOptions, SchemaState,
    ValueType,
};
use tempfile::TempDir;

fn temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("data").join("kv.db");
    (dir, path)
}

async fn text(kv: &KvNamespace, key: &str) -> Option<String> {
    kv.get(key, ValueType::Text)
        .await
        .expect("get failed")
        .and_then(|v| v.as_str().map(str::to_string))
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let (_dir, path) = temp_db();

    {
        let kv = KvNamespace::file(&path, NamespaceOptions::namespace("app"))
            .expect("Failed to open namespace");
        kv.put(
            "user:1",
            "alice",
            PutOptions::new().metadata(json!({ "role": "admin" })),
        )
        .await
        .expect("put failed");
        kv.put("user:2", "bob", PutOptions::new().expiration_ttl(3600))
            .await
            .expect("put failed");
    }

    let kv = KvNamespace::file(&path, NamespaceOptions::namespace("app"))
        .expect("Failed to reopen namespace");
    assert_eq!(text(&kv, "user:1").await.as_deref(), Some("alice"));
    assert_eq!(text(&kv, "user:2").await.as_deref(), Some("bob"));

    let result = kv
        .get_with_metadata("user:1", ValueType::Text)
        .await
        .expect("get_with_metadata failed");
    assert_eq!(result.metadata, Some(json!({ "role": "admin" })));

    let page = kv
        .list(ListOptions::new().prefix("user:"))
        .await
        .expect("list failed");
    assert_eq!(page.names().collect::<Vec<_>>(), vec!["user:1", "user:2"]);
    assert!(page.keys[1].expiration.is_some());
}

#[tokio::test]
async fn test_reopen_with_existing_schema_and_bootstrap_disabled() {
    let (_dir, path) = temp_db();

    let kv = KvNamespace::file(&path, NamespaceOptions::default().table_name("cache"))
        .expect("Failed to open namespace");
    kv.put("k", "v", PutOptions::new()).await.expect("put failed");
    drop(kv);

    let kv = KvNamespace::file(
        &path,
        NamespaceOptions::default()
            .table_name("cache")
            .auto_create(false),
    )
    .expect("Failed to reopen namespace");
    assert_eq!(kv.schema_state(), SchemaState::Ready);
    assert_eq!(text(&kv, "k").await.as_deref(), Some("v"));
}

#[tokio::test]
async fn test_missing_table_is_backing_store_error() {
    let (_dir, path) = temp_db();
    let kv = KvNamespace::file(&path, NamespaceOptions::default().auto_create(false))
        .expect("Failed to open namespace");

    let err = kv
        .get("k", ValueType::Text)
        .await
        .expect_err("table should not exist");
    assert_eq!(err.kind(), ErrorKind::BackingStore);
}

#[tokio::test]
async fn test_clones_share_one_namespace() {
    let (_dir, path) = temp_db();
    let kv = KvNamespace::file(&path, NamespaceOptions::namespace("shared"))
        .expect("Failed to open namespace");

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let kv = kv.clone();
            tokio::spawn(async move {
                kv.put(&format!("item:{i}"), format!("{i}"), PutOptions::new())
                    .await
            })
        })
        .collect();
    for writer in writers {
        writer.await.expect("task panicked").expect("put failed");
    }

    let values = kv
        .get_many(&["item:0", "item:7", "item:9"], ValueType::Json)
        .await
        .expect("get_many failed");
    assert_eq!(values[0].1.as_ref().and_then(|v| v.as_json()), Some(&json!(0)));
    assert_eq!(values[1].1.as_ref().and_then(|v| v.as_json()), Some(&json!(7)));
    assert!(values[2].1.is_none());
}

#[tokio::test]
async fn test_options_from_toml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = dir.path().join("kv.toml");
    std::fs::write(
        &config,
        r#"
namespace = "sessions"
pruneExpiredKeysOn = ["put", "list"]

[table]
name = "session_kv"
autoCreate = true
"#,
    )
    .expect("Failed to write config");

    let options = NamespaceOptions::load_from(&config).expect("Failed to load config");
    assert_eq!(options.prune_on, vec![PruneTrigger::Put, PruneTrigger::List]);

    let kv = KvNamespace::file(dir.path().join("kv.db"), options).expect("Failed to open");
    assert!(kv.prune_policy().prunes_after(PruneTrigger::List));
    assert!(!kv.prune_policy().prunes_after(PruneTrigger::Delete));

    kv.put("s", "1", PutOptions::new()).await.expect("put failed");
    assert_eq!(text(&kv, "s").await.as_deref(), Some("1"));
}
