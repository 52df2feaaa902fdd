use gemba_core::model::mutations::add_topic;
use gemba_core::{
    seed_document, CategoryId, LocalStore, LocalStoreError, SqliteLocalStore, DEFAULT_STORAGE_KEY,
};
use rusqlite::params;

fn write_raw(store: &SqliteLocalStore, raw: &str) {
    store
        .connection()
        .execute(
            "INSERT OR REPLACE INTO kv_slots (key, value) VALUES (?1, ?2);",
            params![store.key(), raw],
        )
        .unwrap();
}

#[test]
fn load_on_empty_store_is_absent() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    assert!(store.try_load().unwrap().is_none());
    assert!(store.load().is_none());
}

#[test]
fn save_then_load_returns_same_document() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    let (doc, _) = add_topic(&seed_document(), CategoryId::Projects, "Roadmap");

    store.save(&doc).unwrap();
    assert_eq!(store.load(), Some(doc));
}

#[test]
fn save_overwrites_whole_document() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    let (first, _) = add_topic(&seed_document(), CategoryId::Rtb, "First");
    let second = seed_document();

    store.save(&first).unwrap();
    store.save(&second).unwrap();
    assert_eq!(store.load(), Some(second));

    let rows: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM kv_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn malformed_json_loads_as_absent() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    write_raw(&store, "{not json");

    assert!(matches!(store.try_load(), Err(LocalStoreError::Decode(_))));
    assert!(store.load().is_none());
}

#[test]
fn foreign_shape_loads_as_absent() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    write_raw(&store, r#"{"rtb": {"id": "rtb", "title": "x", "items": []}}"#);
    assert!(store.load().is_none());
}

#[test]
fn structurally_invalid_document_loads_as_absent() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    let mut value = serde_json::to_value(seed_document()).unwrap();
    value["projects"]["id"] = serde_json::json!("rtb");
    write_raw(&store, &value.to_string());

    assert!(matches!(store.try_load(), Err(LocalStoreError::Invalid(_))));
    assert!(store.load().is_none());
}

#[test]
fn slots_are_isolated_by_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gemba.db");
    let first = SqliteLocalStore::open(&path, "client_a").unwrap();
    first.save(&seed_document()).unwrap();

    let second = SqliteLocalStore::open(&path, "client_b").unwrap();
    assert!(second.load().is_none());
    assert_eq!(first.load(), Some(seed_document()));
}

#[test]
fn document_survives_reopen_and_clear_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gemba.db");
    {
        let store = SqliteLocalStore::open(&path, DEFAULT_STORAGE_KEY).unwrap();
        store.save(&seed_document()).unwrap();
    }

    let reopened = SqliteLocalStore::open(&path, DEFAULT_STORAGE_KEY).unwrap();
    assert_eq!(reopened.load(), Some(seed_document()));

    reopened.clear().unwrap();
    assert!(reopened.load().is_none());
}

#[test]
fn save_fails_when_slot_table_is_gone() {
    let store = SqliteLocalStore::open_in_memory(DEFAULT_STORAGE_KEY).unwrap();
    store
        .connection()
        .execute_batch("DROP TABLE kv_slots;")
        .unwrap();

    let err = store.save(&seed_document()).unwrap_err();
    assert!(matches!(err, LocalStoreError::Db(_)));
}
