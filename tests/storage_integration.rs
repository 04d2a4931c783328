//! Integration tests for the state stores
//!
//! Every backend must round-trip the three registry blobs, and the service
//! must come back with the same registry after a restart.

use autolavado::models::ClientData;
use autolavado::registry::RegistrySettings;
use autolavado::service::ParkingService;
use autolavado::storage::{
    load_registry, save_registry, FileStore, MemoryStore, SqliteStore, StateStore, CLIENTS_KEY,
    LEVELS_KEY, SPACES_KEY,
};
use rand::RngExt;
use std::path::PathBuf;
use std::sync::Arc;

/// Helper to create SQLite test storage
async fn create_sqlite_store() -> Arc<dyn StateStore> {
    let store = SqliteStore::new("sqlite::memory:", 1).await.unwrap();
    store.init().await.unwrap();
    Arc::new(store)
}

/// Fresh directory under the system temp dir
fn temp_state_dir() -> PathBuf {
    let suffix: u64 = rand::rng().random_range(0..u64::MAX);
    std::env::temp_dir().join(format!("autolavado-test-{suffix:x}"))
}

async fn create_file_store() -> (Arc<dyn StateStore>, PathBuf) {
    let dir = temp_state_dir();
    let store = FileStore::new(&dir);
    store.init().await.unwrap();
    (Arc::new(store), dir)
}

fn client(name: &str) -> ClientData {
    ClientData {
        name: name.to_string(),
        phone: "0351 123-4567".to_string(),
        vehicle: Some("Ford Ka".to_string()),
        ..ClientData::default()
    }
}

async fn assert_basic_kv(store: &dyn StateStore) {
    assert_eq!(store.get("missing").await.unwrap(), None);

    store.put(LEVELS_KEY, "[]").await.unwrap();
    assert_eq!(store.get(LEVELS_KEY).await.unwrap().as_deref(), Some("[]"));

    store.put(LEVELS_KEY, "[1]").await.unwrap();
    assert_eq!(store.get(LEVELS_KEY).await.unwrap().as_deref(), Some("[1]"));

    store.remove(LEVELS_KEY).await.unwrap();
    assert_eq!(store.get(LEVELS_KEY).await.unwrap(), None);

    // Removing twice is fine
    store.remove(LEVELS_KEY).await.unwrap();
}

async fn assert_registry_round_trip(store: &dyn StateStore) {
    let settings = RegistrySettings::default();
    let mut registry = load_registry(store, settings).await.unwrap();
    assert_eq!(registry.levels().len(), 1);

    registry.add_level().unwrap();
    let occupant = registry.occupy("SUB2-002", client("Lucía"), 1_000).unwrap();
    registry.set_hold("SUB1-004", true).unwrap();
    save_registry(store, &registry).await.unwrap();

    let loaded = load_registry(store, settings).await.unwrap();
    assert_eq!(loaded.levels(), registry.levels());
    assert_eq!(loaded.spaces(), registry.spaces());
    assert_eq!(loaded.clients(), registry.clients());
    assert_eq!(loaded.client_for_space("SUB2-002"), Some(&occupant));
    assert!(loaded.space("SUB1-004").unwrap().hold);

    for key in [LEVELS_KEY, SPACES_KEY, CLIENTS_KEY] {
        assert!(store.get(key).await.unwrap().is_some(), "{key}");
    }
}

#[tokio::test]
async fn test_sqlite_store_kv() {
    let store = create_sqlite_store().await;
    assert_basic_kv(store.as_ref()).await;
}

#[tokio::test]
async fn test_sqlite_store_registry_round_trip() {
    let store = create_sqlite_store().await;
    assert_registry_round_trip(store.as_ref()).await;
}

#[tokio::test]
async fn test_file_store_kv() {
    let (store, dir) = create_file_store().await;
    assert_basic_kv(store.as_ref()).await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_file_store_registry_round_trip() {
    let (store, dir) = create_file_store().await;
    assert_registry_round_trip(store.as_ref()).await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_file_store_writes_one_file_per_key() {
    let (store, dir) = create_file_store().await;
    store.put(SPACES_KEY, "{}").await.unwrap();

    let text = std::fs::read_to_string(dir.join(format!("{SPACES_KEY}.json"))).unwrap();
    assert_eq!(text, "{}");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_file_store_rejects_path_like_keys() {
    let (store, dir) = create_file_store().await;
    assert!(store.put("../escape", "x").await.is_err());
    assert!(store.get("a/b").await.is_err());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_memory_store_registry_round_trip() {
    let store = MemoryStore::new();
    assert_basic_kv(&store).await;
    assert_registry_round_trip(&store).await;
}

#[tokio::test]
async fn test_malformed_blob_loads_as_empty() {
    let store = MemoryStore::new();
    store.put(LEVELS_KEY, r#"[{"id":"SUB1","label":"Subsuelo 1"}]"#).await.unwrap();
    store.put(SPACES_KEY, "{not json").await.unwrap();

    let registry = load_registry(&store, RegistrySettings::default()).await.unwrap();
    assert_eq!(registry.levels().len(), 1);
    assert!(registry.spaces().is_empty());
    assert!(registry.clients().is_empty());
}

#[tokio::test]
async fn test_service_restart_keeps_occupancy_sqlite() {
    let store = create_sqlite_store().await;

    let service = ParkingService::load(Arc::clone(&store), RegistrySettings::default())
        .await
        .unwrap();
    let created = service.occupy("SUB1-003", client("Mario")).await.unwrap();
    service.transfer_space("SUB1-010", "SUB1").await.unwrap_err();
    drop(service);

    let restarted = ParkingService::load(store, RegistrySettings::default())
        .await
        .unwrap();
    let occupant = restarted
        .read(|r| r.client_for_space("SUB1-003").cloned())
        .await
        .unwrap();
    assert_eq!(occupant, created);
    assert_eq!(occupant.phone_intl, "5493511234567");

    let stats = restarted.stats().await;
    assert_eq!(stats.occupied_spaces, 1);
    assert_eq!(stats.free_spaces, 9);
}

#[tokio::test]
async fn test_concurrent_occupy_same_space() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let service = Arc::new(
        ParkingService::load(store, RegistrySettings::default())
            .await
            .unwrap(),
    );

    let mut handles = vec![];
    for i in 0..10 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.occupy("SUB1-001", client(&format!("Cliente {i}"))).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(service.read(|r| r.clients().len()).await, 1);
}
