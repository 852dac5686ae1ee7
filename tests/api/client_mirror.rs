use crate::helpers::{netflix, TestApp};
use serde_json::{Map, Value};
use std::time::Duration;
use subtrack::client::{
    ApiClient, CacheMirror, FileStorage, LocalStorage, MemoryStorage, Operation, SyncStatus,
    PENDING_SYNC_KEY,
};

fn payload(body: Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map,
        _ => panic!("test payload must be an object"),
    }
}

fn api_client(base_url: String) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(2)).expect("Failed to build API client")
}

#[tokio::test]
async fn mirror_round_trips_against_the_real_backend() {
    // given
    let app = TestApp::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    let mut mirror = CacheMirror::new(api_client(app.base_url()), storage).unwrap();

    // when
    let outcome = mirror.create(&payload(netflix())).await.unwrap();

    // then
    assert_eq!(outcome.status, SyncStatus::Synced);
    let remote = api_client(app.base_url())
        .get_subscription(&outcome.value.id)
        .await
        .expect("Subscription missing on the backend");
    assert_eq!(remote.name, "Netflix");
}

#[tokio::test]
async fn offline_create_is_synced_once_the_backend_is_reachable() {
    // given
    let app = TestApp::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let mut offline = CacheMirror::new(
        api_client("http://127.0.0.1:9".into()),
        FileStorage::open(dir.path()).unwrap(),
    )
    .unwrap();
    let outcome = offline.create(&payload(netflix())).await.unwrap();
    assert!(matches!(outcome.status, SyncStatus::LocalOnly { .. }));
    let backend = api_client(app.base_url());
    assert!(backend.list_subscriptions().await.unwrap().is_empty());
    let storage = offline.into_storage();
    assert!(storage.get_item(PENDING_SYNC_KEY).unwrap().is_some());

    // when
    let mut online = CacheMirror::new(backend.clone(), storage).unwrap();
    assert_eq!(online.pending().len(), 1);
    let status = online.fetch().await;

    // then
    assert_eq!(status, SyncStatus::Synced);
    assert!(online.pending().is_empty());
    let remote = backend.list_subscriptions().await.unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(online.subscriptions(), remote.as_slice());
}

#[tokio::test]
async fn replayed_create_with_the_same_operation_id_is_stored_once() {
    // given
    let app = TestApp::spawn().await;
    let backend = api_client(app.base_url());
    let mut offline = CacheMirror::new(
        api_client("http://127.0.0.1:9".into()),
        MemoryStorage::default(),
    )
    .unwrap();
    offline.create(&payload(netflix())).await.unwrap();
    let pending = offline.pending().front().cloned().unwrap();
    let Operation::Create { payload: input, .. } = pending.operation else {
        panic!("Expected a queued create");
    };
    let key = pending.operation_id.to_string();

    // when
    let first = backend.create_subscription(&input, Some(&key)).await.unwrap();
    let second = backend.create_subscription(&input, Some(&key)).await.unwrap();

    // then
    assert_eq!(first.id, second.id);
    assert_eq!(backend.list_subscriptions().await.unwrap().len(), 1);
}
