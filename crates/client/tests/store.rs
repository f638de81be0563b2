use std::{sync::Arc, time::Duration};

use sea_orm::Database;

use befriend_client::{
    ClientError, Direction, FriendsBackend, FriendsStore, HttpBackend, LocalBackend, Profile,
};
use engine::{Engine, ErrorKind};
use migration::MigratorTrait;

async fn engine_with_users() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    for (id, name) in [
        ("u1", "alice_01"),
        ("u2", "bobby_02"),
        ("u3", "carol_03"),
        ("u4", "alina_04"),
    ] {
        engine.upsert_profile(id, name, "", "").await.unwrap();
    }
    engine
}

async fn local_store() -> (FriendsStore<LocalBackend>, Arc<Engine>) {
    let engine = Arc::new(engine_with_users().await);
    let store = FriendsStore::new(LocalBackend::new(engine.clone()));
    (store, engine)
}

fn ids(profiles: &[Profile]) -> Vec<&str> {
    profiles.iter().map(|p| p.user_id.as_str()).collect()
}

#[tokio::test]
async fn initialize_loads_all_three_lists() {
    let (store, engine) = local_store().await;
    engine.send_request("u2", "u1").await.unwrap();
    engine.send_request("u1", "u3").await.unwrap();
    engine.send_request("u4", "u1").await.unwrap();
    engine.accept_request("u1", "u4").await.unwrap();

    store.initialize("u1").await.unwrap();

    let state = store.state();
    assert_eq!(ids(&state.friends), ["u4"]);
    assert_eq!(ids(&state.incoming_requests), ["u2"]);
    assert_eq!(ids(&state.outgoing_requests), ["u3"]);
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn search_filters_known_users_locally() {
    let (store, engine) = local_store().await;
    engine.send_request("u1", "u4").await.unwrap();
    store.initialize("u1").await.unwrap();

    store.search_users("al", "u1").await.unwrap();
    assert!(store.state().search_results.is_empty());

    store.search_users("b", "u1").await.unwrap();
    assert_eq!(ids(&store.state().search_results), ["u2"]);

    store.search_users("   ", "u1").await.unwrap();
    assert!(store.state().search_results.is_empty());
}

#[tokio::test]
async fn send_moves_search_result_to_outgoing() {
    let (store, engine) = local_store().await;
    store.initialize("u1").await.unwrap();
    store.search_users("bob", "u1").await.unwrap();

    store.send_request("u1", "u2").await.unwrap();

    let state = store.state();
    assert!(state.search_results.is_empty());
    assert_eq!(ids(&state.outgoing_requests), ["u2"]);
    assert!(engine.friend_request("u1", "u2").await.unwrap().is_some());
}

#[tokio::test]
async fn send_without_cached_profile_reloads() {
    let (store, _engine) = local_store().await;
    store.initialize("u1").await.unwrap();

    store.send_request("u1", "u3").await.unwrap();

    assert_eq!(ids(&store.state().outgoing_requests), ["u3"]);
}

#[tokio::test]
async fn failed_send_keeps_state_and_reports_kind() {
    let (store, engine) = local_store().await;
    engine.send_request("u2", "u1").await.unwrap();
    store.initialize("u1").await.unwrap();
    let before = store.state();

    let err = store.send_request("u1", "u2").await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::ReverseRequestExists));
    let state = store.state();
    assert_eq!(state.incoming_requests, before.incoming_requests);
    assert!(!state.is_loading);
    assert_eq!(
        state.error.as_deref(),
        Some("This user already sent you a friend request, accept it instead")
    );

    store.clear_error();
    assert_eq!(store.state().error, None);
}

#[tokio::test]
async fn accept_and_remove_patch_the_lists() {
    let (store, engine) = local_store().await;
    engine.send_request("u2", "u1").await.unwrap();
    store.initialize("u1").await.unwrap();

    store.accept_request("u1", "u2").await.unwrap();
    let state = store.state();
    assert!(state.incoming_requests.is_empty());
    assert_eq!(ids(&state.friends), ["u2"]);

    store.remove_friend("u1", "u2").await.unwrap();
    assert!(store.state().friends.is_empty());
    assert!(engine.friends("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn already_resolved_actions_are_benign() {
    let (store, engine) = local_store().await;
    engine.send_request("u2", "u1").await.unwrap();
    store.initialize("u1").await.unwrap();
    // Accepted elsewhere, the cache is stale.
    engine.accept_request("u1", "u2").await.unwrap();

    store.accept_request("u1", "u2").await.unwrap();

    let state = store.state();
    assert_eq!(state.error, None);
    assert!(state.incoming_requests.is_empty());
    assert_eq!(ids(&state.friends), ["u2"]);

    engine.remove_friend("u2", "u1").await.unwrap();
    store.remove_friend("u1", "u2").await.unwrap();
    assert_eq!(store.state().error, None);
    assert!(store.state().friends.is_empty());
}

#[tokio::test]
async fn reject_drops_the_incoming_request() {
    let (store, engine) = local_store().await;
    engine.send_request("u3", "u1").await.unwrap();
    store.initialize("u1").await.unwrap();

    store.reject_request("u1", "u3").await.unwrap();

    assert!(store.state().incoming_requests.is_empty());
    assert!(engine.profile("u3").await.unwrap().outgoing_requests.is_empty());
}

#[tokio::test]
async fn subscribers_see_every_change() {
    let (store, engine) = local_store().await;
    engine.send_request("u2", "u1").await.unwrap();
    let mut rx = store.subscribe();

    store.initialize("u1").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(ids(&state.incoming_requests), ["u2"]);
    assert!(!state.is_loading);
}

struct SlowBackend;

impl FriendsBackend for SlowBackend {
    async fn search_users(&self, _: &str, _: &str) -> Result<Vec<Profile>, ClientError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }

    async fn send_request(&self, _: &str, _: &str) -> Result<(), ClientError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }

    async fn accept_request(&self, _: &str, _: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn reject_request(&self, _: &str, _: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn remove_friend(&self, _: &str, _: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn friends(&self, _: &str) -> Result<Vec<Profile>, ClientError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }

    async fn requests(&self, _: &str, _: Direction) -> Result<Vec<Profile>, ClientError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn slow_calls_time_out_as_store_unavailable() {
    let store = FriendsStore::new(SlowBackend).with_call_timeout(Duration::from_millis(20));

    let err = store.send_request("u1", "u2").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert_eq!(err.kind(), Some(ErrorKind::StoreUnavailable));
    assert_eq!(
        store.state().error.as_deref(),
        Some("Service unavailable, please try again")
    );

    let err = store.initialize("u1").await.unwrap_err();
    assert!(err.is_retryable());
}

async fn http_store() -> (FriendsStore<HttpBackend>, std::net::SocketAddr) {
    let engine = engine_with_users().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = server::spawn_with_listener(engine, listener).unwrap();
    let backend = HttpBackend::new(&format!("http://{addr}/")).unwrap();
    (FriendsStore::new(backend), addr)
}

#[tokio::test]
async fn http_backend_drives_the_same_flow() {
    let (store, _addr) = http_store().await;

    store.initialize("u1").await.unwrap();
    store.search_users("Bob", "u1").await.unwrap();
    assert_eq!(ids(&store.state().search_results), ["u2"]);

    store.send_request("u1", "u2").await.unwrap();
    assert_eq!(ids(&store.state().outgoing_requests), ["u2"]);

    let incoming = store
        .backend()
        .requests("u2", Direction::Incoming)
        .await
        .unwrap();
    assert_eq!(ids(&incoming), ["u1"]);

    store.backend().accept_request("u2", "u1").await.unwrap();
    store.initialize("u1").await.unwrap();
    let state = store.state();
    assert_eq!(ids(&state.friends), ["u2"]);
    assert!(state.outgoing_requests.is_empty());
}

#[tokio::test]
async fn http_backend_maps_error_codes() {
    let (store, _addr) = http_store().await;
    store.send_request("u1", "u2").await.unwrap();

    let err = store.send_request("u1", "u2").await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::DuplicateRequest));
    assert_eq!(
        store.state().error.as_deref(),
        Some("Friend request already sent")
    );

    let err = store.backend().send_request("", "u2").await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));

    // Accepting twice is benign.
    store.backend().accept_request("u2", "u1").await.unwrap();
    let second = FriendsStore::new(store.backend().clone());
    second.accept_request("u2", "u1").await.unwrap();
    assert_eq!(ids(&second.state().friends), ["u1"]);
}
