mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeGateway, PASSWORD, UUID, spawn_gateway, token_expiring_in};
use progres_session::{
    MemoryTokenStore, PersistedSession, SessionConfig, SessionError, SessionManager, TokenStore,
};
use serde_json::json;

async fn setup() -> (Arc<FakeGateway>, Arc<MemoryTokenStore>, SessionManager) {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::new(base_url, store.clone()).unwrap();
    (gateway, store, manager)
}

#[tokio::test]
async fn test_login_persists_session_and_schedules_renewal() {
    let (_gateway, store, manager) = setup().await;

    let session = manager.login("202031234567", PASSWORD).await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.uuid.as_deref(), Some(UUID));
    assert!(session.expires_at.is_some());
    assert!(manager.is_renewal_scheduled());

    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.token, session.access_token);
    assert_eq!(persisted.student_data.unwrap()[0]["id"], 4512);
    assert!(persisted.refresh_cookie.unwrap().starts_with("refresh_token=r"));
}

#[tokio::test]
async fn test_login_failure_surfaces_server_message() {
    let (_gateway, store, manager) = setup().await;

    let err = manager.login("202031234567", "wrong").await.unwrap_err();

    match err {
        SessionError::Api { status, message } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!manager.is_authenticated());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let (gateway, _store, manager) = setup().await;
    manager.login("u", PASSWORD).await.unwrap();
    gateway.refresh_delay_ms.store(100, Ordering::SeqCst);

    let (a, b, c, d) = tokio::join!(
        manager.refresh(),
        manager.refresh(),
        manager.refresh(),
        manager.refresh()
    );

    assert_eq!(gateway.refresh_count(), 1);
    let token = a.unwrap();
    assert_eq!(b.as_deref(), Some(token.as_str()));
    assert_eq!(c.as_deref(), Some(token.as_str()));
    assert_eq!(d.as_deref(), Some(token.as_str()));
    assert_eq!(manager.token(), Some(token));
}

#[tokio::test]
async fn test_unauthorized_response_triggers_refresh_and_single_retry() {
    let (gateway, _store, manager) = setup().await;
    manager.login("u", PASSWORD).await.unwrap();
    let before = manager.token();
    gateway.revoke_current_token();

    let registrations = manager.registrations().await.unwrap();

    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].card_id().as_deref(), Some("4512"));
    assert_eq!(gateway.refresh_count(), 1);
    assert_ne!(manager.token(), before);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_sending() {
    let (gateway, _store, manager) = setup().await;
    gateway.login_lifetime.store(-60, Ordering::SeqCst);
    manager.login("u", PASSWORD).await.unwrap();

    let registrations = manager.registrations().await.unwrap();

    assert_eq!(registrations.len(), 1);
    assert_eq!(gateway.refresh_count(), 1);
}

#[tokio::test]
async fn test_failed_refresh_forces_logout() {
    let (gateway, store, manager) = setup().await;
    gateway.login_lifetime.store(-60, Ordering::SeqCst);
    manager.login("u", PASSWORD).await.unwrap();
    gateway.refresh_fails.store(true, Ordering::SeqCst);

    let err = manager.registrations().await.unwrap_err();

    assert!(matches!(err, SessionError::SessionExpired));
    assert!(!manager.is_authenticated());
    assert!(!manager.is_renewal_scheduled());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_init_restores_valid_session_without_network() {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let token = token_expiring_in(3600, 0);
    let store = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: Some(token.clone()),
        uuid: Some(UUID.to_string()),
        student_data: Some(json!([{ "id": 1 }])),
        refresh_cookie: None,
    }));
    let manager = SessionManager::new(base_url, store).unwrap();

    assert!(manager.init().await.unwrap());
    assert_eq!(manager.token(), Some(token));
    assert!(manager.is_renewal_scheduled());
    assert_eq!(gateway.refresh_count(), 0);
}

#[tokio::test]
async fn test_init_refreshes_expired_token_with_persisted_cookie() {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: Some(token_expiring_in(-60, 0)),
        uuid: Some(UUID.to_string()),
        student_data: Some(json!([])),
        refresh_cookie: Some("refresh_token=r1".to_string()),
    }));
    let manager = SessionManager::new(base_url, store.clone()).unwrap();

    assert!(manager.init().await.unwrap());
    assert_eq!(gateway.refresh_count(), 1);
    assert_eq!(store.load().unwrap().unwrap().token, manager.token());
}

#[tokio::test]
async fn test_init_clears_storage_when_refresh_fails() {
    let gateway = FakeGateway::new();
    gateway.refresh_fails.store(true, Ordering::SeqCst);
    let base_url = spawn_gateway(gateway.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: Some(token_expiring_in(-60, 0)),
        uuid: Some(UUID.to_string()),
        student_data: Some(json!([])),
        refresh_cookie: Some("refresh_token=r1".to_string()),
    }));
    let manager = SessionManager::new(base_url, store.clone()).unwrap();

    assert!(!manager.init().await.unwrap());
    assert!(!manager.is_authenticated());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_init_requires_token_and_student_data() {
    let base_url = spawn_gateway(FakeGateway::new()).await;
    let store = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: Some(token_expiring_in(3600, 0)),
        uuid: Some(UUID.to_string()),
        student_data: None,
        refresh_cookie: None,
    }));
    let manager = SessionManager::new(base_url, store).unwrap();

    assert!(!manager.init().await.unwrap());
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_background_renewal_refreshes_before_expiry() {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let mut config = SessionConfig::new(base_url);
    config.renewal_lead = Duration::from_secs(7200);
    config.min_renewal_delay = Duration::from_millis(50);
    let manager = SessionManager::with_config(config, Arc::new(MemoryTokenStore::new())).unwrap();

    manager.login("u", PASSWORD).await.unwrap();
    let first = manager.token();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(gateway.refresh_count() >= 1);
    assert!(manager.is_authenticated());
    assert_ne!(manager.token(), first);
}

#[tokio::test]
async fn test_background_renewal_failure_logs_out() {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let mut config = SessionConfig::new(base_url);
    config.renewal_lead = Duration::from_secs(7200);
    config.min_renewal_delay = Duration::from_millis(50);
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::with_config(config, store.clone()).unwrap();

    manager.login("u", PASSWORD).await.unwrap();
    gateway.refresh_fails.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!manager.is_authenticated());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let (gateway, store, manager) = setup().await;
    manager.login("u", PASSWORD).await.unwrap();

    manager.logout().await;

    assert_eq!(gateway.logout_calls.load(Ordering::SeqCst), 1);
    assert!(!manager.is_authenticated());
    assert!(!manager.is_renewal_scheduled());
    assert!(store.load().unwrap().is_none());
}

fn renewal_config(base_url: String, min_delay_ms: u64) -> SessionConfig {
    let mut config = SessionConfig::new(base_url);
    config.renewal_lead = Duration::from_secs(7200);
    config.min_renewal_delay = Duration::from_millis(min_delay_ms);
    config
}

#[tokio::test]
async fn test_logout_discards_in_flight_refresh() {
    let (gateway, store, manager) = setup().await;
    manager.login("u", PASSWORD).await.unwrap();
    gateway.refresh_delay_ms.store(150, Ordering::SeqCst);

    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    manager.logout().await;

    assert_eq!(pending.await.unwrap(), None);
    assert_eq!(gateway.refresh_count(), 1);
    assert!(!manager.is_authenticated());
    assert!(!manager.is_renewal_scheduled());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_stale_refresh_keeps_new_login() {
    let (gateway, store, manager) = setup().await;
    manager.login("u", PASSWORD).await.unwrap();
    gateway.refresh_delay_ms.store(150, Ordering::SeqCst);

    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    manager.logout().await;
    let session = manager.login("u", PASSWORD).await.unwrap();

    assert_eq!(pending.await.unwrap(), None);
    assert!(manager.is_authenticated());
    assert_eq!(manager.token(), session.access_token);
    assert_eq!(store.load().unwrap().unwrap().token, session.access_token);
}

#[tokio::test]
async fn test_logout_during_background_renewal() {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::with_config(renewal_config(base_url, 50), store.clone()).unwrap();

    manager.login("u", PASSWORD).await.unwrap();
    gateway.refresh_delay_ms.store(200, Ordering::SeqCst);
    // The renewal fires at ~50ms and waits on the gateway until ~250ms.
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.logout().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(gateway.refresh_count(), 1);
    assert!(!manager.is_authenticated());
    assert!(!manager.is_renewal_scheduled());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_rescheduling_replaces_pending_renewal() {
    let gateway = FakeGateway::new();
    let base_url = spawn_gateway(gateway.clone()).await;
    let manager =
        SessionManager::with_config(renewal_config(base_url, 300), Arc::new(MemoryTokenStore::new()))
            .unwrap();

    // First timer due at ~300ms.
    manager.login("u", PASSWORD).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    // Replacement due at ~450ms.
    manager.schedule_renewal(&manager.token().unwrap());

    tokio::time::sleep(Duration::from_millis(225)).await;
    assert_eq!(gateway.refresh_count(), 0);
    assert!(manager.is_renewal_scheduled());

    tokio::time::sleep(Duration::from_millis(225)).await;
    assert_eq!(gateway.refresh_count(), 1);
}

#[tokio::test]
async fn test_send_requires_session() {
    let (_gateway, _store, manager) = setup().await;
    let err = manager.registrations().await.unwrap_err();
    assert!(matches!(err, SessionError::NotAuthenticated));
}

#[tokio::test]
async fn test_typed_fetchers_map_bodies_and_errors() {
    let (gateway, _store, manager) = setup().await;
    manager.login("u", PASSWORD).await.unwrap();

    assert!(manager.cc_grades("4512").await.unwrap().is_empty());
    assert_eq!(manager.photo().await.unwrap().as_deref(), Some("aGVsbG8="));
    gateway.photo_missing.store(true, Ordering::SeqCst);
    assert_eq!(manager.photo().await.unwrap(), None);

    let err = manager.exam_reports("4512").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch exam data: 500");

    let err = manager.exam_grades("999").await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));
    assert_eq!(
        err.to_string(),
        "Access denied: You can only access your own academic records"
    );
}
