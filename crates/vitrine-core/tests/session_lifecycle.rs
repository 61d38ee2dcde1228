//! End-to-end session lifecycle against a fake backend and an on-disk store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use vitrine_core::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};
use vitrine_core::{
    Config, DispatchError, FileStore, HttpResponse, KeyValueStore, OutboundRequest,
    SessionManager, SessionState, Transport, TransportError,
};

/// Backend that issues tokens, can expire the first access token, and can be
/// taken offline as a whole or for the refresh endpoint only.
#[derive(Default)]
struct FakeBackend {
    offline: AtomicBool,
    refresh_offline: AtomicBool,
    access_expired: AtomicBool,
    log: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeBackend {
    fn calls_to(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|(url, _)| url == path).count()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
        let auth = request.header_value("Authorization").map(str::to_string);
        self.log.lock().unwrap().push((request.url.clone(), auth.clone()));

        let refresh_down =
            request.url == "/api/token/refresh/" && self.refresh_offline.load(Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) || refresh_down {
            return Err(TransportError::Network("connection refused".to_string()));
        }

        let response = match request.url.as_str() {
            "/api/usuarios/login/" => HttpResponse::with_json(
                200,
                &json!({"access": "access-1", "refresh": "refresh-1", "usuario": {"nome": "Ana"}}),
            ),
            "/api/token/refresh/" => HttpResponse::with_json(200, &json!({"access": "access-2"})),
            "/api/produtos/" => {
                let expired = self.access_expired.load(Ordering::SeqCst);
                match auth.as_deref() {
                    Some("Bearer access-1") if expired => HttpResponse::new(401, ""),
                    Some(_) => HttpResponse::with_json(200, &json!([{"id": 1, "nome": "Caneca"}])),
                    None => HttpResponse::new(401, ""),
                }
            }
            _ => HttpResponse::new(404, ""),
        };
        Ok(response)
    }
}

fn setup() -> (TempDir, Arc<FakeBackend>, Arc<FileStore>, SessionManager) {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(FakeBackend::default());
    let store = Arc::new(FileStore::new(dir.path().join("session.json")));
    let manager = SessionManager::new(Config::default(), backend.clone(), store.clone());
    (dir, backend, store, manager)
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (dir, backend, store, manager) = setup();
    assert_eq!(manager.state(), SessionState::Anonymous);

    manager.login("ana@loja.com", "Senh@123").await.unwrap();
    assert_eq!(manager.state(), SessionState::Authenticated);

    // A second handle on the same file sees the session, like another tab
    let other_tab = FileStore::new(dir.path().join("session.json"));
    assert_eq!(other_tab.get(ACCESS_TOKEN_KEY).as_deref(), Some("access-1"));

    backend.access_expired.store(true, Ordering::SeqCst);
    let response = manager.dispatch(OutboundRequest::get("/api/produtos/")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(backend.calls_to("/api/token/refresh/"), 1);
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("access-2"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));
    assert_eq!(store.get(USER_DATA_KEY).as_deref(), Some(r#"{"nome":"Ana"}"#));

    backend.offline.store(true, Ordering::SeqCst);
    manager.logout().await;
    assert_eq!(manager.state(), SessionState::Anonymous);
    assert_eq!(other_tab.get(ACCESS_TOKEN_KEY), None);
    assert_eq!(other_tab.get(REFRESH_TOKEN_KEY), None);
    assert_eq!(other_tab.get(USER_DATA_KEY), None);
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_token() {
    let (_dir, backend, _store, manager) = setup();

    let response = manager.dispatch(OutboundRequest::get("/api/produtos/")).await.unwrap();
    assert_eq!(response.status, 401);
    assert_eq!(backend.log.lock().unwrap()[0].1, None);
    assert_eq!(backend.calls_to("/api/token/refresh/"), 0);
}

#[tokio::test]
async fn test_unreachable_refresh_forces_sign_in() {
    let (_dir, backend, store, manager) = setup();
    manager.login("ana@loja.com", "Senh@123").await.unwrap();

    backend.access_expired.store(true, Ordering::SeqCst);
    backend.refresh_offline.store(true, Ordering::SeqCst);
    let result = manager.dispatch(OutboundRequest::get("/api/produtos/")).await;

    assert!(matches!(result, Err(DispatchError::AuthExpired)));
    assert_eq!(manager.state(), SessionState::Anonymous);
    assert_eq!(store.get(REFRESH_TOKEN_KEY), None);
    assert_eq!(backend.calls_to("/api/produtos/"), 1);
}
