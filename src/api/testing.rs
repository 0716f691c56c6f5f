//! Scripted stand-in for the inventory backend, shared by unit tests.
//!
//! Protected routes accept exactly one access token at a time. The refresh
//! endpoint rotates the pair (`access-N` / `refresh-N`) after a short delay,
//! long enough for a burst of concurrent requests to pile up behind it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use super::auth::{CredentialPair, CredentialStore, StoreError};
use super::client::ApiClient;
use super::error::ApiError;
use super::transport::{OutgoingRequest, RawResponse, Transport};

type Handler = Box<dyn Fn(&OutgoingRequest) -> RawResponse + Send + Sync>;

const PUBLIC_PATHS: [&str; 3] = ["/auth/login", "/auth/register", "/auth/refresh"];

pub(crate) struct MockServer {
    valid_access: Mutex<String>,
    valid_refresh: Mutex<String>,
    routes: Mutex<HashMap<String, Handler>>,
    log: Mutex<Vec<OutgoingRequest>>,
    refresh_calls: AtomicU32,
    refresh_status: AtomicU16,
    offline: AtomicBool,
    reject_every_token: AtomicBool,
    refresh_delay: Duration,
}

impl MockServer {
    /// A server that accepts `access-0` and refreshes from `refresh-0`.
    pub fn new() -> Self {
        Self {
            valid_access: Mutex::new("access-0".to_string()),
            valid_refresh: Mutex::new("refresh-0".to_string()),
            routes: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            refresh_calls: AtomicU32::new(0),
            refresh_status: AtomicU16::new(200),
            offline: AtomicBool::new(false),
            reject_every_token: AtomicBool::new(false),
            refresh_delay: Duration::from_millis(20),
        }
    }

    /// Register a fixed response for `METHOD /path`.
    pub fn route(&self, method: Method, path: &str, status: u16, body: Option<Value>) {
        self.handle(method, path, move |_| RawResponse {
            status,
            body: body.clone(),
        });
    }

    /// Register a response computed from the request.
    pub fn handle<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&OutgoingRequest) -> RawResponse + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), Box::new(handler));
    }

    pub fn set_valid_access(&self, token: &str) {
        *self.valid_access.lock().unwrap() = token.to_string();
    }

    pub fn set_refresh_status(&self, status: u16) {
        self.refresh_status.store(status, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn reject_every_token(&self) {
        self.reject_every_token.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Requests received for one path (query string excluded).
    pub fn requests_to(&self, path: &str) -> Vec<OutgoingRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    async fn refresh(&self, request: &OutgoingRequest) -> RawResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.refresh_delay).await;

        let status = self.refresh_status.load(Ordering::SeqCst);
        if status != 200 {
            return error_response(status, "Refresh token expired");
        }

        let presented = request
            .body
            .as_ref()
            .and_then(|b| b["refreshToken"].as_str())
            .unwrap_or_default()
            .to_string();
        let mut valid_refresh = self.valid_refresh.lock().unwrap();
        if presented != *valid_refresh {
            return error_response(401, "Invalid refresh token");
        }

        let n = self.refresh_calls.load(Ordering::SeqCst);
        let access = format!("access-{}", n);
        let refresh = format!("refresh-{}", n);
        *self.valid_access.lock().unwrap() = access.clone();
        *valid_refresh = refresh.clone();
        RawResponse {
            status: 200,
            body: Some(json!({
                "message": "Token refreshed",
                "accessToken": access,
                "refreshToken": refresh,
            })),
        }
    }
}

impl Transport for MockServer {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, ApiError> {
        self.log.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::network("Network error: connection refused"));
        }

        if request.method == Method::POST && request.path == "/auth/refresh" {
            return Ok(self.refresh(request).await);
        }

        if !PUBLIC_PATHS.contains(&request.path.as_str()) {
            let valid = self.valid_access.lock().unwrap().clone();
            let authorized = !self.reject_every_token.load(Ordering::SeqCst)
                && request.bearer.as_deref() == Some(valid.as_str());
            if !authorized {
                return Ok(error_response(401, "Token expired"));
            }
        }

        let key = format!("{} {}", request.method, request.path);
        let routes = self.routes.lock().unwrap();
        Ok(match routes.get(&key) {
            Some(handler) => handler(request),
            None => error_response(404, "Not found"),
        })
    }
}

/// Process-local credential store.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pair: Mutex<Option<CredentialPair>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        let guard = self.pair.lock().unwrap();
        Ok(guard.clone().filter(CredentialPair::is_complete))
    }

    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        *self.pair.lock().unwrap() = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.pair.lock().unwrap() = None;
        Ok(())
    }
}

pub(crate) fn error_response(status: u16, message: &str) -> RawResponse {
    RawResponse {
        status,
        body: Some(json!({ "error": "Error", "message": message })),
    }
}

/// Client over a fresh mock server, with `pair` stored if given.
pub(crate) fn client_with(
    pair: Option<CredentialPair>,
) -> (ApiClient<MockServer>, Arc<MemoryStore>) {
    let store = Arc::new(match pair {
        Some(pair) => MemoryStore::with_pair(pair),
        None => MemoryStore::new(),
    });
    let client = ApiClient::new(MockServer::new(), store.clone() as Arc<dyn CredentialStore>);
    (client, store)
}

pub(crate) fn product_json(id: &str, nombre: &str, precio: f64, vence: &str) -> Value {
    json!({
        "id": id,
        "nombre": nombre,
        "descripcion": "",
        "precio": precio,
        "fechaVencimiento": vence,
        "fechaElaboracion": "2023-01-01",
    })
}

pub(crate) fn user_json(role: &str) -> Value {
    json!({
        "id": "user-001",
        "nombre": "Dr. Ana Torres",
        "email": "a.torres@example.com",
        "role": role,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z",
    })
}
