//! Authenticated API client.
//!
//! Every request picks up the stored access token as a bearer header. A 401
//! on anything but the auth endpoints triggers one shared token refresh,
//! after which the request is replayed with the new token. A failed refresh
//! wipes the stored credentials and fails every request that was waiting on it.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::auth::{CredentialPair, CredentialStore};
use super::error::ApiError;
use super::refresh::{RefreshCoordinator, RefreshLease, RefreshTicket};
use super::transport::{HttpTransport, OutgoingRequest, RawResponse, Transport};
use super::types::{RefreshRequest, RefreshResponse};

/// Refresh endpoint, called with the stored refresh token.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Endpoints whose 401 means "bad credentials", never "expired token".
const NON_RENEWABLE_PATHS: [&str; 3] = ["/auth/login", "/auth/register", REFRESH_PATH];

/// HTTP client wrapper for the inventory API.
///
/// Owns the transport, a handle to the credential store, and the refresh
/// coordinator for this client instance.
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
    store: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            store,
            refresh: RefreshCoordinator::new(),
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current stored token pair, if any.
    pub fn credentials(&self) -> Result<Option<CredentialPair>, ApiError> {
        self.store
            .load()
            .map_err(|e| ApiError::storage(e.to_string()))
    }

    /// Persist a new token pair (after login or registration).
    pub fn set_credentials(&self, pair: &CredentialPair) -> Result<(), ApiError> {
        self.store
            .save(pair)
            .map_err(|e| ApiError::storage(e.to_string()))
    }

    /// Remove the stored token pair (logout).
    pub fn clear_credentials(&self) -> Result<(), ApiError> {
        self.store
            .clear()
            .map_err(|e| ApiError::storage(e.to_string()))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.credentials(), Ok(Some(_)))
    }

    /// Send a request and return the JSON body (`Value::Null` when empty).
    ///
    /// `path` and `body` are passed through untouched; `params` become the
    /// query string.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        params: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        let request = OutgoingRequest::new(method, path)
            .with_body(body)
            .with_params(params);
        self.execute(request).await
    }

    /// GET and decode the response.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<R, ApiError> {
        let value = self.request(Method::GET, path, None, params).await?;
        decode(path, value)
    }

    /// POST a JSON body and decode the response.
    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let value = self
            .request(Method::POST, path, Some(encode(body)?), Vec::new())
            .await?;
        decode(path, value)
    }

    /// PUT a JSON body and decode the response.
    pub async fn put<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let value = self
            .request(Method::PUT, path, Some(encode(body)?), Vec::new())
            .await?;
        decode(path, value)
    }

    /// DELETE, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, None, Vec::new())
            .await
            .map(|_| ())
    }

    async fn execute(&self, mut request: OutgoingRequest) -> Result<Value, ApiError> {
        request.bearer = self.stored_access_token();
        let resp = self.transport.send(&request).await?;

        if resp.status == 401 && is_renewable(&request) {
            let token = match self.stored_access_token() {
                // Renewed by another request since this one was sent
                Some(current) if request.bearer.as_deref() != Some(current.as_str()) => current,
                _ => {
                    log::info!("Access token rejected for {}, renewing session", request.path);
                    self.renew_access_token().await?
                }
            };
            request.bearer = Some(token);
            request.retried = true;
            let replayed = self.transport.send(&request).await?;
            return into_result(replayed);
        }

        into_result(resp)
    }

    /// Access token to attach, or `None` when unauthenticated.
    ///
    /// A store that cannot be read is treated as "no session" so the server
    /// answers with 401 rather than the request failing locally.
    fn stored_access_token(&self) -> Option<String> {
        match self.store.load() {
            Ok(pair) => pair.map(|p| p.access_token.clone()),
            Err(e) => {
                log::warn!("Failed to read stored credentials: {}", e);
                None
            }
        }
    }

    /// Obtain a fresh access token, either by leading the refresh or by
    /// waiting for the one already in flight.
    async fn renew_access_token(&self) -> Result<String, ApiError> {
        match self.refresh.acquire_or_wait() {
            RefreshTicket::Lead(lease) => self.lead_refresh(lease).await,
            RefreshTicket::Wait(rx) => match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ApiError::auth("Token refresh was abandoned")),
            },
        }
    }

    async fn lead_refresh(&self, lease: RefreshLease<'_>) -> Result<String, ApiError> {
        let refresh_token = match self.store.load() {
            Ok(Some(pair)) => pair.refresh_token.clone(),
            Ok(None) => {
                let err = ApiError::auth("No refresh token available");
                log::info!("Cannot renew session: no refresh token stored");
                lease.reject(&err);
                return Err(err);
            }
            Err(e) => {
                let err = ApiError::storage(e.to_string());
                lease.reject(&err);
                return Err(err);
            }
        };

        match self.call_refresh(refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.store.save(&pair) {
                    let err = ApiError::storage(format!("Failed to store renewed tokens: {}", e));
                    log::warn!("{}", err);
                    lease.reject(&err);
                    return Err(err);
                }
                log::info!(
                    "Session renewed, replaying {} queued request(s)",
                    self.refresh.pending()
                );
                let access_token = pair.access_token.clone();
                lease.resolve(&access_token);
                Ok(access_token)
            }
            Err(cause) => {
                let err = ApiError::refresh_failure(&cause);
                log::warn!("{}; clearing stored credentials", err);
                if let Err(e) = self.store.clear() {
                    log::warn!("Failed to clear stored credentials: {}", e);
                }
                lease.reject(&err);
                Err(err)
            }
        }
    }

    async fn call_refresh(&self, refresh_token: String) -> Result<CredentialPair, ApiError> {
        let body = encode(&RefreshRequest { refresh_token })?;
        let request = OutgoingRequest::new(Method::POST, REFRESH_PATH).with_body(Some(body));
        let value = into_result(self.transport.send(&request).await?)?;
        let resp: RefreshResponse = decode(REFRESH_PATH, value)?;
        Ok(CredentialPair::new(resp.access_token, resp.refresh_token))
    }
}

/// Whether a 401 on this request may be answered with a token refresh.
fn is_renewable(request: &OutgoingRequest) -> bool {
    if request.retried {
        return false;
    }
    let path = request.path.split('?').next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    !NON_RENEWABLE_PATHS.contains(&path)
}

fn into_result(resp: RawResponse) -> Result<Value, ApiError> {
    if resp.is_success() {
        Ok(resp.body.unwrap_or(Value::Null))
    } else {
        Err(ApiError::from_status(resp.status, resp.body))
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::decode(format!("Failed to encode request body: {}", e)))
}

fn decode<R: DeserializeOwned>(path: &str, value: Value) -> Result<R, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::decode(format!("Failed to parse response from {}: {}", path, e)))
}
