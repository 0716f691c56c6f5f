//! Wire-level request execution.
//!
//! `Transport` sends one fully-formed request and reports what came back.
//! It knows nothing about tokens or refresh; that lives in `ApiClient`.

use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;

use super::error::ApiError;

/// Default request timeout (10 seconds).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A request as handed to the transport.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/products/med-001`.
    pub path: String,
    pub body: Option<Value>,
    pub params: Vec<(String, String)>,
    /// Access token for the `Authorization: Bearer` header.
    pub bearer: Option<String>,
    /// Set on replays so a second 401 is surfaced instead of refreshed again.
    pub retried: bool,
}

impl OutgoingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            params: Vec::new(),
            bearer: None,
            retried: false,
        }
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }
}

/// Status and decoded body of a response. `body` is `None` for empty bodies.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the remote API.
///
/// In production, `HttpTransport` implements this over reqwest.
/// In tests, a scripted implementation plays the server.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send the request. Only failures where no response arrived are errors;
    /// every HTTP status, 4xx/5xx included, comes back as `Ok`.
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, ApiError>;
}

/// reqwest-backed transport rooted at a base URL.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given base URL and request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        log::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| network_error(&e))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| network_error(&e))?;

        let body = if bytes.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Some(value),
                Err(e) if (200..300).contains(&status) => {
                    return Err(ApiError::decode(format!(
                        "Failed to parse response from {}: {}",
                        request.path, e
                    )));
                }
                // Error pages (proxies, HTML 502s) carry no usable payload
                Err(_) => None,
            }
        };

        log::debug!("{} {} -> {}", request.method, request.path, status);
        Ok(RawResponse { status, body })
    }
}

fn network_error(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::network(format!("Request timed out: {}", err))
    } else {
        ApiError::network(format!("Network error: {}", err))
    }
}
