//! Error type shared by every call that goes through the API client.
//!
//! The kind is decided once, at the HTTP boundary. Callers branch on
//! `ApiError::kind` and never dig through the server payload themselves.

use serde_json::Value;
use thiserror::Error;

use super::types::ApiErrorBody;

/// Classification of an API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response arrived (timeout, DNS or connection failure).
    Network,
    /// The server rejected the credentials, or none are available.
    Auth,
    /// Any other 4xx/5xx response.
    Server,
    /// The token refresh itself failed. Stored credentials are gone.
    RefreshFailure,
    /// The response body did not match the expected shape.
    Decode,
    /// The credential store could not be read or written.
    Storage,
    /// Rejected locally before any request was sent.
    Validation,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub http_status: Option<u16>,
    pub message: String,
    pub server_payload: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
            server_payload: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Wrap the error that made a token refresh fail.
    ///
    /// The HTTP status and payload of the underlying failure are kept so
    /// callers can still tell a rejected refresh token from an outage.
    pub fn refresh_failure(cause: &ApiError) -> Self {
        Self {
            kind: ErrorKind::RefreshFailure,
            http_status: cause.http_status,
            message: format!("Session refresh failed: {}", cause.message),
            server_payload: cause.server_payload.clone(),
        }
    }

    /// Build an error from a non-success HTTP response.
    ///
    /// 401 maps to `Auth`, everything else to `Server`. The message is the
    /// server's `message` field when the body carries one.
    pub fn from_status(status: u16, payload: Option<Value>) -> Self {
        let kind = if status == 401 {
            ErrorKind::Auth
        } else {
            ErrorKind::Server
        };
        let message = payload
            .as_ref()
            .and_then(|body| serde_json::from_value::<ApiErrorBody>(body.clone()).ok())
            .map(|body| body.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {}", status));

        Self {
            kind,
            http_status: Some(status),
            message,
            server_payload: payload,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// Field-level validation errors reported by the server, if any.
    pub fn field_errors(&self) -> Vec<(String, String)> {
        self.server_payload
            .as_ref()
            .and_then(|body| serde_json::from_value::<ApiErrorBody>(body.clone()).ok())
            .and_then(|body| body.errors)
            .map(|errors| errors.into_iter().map(|e| (e.field, e.message)).collect())
            .unwrap_or_default()
    }
}
