//! Authentication endpoints.
//!
//! These calls only talk to the API; persisting the returned tokens is the
//! caller's decision (see `commands::login`).

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::Transport;
use super::types::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, User};

/// POST /auth/login
pub async fn login<T: Transport>(
    client: &ApiClient<T>,
    request: &LoginRequest,
) -> Result<AuthResponse, ApiError> {
    client.post("/auth/login", request).await
}

/// POST /auth/register
pub async fn register<T: Transport>(
    client: &ApiClient<T>,
    request: &RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    client.post("/auth/register", request).await
}

/// GET /auth/me
pub async fn me<T: Transport>(client: &ApiClient<T>) -> Result<User, ApiError> {
    let resp: MeResponse = client.get("/auth/me", Vec::new()).await?;
    Ok(resp.user)
}

/// POST /auth/logout (best-effort, a failure is logged and ignored).
pub async fn logout<T: Transport>(client: &ApiClient<T>) {
    if let Err(e) = client
        .request(reqwest::Method::POST, "/auth/logout", None, Vec::new())
        .await
    {
        log::warn!("Logout request failed (will continue local cleanup): {}", e);
    }
}
