//! Commands behind the CLI: session, catalog and dashboard.
//!
//! Each command goes through the API client and records the outcome in
//! `AppState`. Reads that fail because the API is unreachable are answered
//! from the sample catalog instead, and the state switches to demo mode.
//! Mutations never fall back; they need the live API and the `admin` role.

use chrono::{DateTime, Utc};

use crate::api::auth::CredentialPair;
use crate::api::error::{ApiError, ErrorKind};
use crate::api::transport::Transport;
use crate::api::types::{
    AuthResponse, CreateProductRequest, ExpiryStatus, LoginRequest, Product, ProductQuery,
    ProductsResponse, RegisterRequest, UpdateProductRequest, User, UserRole,
};
use crate::api::{dashboard, products, session};
use crate::sample;
use crate::state::AppState;
use crate::stats::{self, InventoryStats};
use crate::status::ConnectionStatus;

// ── Session ───────────────────────────────────────────────────────────────────

/// Log in and persist the returned token pair.
pub async fn login<T: Transport>(
    state: &AppState<T>,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    log::info!("Logging in as {}", email);
    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let resp = session::login(&state.api, &request).await?;
    start_session(state, resp).await
}

/// Create an account and sign in with it.
pub async fn register<T: Transport>(
    state: &AppState<T>,
    request: &RegisterRequest,
) -> Result<User, ApiError> {
    log::info!("Registering {}", request.email);
    let resp = session::register(&state.api, request).await?;
    start_session(state, resp).await
}

async fn start_session<T: Transport>(
    state: &AppState<T>,
    resp: AuthResponse,
) -> Result<User, ApiError> {
    if let Some(ref message) = resp.message {
        log::debug!("Auth response: {}", message);
    }
    state
        .api
        .set_credentials(&CredentialPair::new(resp.access_token, resp.refresh_token))?;
    *state.user.write().await = Some(resp.user.clone());
    state.set_status(ConnectionStatus::Live).await;
    log::info!("Signed in as {} ({})", resp.user.email, resp.user.role.as_str());
    Ok(resp.user)
}

/// Logout: tell the API (best-effort), then drop tokens and session state.
pub async fn logout<T: Transport>(state: &AppState<T>) {
    log::info!("Logging out");
    if state.api.is_authenticated() {
        session::logout(&state.api).await;
    }
    if let Err(e) = state.api.clear_credentials() {
        log::warn!("Failed to clear stored credentials: {}", e);
    }
    state.clear_session().await;
    log::info!("Logout complete");
}

/// Resolve the signed-in user from stored tokens.
///
/// Returns `None` when no tokens are stored. If the API rejects the session,
/// the tokens are dropped. An unreachable API leaves them in place so the
/// session survives the outage.
pub async fn check_auth<T: Transport>(state: &AppState<T>) -> Result<Option<User>, ApiError> {
    if state.api.credentials()?.is_none() {
        *state.user.write().await = None;
        state.set_status(ConnectionStatus::SignedOut).await;
        return Ok(None);
    }

    match session::me(&state.api).await {
        Ok(user) => {
            *state.user.write().await = Some(user.clone());
            state.set_status(ConnectionStatus::Live).await;
            Ok(Some(user))
        }
        Err(e) if e.is_network() => {
            state.set_status(ConnectionStatus::Demo).await;
            Err(e)
        }
        Err(e) => {
            log::info!("Session check failed, clearing stored tokens: {}", e);
            if let Err(clear_err) = state.api.clear_credentials() {
                log::warn!("Failed to clear stored credentials: {}", clear_err);
            }
            state.clear_session().await;
            Ok(None)
        }
    }
}

/// Fail unless the signed-in user has `role`.
pub async fn require_role<T: Transport>(
    state: &AppState<T>,
    role: UserRole,
) -> Result<User, ApiError> {
    let cached = state.user.read().await.clone();
    let user = match cached {
        Some(user) => user,
        None => check_auth(state)
            .await?
            .ok_or_else(|| ApiError::auth("Not signed in"))?,
    };

    if user.role != role {
        let mut err = ApiError::auth(format!(
            "This action requires the '{}' role",
            role.as_str()
        ));
        err.http_status = Some(403);
        return Err(err);
    }
    Ok(user)
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Load a page of the catalog into state.
pub async fn fetch_products<T: Transport>(
    state: &AppState<T>,
    query: &ProductQuery,
) -> Result<ProductsResponse, ApiError> {
    let resp = match products::list(&state.api, query).await {
        Ok(resp) => {
            state.set_status(ConnectionStatus::Live).await;
            resp
        }
        Err(e) if e.is_network() => {
            log::warn!("Product list unavailable ({}), using sample data", e);
            state.set_status(ConnectionStatus::Demo).await;
            sample::query_products(&sample::sample_products(), query)
        }
        Err(e) => return Err(note_failure(state, e).await),
    };

    *state.products.write().await = resp.products.clone();
    *state.pagination.write().await = resp.pagination;
    Ok(resp)
}

/// Load one product and select it.
pub async fn fetch_product<T: Transport>(
    state: &AppState<T>,
    id: &str,
) -> Result<Product, ApiError> {
    let product = match products::get(&state.api, id).await {
        Ok(product) => {
            state.set_status(ConnectionStatus::Live).await;
            product
        }
        Err(e) if e.is_network() => {
            let found = sample::sample_products().into_iter().find(|p| p.id == id);
            match found {
                Some(product) => {
                    log::warn!("Product {} unavailable ({}), using sample data", id, e);
                    state.set_status(ConnectionStatus::Demo).await;
                    product
                }
                None => return Err(note_failure(state, e).await),
            }
        }
        Err(e) => return Err(note_failure(state, e).await),
    };

    *state.selected_product.write().await = Some(product.clone());
    Ok(product)
}

/// Create a product and put it at the top of the loaded list.
pub async fn create_product<T: Transport>(
    state: &AppState<T>,
    request: &CreateProductRequest,
) -> Result<Product, ApiError> {
    require_role(state, UserRole::Admin).await?;

    let product = match products::create(&state.api, request).await {
        Ok(product) => product,
        Err(e) => return Err(note_failure(state, e).await),
    };
    log::info!("Created product {} ({})", product.nombre, product.id);

    state.products.write().await.insert(0, product.clone());
    state.set_status(ConnectionStatus::Live).await;
    Ok(product)
}

/// Update a product and refresh every loaded copy of it.
pub async fn update_product<T: Transport>(
    state: &AppState<T>,
    id: &str,
    request: &UpdateProductRequest,
) -> Result<Product, ApiError> {
    require_role(state, UserRole::Admin).await?;
    if request.is_empty() {
        return Err(ApiError::validation("Nothing to update"));
    }

    let updated = match products::update(&state.api, id, request).await {
        Ok(product) => product,
        Err(e) => return Err(note_failure(state, e).await),
    };
    log::info!("Updated product {}", id);

    for product in state.products.write().await.iter_mut() {
        if product.id == id {
            *product = updated.clone();
        }
    }
    let mut selected = state.selected_product.write().await;
    if selected.as_ref().is_some_and(|p| p.id == id) {
        *selected = Some(updated.clone());
    }
    drop(selected);

    state.set_status(ConnectionStatus::Live).await;
    Ok(updated)
}

/// Delete a product and drop it from the loaded list.
pub async fn delete_product<T: Transport>(state: &AppState<T>, id: &str) -> Result<(), ApiError> {
    require_role(state, UserRole::Admin).await?;

    if let Err(e) = products::delete(&state.api, id).await {
        return Err(note_failure(state, e).await);
    }
    log::info!("Deleted product {}", id);

    state.products.write().await.retain(|p| p.id != id);
    let mut selected = state.selected_product.write().await;
    if selected.as_ref().is_some_and(|p| p.id == id) {
        *selected = None;
    }
    drop(selected);

    state.set_status(ConnectionStatus::Live).await;
    Ok(())
}

// ── Dashboard ─────────────────────────────────────────────────────────────────

/// Load dashboard statistics; offline, compute them from the sample catalog.
pub async fn fetch_stats<T: Transport>(
    state: &AppState<T>,
    now: DateTime<Utc>,
) -> Result<InventoryStats, ApiError> {
    let stats = match dashboard::stats(&state.api).await {
        Ok(stats) => {
            state.set_status(ConnectionStatus::Live).await;
            stats
        }
        Err(e) if e.is_network() => {
            log::warn!("Dashboard stats unavailable ({}), computing from sample data", e);
            state.set_status(ConnectionStatus::Demo).await;
            stats::compute_inventory_stats(&sample::sample_products(), now)
        }
        Err(e) => return Err(note_failure(state, e).await),
    };

    *state.stats.write().await = Some(stats.clone());
    Ok(stats)
}

/// Load the expiry breakdown; offline, compute it from the sample catalog.
pub async fn fetch_expiry_status<T: Transport>(
    state: &AppState<T>,
    now: DateTime<Utc>,
) -> Result<ExpiryStatus, ApiError> {
    let status = match dashboard::expiry_status(&state.api).await {
        Ok(status) => {
            state.set_status(ConnectionStatus::Live).await;
            status
        }
        Err(e) if e.is_network() => {
            log::warn!("Expiry status unavailable ({}), computing from sample data", e);
            state.set_status(ConnectionStatus::Demo).await;
            stats::compute_expiry_status(&sample::sample_products(), now)
        }
        Err(e) => return Err(note_failure(state, e).await),
    };

    *state.expiry_status.write().await = Some(status);
    Ok(status)
}

/// Load stats and expiry status together.
pub async fn refresh_dashboard<T: Transport>(
    state: &AppState<T>,
    now: DateTime<Utc>,
) -> Result<(InventoryStats, ExpiryStatus), ApiError> {
    let (stats, expiry) = tokio::join!(fetch_stats(state, now), fetch_expiry_status(state, now));
    Ok((stats?, expiry?))
}

/// Record a failed call in state and hand the error back.
///
/// A failed token refresh means the session is over.
async fn note_failure<T: Transport>(state: &AppState<T>, err: ApiError) -> ApiError {
    match err.kind {
        ErrorKind::RefreshFailure => {
            log::info!("Session expired: {}", err);
            state.clear_session().await;
        }
        ErrorKind::Network => state.set_status(ConnectionStatus::Demo).await,
        _ => state.set_status(ConnectionStatus::Error(err.message.clone())).await,
    }
    err
}
