//! API client module for the inventory backend.
//!
//! Provides the authenticated HTTP client with single-flight token refresh,
//! credential storage, and request/response types matching the backend API.
//! Resource modules (`session`, `products`, `dashboard`) wrap the endpoints.

pub mod auth;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod products;
pub mod refresh;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::CredentialStore;
pub use client::ApiClient;
pub use error::ApiError;
pub use transport::HttpTransport;
