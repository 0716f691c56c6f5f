//! Application state for the inventory client.
//!
//! Holds the API client, the signed-in user, and the last catalog and
//! dashboard data loaded through it. Commands in `commands.rs` read and
//! update these fields; nothing here talks to the network.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::client::ApiClient;
use crate::api::transport::{HttpTransport, Transport};
use crate::api::types::{ExpiryStatus, Pagination, Product, User};
use crate::stats::InventoryStats;
use crate::status::ConnectionStatus;

/// State shared by all commands.
///
/// The `ApiClient` is shared via `Arc` so callers can issue raw requests
/// through the same refresh coordinator.
pub struct AppState<T: Transport = HttpTransport> {
    /// HTTP client for inventory API communication.
    pub api: Arc<ApiClient<T>>,

    /// Signed-in user, as last reported by the API.
    pub user: RwLock<Option<User>>,

    /// Current page of the product catalog.
    pub products: RwLock<Vec<Product>>,

    /// Paging info for `products`.
    pub pagination: RwLock<Pagination>,

    /// Product opened for detail view or editing.
    pub selected_product: RwLock<Option<Product>>,

    /// Last dashboard statistics.
    pub stats: RwLock<Option<InventoryStats>>,

    /// Last expiry breakdown.
    pub expiry_status: RwLock<Option<ExpiryStatus>>,

    /// Where the data above came from.
    pub status: RwLock<ConnectionStatus>,
}

impl<T: Transport> AppState<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api: Arc::new(api),
            user: RwLock::new(None),
            products: RwLock::new(Vec::new()),
            pagination: RwLock::new(Pagination::default()),
            selected_product: RwLock::new(None),
            stats: RwLock::new(None),
            expiry_status: RwLock::new(None),
            status: RwLock::new(ConnectionStatus::SignedOut),
        }
    }

    pub async fn set_status(&self, status: ConnectionStatus) {
        *self.status.write().await = status;
    }

    pub async fn current_status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    /// Forget the user and everything loaded on their behalf.
    ///
    /// Stored credentials are the API client's concern and are not touched.
    pub async fn clear_session(&self) {
        *self.user.write().await = None;
        self.products.write().await.clear();
        *self.pagination.write().await = Pagination::default();
        *self.selected_product.write().await = None;
        *self.stats.write().await = None;
        *self.expiry_status.write().await = None;
        *self.status.write().await = ConnectionStatus::SignedOut;
    }
}
