//! Dashboard endpoints.

use serde::Deserialize;

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::Transport;
use super::types::{ExpiryStatus, ExpiryStatusResponse};
use crate::stats::InventoryStats;

#[derive(Debug, Deserialize)]
struct StatsResponse {
    stats: InventoryStats,
}

/// GET /dashboard/stats
pub async fn stats<T: Transport>(client: &ApiClient<T>) -> Result<InventoryStats, ApiError> {
    let resp: StatsResponse = client.get("/dashboard/stats", Vec::new()).await?;
    Ok(resp.stats)
}

/// GET /dashboard/expiry-status
pub async fn expiry_status<T: Transport>(client: &ApiClient<T>) -> Result<ExpiryStatus, ApiError> {
    let resp: ExpiryStatusResponse = client.get("/dashboard/expiry-status", Vec::new()).await?;
    Ok(resp.expiry_status)
}
