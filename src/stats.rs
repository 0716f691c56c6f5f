//! Inventory statistics derived from a product snapshot.
//!
//! Pure functions of `(products, now)`. The reference instant is always passed
//! in so the same snapshot gives the same answer in tests and in demo mode.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::types::{de_calendar_date, de_opt_price, de_price, ExpiryStatus, Product};

/// Window, in days, in which a product counts as expiring soon.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

const MS_PER_DAY: i64 = 86_400_000;

/// A product listed on the dashboard because it has expired or is about to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringProduct {
    pub id: String,
    pub nombre: String,
    #[serde(deserialize_with = "de_calendar_date")]
    pub fecha_vencimiento: NaiveDate,
    /// Whole days until expiry, rounded up. Negative once expired.
    pub days_until_expiry: i64,
}

impl ExpiringProduct {
    /// Days past expiry, for "N days overdue" style messages.
    pub fn days_overdue(&self) -> i64 {
        (-self.days_until_expiry).max(0)
    }

    /// One-line status, e.g. `Paracetamol 1g: 12 days overdue`.
    pub fn summary(&self) -> String {
        let when = match self.days_until_expiry {
            1 => "expires in 1 day".to_string(),
            d if d > 1 => format!("expires in {} days", d),
            _ => match self.days_overdue() {
                0 => "due today".to_string(),
                1 => "1 day overdue".to_string(),
                n => format!("{} days overdue", n),
            },
        };
        format!("{}: {}", self.nombre, when)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_products: u64,
    #[serde(deserialize_with = "de_price")]
    pub total_inventory_value: f64,
    /// `None` when there are no products to average over.
    #[serde(default, deserialize_with = "de_opt_price")]
    pub average_price: Option<f64>,
    pub expired_products: u64,
    #[serde(default)]
    pub expired_products_list: Vec<ExpiringProduct>,
    pub expiring_products: u64,
    #[serde(default)]
    pub expiring_products_list: Vec<ExpiringProduct>,
}

/// Where a product stands relative to `now`. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryClass {
    /// Expiry instant is before `now`.
    Expired,
    /// Expiry instant is within `[now, now + 30 days]`.
    ExpiringSoon,
    Valid,
}

/// An expiry date takes effect at midnight UTC of that date.
pub fn expiry_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `ceil((expiry - now) / 1 day)`.
pub fn days_until_expiry(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let diff_ms = (expiry_instant(date) - now).num_milliseconds();
    let days = diff_ms / MS_PER_DAY;
    if diff_ms % MS_PER_DAY > 0 {
        days + 1
    } else {
        days
    }
}

pub fn classify(date: NaiveDate, now: DateTime<Utc>) -> ExpiryClass {
    let expiry = expiry_instant(date);
    if expiry < now {
        ExpiryClass::Expired
    } else if expiry <= now + Duration::days(EXPIRY_WARNING_DAYS) {
        ExpiryClass::ExpiringSoon
    } else {
        ExpiryClass::Valid
    }
}

/// Dashboard aggregates for `products` as of `now`.
///
/// Both lists are ordered by `days_until_expiry`, most urgent first.
pub fn compute_inventory_stats(products: &[Product], now: DateTime<Utc>) -> InventoryStats {
    let total_products = products.len() as u64;
    let total_inventory_value: f64 = products.iter().map(|p| p.precio).sum();
    let average_price = if products.is_empty() {
        None
    } else {
        Some(total_inventory_value / products.len() as f64)
    };

    let mut expired = Vec::new();
    let mut expiring = Vec::new();
    for product in products {
        let target = match classify(product.fecha_vencimiento, now) {
            ExpiryClass::Expired => &mut expired,
            ExpiryClass::ExpiringSoon => &mut expiring,
            ExpiryClass::Valid => continue,
        };
        target.push(ExpiringProduct {
            id: product.id.clone(),
            nombre: product.nombre.clone(),
            fecha_vencimiento: product.fecha_vencimiento,
            days_until_expiry: days_until_expiry(product.fecha_vencimiento, now),
        });
    }
    expired.sort_by_key(|p| p.days_until_expiry);
    expiring.sort_by_key(|p| p.days_until_expiry);

    InventoryStats {
        total_products,
        total_inventory_value,
        average_price,
        expired_products: expired.len() as u64,
        expired_products_list: expired,
        expiring_products: expiring.len() as u64,
        expiring_products_list: expiring,
    }
}

/// Expired / expiring-soon / valid counts for `products` as of `now`.
pub fn compute_expiry_status(products: &[Product], now: DateTime<Utc>) -> ExpiryStatus {
    let mut status = ExpiryStatus {
        expired: 0,
        expiring_soon: 0,
        valid: 0,
    };
    for product in products {
        match classify(product.fecha_vencimiento, now) {
            ExpiryClass::Expired => status.expired += 1,
            ExpiryClass::ExpiringSoon => status.expiring_soon += 1,
            ExpiryClass::Valid => status.valid += 1,
        }
    }
    status
}
