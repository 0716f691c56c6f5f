//! Request and response types for the inventory backend API.
//!
//! All structs use camelCase serialization to match the API's JSON format.
//! Spanish field names (`nombre`, `precio`, ...) are the API's own.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Role attached to every user account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub nombre: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

/// Login request body sent to POST /auth/login.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body sent to POST /auth/register.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// Response from POST /auth/login and POST /auth/register.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh request body sent to POST /auth/refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response from POST /auth/refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response from GET /auth/me.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

/// A medication in the inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(deserialize_with = "de_price")]
    pub precio: f64,
    #[serde(deserialize_with = "de_calendar_date")]
    pub fecha_vencimiento: NaiveDate,
    #[serde(deserialize_with = "de_calendar_date")]
    pub fecha_elaboracion: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            page: 1,
            limit: 10,
            total_pages: 0,
        }
    }
}

/// Response from GET /products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// Response from GET/POST/PUT on a single product.
#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub product: Product,
}

/// Body of POST /products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub nombre: String,
    pub descripcion: String,
    pub precio: f64,
    pub fecha_elaboracion: NaiveDate,
    pub fecha_vencimiento: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body of PUT /products/{id}. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_elaboracion: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_vencimiento: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl UpdateProductRequest {
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.descripcion.is_none()
            && self.precio.is_none()
            && self.fecha_elaboracion.is_none()
            && self.fecha_vencimiento.is_none()
            && self.image_url.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "nombre")]
    Nombre,
    #[serde(rename = "precio")]
    Precio,
    #[serde(rename = "fechaElaboracion")]
    FechaElaboracion,
    #[serde(rename = "fechaVencimiento")]
    FechaVencimiento,
    #[serde(rename = "createdAt")]
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Nombre => "nombre",
            SortField::Precio => "precio",
            SortField::FechaElaboracion => "fechaElaboracion",
            SortField::FechaVencimiento => "fechaVencimiento",
            SortField::CreatedAt => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filters and paging for GET /products.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl ProductQuery {
    /// Query-string pairs, omitting unset filters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(ref search) = self.search {
            if !search.is_empty() {
                params.push(("search".to_string(), search.clone()));
            }
        }
        if let Some(sort_by) = self.sort_by {
            params.push(("sortBy".to_string(), sort_by.as_str().to_string()));
        }
        if let Some(order) = self.order {
            params.push(("order".to_string(), order.as_str().to_string()));
        }
        params
    }
}

/// Counts returned by GET /dashboard/expiry-status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryStatus {
    pub expired: u64,
    pub expiring_soon: u64,
    pub valid: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryStatusResponse {
    pub expiry_status: ExpiryStatus,
}

/// One field-level validation error inside an error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error body returned by the API on 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            RawPrice::Number(n) => Ok(n),
            RawPrice::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| E::custom(format!("invalid price '{}'", s))),
        }
    }
}

/// Prices come back as JSON numbers, or as strings from DECIMAL columns.
pub(crate) fn de_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    RawPrice::deserialize(deserializer)?.into_f64()
}

/// Like `de_price`, with `null` mapping to `None`.
pub(crate) fn de_opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawPrice>::deserialize(deserializer)?
        .map(RawPrice::into_f64)
        .transpose()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (reduced to its UTC date).
pub(crate) fn de_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
}

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_deserialization() {
        let product: Product = serde_json::from_value(json!({
            "id": "med-001",
            "nombre": "Amoxicilina 500mg",
            "descripcion": "Antibiótico de amplio espectro.",
            "precio": 120.5,
            "fechaVencimiento": "2025-12-31",
            "fechaElaboracion": "2023-01-01"
        }))
        .unwrap();

        assert_eq!(product.precio, 120.5);
        assert_eq!(product.fecha_vencimiento, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(product.image_url.is_none());
    }

    #[test]
    fn test_product_accepts_string_price_and_timestamp() {
        let product: Product = serde_json::from_value(json!({
            "id": "med-002",
            "nombre": "Paracetamol 1g",
            "precio": "85.00",
            "fechaVencimiento": "2024-10-15T00:00:00.000Z",
            "fechaElaboracion": "2023-05-15",
            "imageUrl": "https://cdn.example.com/p.webp"
        }))
        .unwrap();

        assert_eq!(product.precio, 85.0);
        assert_eq!(product.fecha_vencimiento, NaiveDate::from_ymd_opt(2024, 10, 15).unwrap());
        assert_eq!(product.descripcion, "");
    }

    #[test]
    fn test_product_rejects_non_numeric_price() {
        let result = serde_json::from_value::<Product>(json!({
            "id": "x",
            "nombre": "x",
            "precio": "gratis",
            "fechaVencimiento": "2025-01-01",
            "fechaElaboracion": "2024-01-01"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_product_query_params() {
        let query = ProductQuery {
            page: Some(2),
            limit: Some(20),
            search: Some("ibu".to_string()),
            sort_by: Some(SortField::FechaVencimiento),
            order: Some(SortOrder::Desc),
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "20".to_string()),
                ("search".to_string(), "ibu".to_string()),
                ("sortBy".to_string(), "fechaVencimiento".to_string()),
                ("order".to_string(), "desc".to_string()),
            ]
        );
        assert!(ProductQuery::default().to_params().is_empty());
    }

    #[test]
    fn test_update_request_omits_absent_fields() {
        let req = UpdateProductRequest {
            precio: Some(99.9),
            ..Default::default()
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"precio":99.9}"#);
        assert!(!req.is_empty());
        assert!(UpdateProductRequest::default().is_empty());
    }

    #[test]
    fn test_create_request_serialization() {
        let req = CreateProductRequest {
            nombre: "Omeprazol 20mg".to_string(),
            descripcion: "Caja de 14 cápsulas.".to_string(),
            precio: 145.0,
            fecha_elaboracion: NaiveDate::from_ymd_opt(2023, 9, 5).unwrap(),
            fecha_vencimiento: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
            image_url: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"fechaElaboracion\":\"2023-09-05\""));
        assert!(json.contains("\"fechaVencimiento\":\"2026-03-30\""));
        assert!(!json.contains("imageUrl"));
    }

    #[test]
    fn test_register_request_role() {
        let req = RegisterRequest {
            nombre: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
            role: Some(UserRole::Admin),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"role\":\"admin\""));
    }
}
