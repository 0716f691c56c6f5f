//! Product catalog endpoints.

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::Transport;
use super::types::{
    CreateProductRequest, Product, ProductQuery, ProductResponse, ProductsResponse,
    UpdateProductRequest,
};

fn product_path(id: &str) -> String {
    format!("/products/{}", urlencoding::encode(id))
}

/// GET /products?page=&limit=&search=&sortBy=&order=
pub async fn list<T: Transport>(
    client: &ApiClient<T>,
    query: &ProductQuery,
) -> Result<ProductsResponse, ApiError> {
    client.get("/products", query.to_params()).await
}

/// GET /products/{id}
pub async fn get<T: Transport>(client: &ApiClient<T>, id: &str) -> Result<Product, ApiError> {
    let resp: ProductResponse = client.get(&product_path(id), Vec::new()).await?;
    Ok(resp.product)
}

/// POST /products
pub async fn create<T: Transport>(
    client: &ApiClient<T>,
    request: &CreateProductRequest,
) -> Result<Product, ApiError> {
    let resp: ProductResponse = client.post("/products", request).await?;
    Ok(resp.product)
}

/// PUT /products/{id}
pub async fn update<T: Transport>(
    client: &ApiClient<T>,
    id: &str,
    request: &UpdateProductRequest,
) -> Result<Product, ApiError> {
    let resp: ProductResponse = client.put(&product_path(id), request).await?;
    Ok(resp.product)
}

/// DELETE /products/{id} (204 No Content on success)
pub async fn delete<T: Transport>(client: &ApiClient<T>, id: &str) -> Result<(), ApiError> {
    client.delete(&product_path(id)).await
}
