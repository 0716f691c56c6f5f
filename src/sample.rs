//! Built-in sample data served in demo mode, when the API is unreachable.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::api::types::{Pagination, Product, ProductQuery, ProductsResponse, SortField, SortOrder};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn sample(id: &str, nombre: &str, descripcion: &str, precio: f64, vence: NaiveDate, elaborado: NaiveDate) -> Product {
    Product {
        id: id.to_string(),
        nombre: nombre.to_string(),
        descripcion: descripcion.to_string(),
        precio,
        fecha_vencimiento: vence,
        fecha_elaboracion: elaborado,
        image_url: None,
    }
}

/// The sample catalog.
pub fn sample_products() -> Vec<Product> {
    vec![
        sample(
            "med-001",
            "Amoxicilina 500mg",
            "Antibiótico de amplio espectro. Caja de 30 cápsulas.",
            120.5,
            date(2025, 12, 31),
            date(2023, 1, 1),
        ),
        sample(
            "med-002",
            "Paracetamol 1g",
            "Analgésico y antipirético. Caja de 20 comprimidos.",
            85.0,
            date(2024, 10, 15),
            date(2023, 5, 15),
        ),
        sample(
            "med-003",
            "Jarabe Antigripal",
            "Alivio de síntomas de la gripe. Botella de 150ml.",
            210.0,
            date(2026, 1, 20),
            date(2023, 7, 10),
        ),
        sample(
            "med-004",
            "Ibuprofeno 400mg",
            "Antiinflamatorio no esteroideo. Caja de 24 comprimidos.",
            95.5,
            date(2025, 8, 15),
            date(2023, 3, 22),
        ),
        sample(
            "med-005",
            "Omeprazol 20mg",
            "Inhibidor de bomba de protones. Caja de 14 cápsulas.",
            145.0,
            date(2026, 3, 30),
            date(2023, 9, 5),
        ),
    ]
}

/// Apply a catalog query to a local product list the way the API does:
/// case-insensitive search on name and description, then sort, then page.
pub fn query_products(products: &[Product], query: &ProductQuery) -> ProductsResponse {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut matched: Vec<Product> = products
        .iter()
        .filter(|p| match needle {
            Some(ref n) => {
                p.nombre.to_lowercase().contains(n) || p.descripcion.to_lowercase().contains(n)
            }
            None => true,
        })
        .cloned()
        .collect();

    if let Some(field) = query.sort_by {
        matched.sort_by(|a, b| compare(a, b, field));
        if query.order == Some(SortOrder::Desc) {
            matched.reverse();
        }
    }

    let limit = query.limit.filter(|l| *l > 0).unwrap_or(10);
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let total = matched.len() as u64;
    let total_pages = total.div_ceil(limit as u64) as u32;

    let start = ((page - 1) as usize).saturating_mul(limit as usize);
    let products = matched
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    ProductsResponse {
        products,
        pagination: Pagination {
            total,
            page,
            limit,
            total_pages,
        },
    }
}

fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    match field {
        SortField::Nombre => a.nombre.to_lowercase().cmp(&b.nombre.to_lowercase()),
        SortField::Precio => a.precio.total_cmp(&b.precio),
        SortField::FechaElaboracion => a.fecha_elaboracion.cmp(&b.fecha_elaboracion),
        SortField::FechaVencimiento => a.fecha_vencimiento.cmp(&b.fecha_vencimiento),
        // Sample products carry no creation time; keep catalog order
        SortField::CreatedAt => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(resp: &ProductsResponse) -> Vec<&str> {
        resp.products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_sample_catalog() {
        let products = sample_products();
        assert_eq!(products.len(), 5);
        assert!(products.iter().all(|p| p.precio > 0.0));
    }

    #[test]
    fn test_default_query_returns_first_page() {
        let resp = query_products(&sample_products(), &ProductQuery::default());
        assert_eq!(resp.products.len(), 5);
        assert_eq!(
            resp.pagination,
            Pagination {
                total: 5,
                page: 1,
                limit: 10,
                total_pages: 1
            }
        );
    }

    #[test]
    fn test_search_matches_name_and_description() {
        let query = ProductQuery {
            search: Some("CÁPSULAS".to_string()),
            ..Default::default()
        };
        let resp = query_products(&sample_products(), &query);
        assert_eq!(ids(&resp), vec!["med-001", "med-005"]);

        let query = ProductQuery {
            search: Some("ibupro".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query_products(&sample_products(), &query)), vec!["med-004"]);
    }

    #[test]
    fn test_sort_and_order() {
        let query = ProductQuery {
            sort_by: Some(SortField::Precio),
            order: Some(SortOrder::Desc),
            ..Default::default()
        };
        let resp = query_products(&sample_products(), &query);
        assert_eq!(ids(&resp), vec!["med-003", "med-005", "med-001", "med-004", "med-002"]);

        let query = ProductQuery {
            sort_by: Some(SortField::FechaVencimiento),
            ..Default::default()
        };
        let resp = query_products(&sample_products(), &query);
        assert_eq!(resp.products[0].id, "med-002");
    }

    #[test]
    fn test_pagination() {
        let query = ProductQuery {
            page: Some(2),
            limit: Some(2),
            sort_by: Some(SortField::Nombre),
            ..Default::default()
        };
        let resp = query_products(&sample_products(), &query);
        // Amoxicilina, Ibuprofeno | Jarabe, Omeprazol | Paracetamol
        assert_eq!(ids(&resp), vec!["med-003", "med-005"]);
        assert_eq!(resp.pagination.total_pages, 3);
        assert_eq!(resp.pagination.total, 5);

        let query = ProductQuery {
            page: Some(9),
            ..Default::default()
        };
        assert!(query_products(&sample_products(), &query).products.is_empty());
    }
}
