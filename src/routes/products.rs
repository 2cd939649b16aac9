use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app_state::AppState;
use crate::db::product_queries::{self, MetadataField};
use crate::error::AppError;
use crate::models::product::{NewProduct, Product, ProductFilter, ProductStats};
use crate::models::response::{ApiResponse, PageParams, Pagination};
use crate::routes::parse_id;

/// Upper bound on products per bulk insert.
pub const MAX_BULK_PRODUCTS: usize = 50;

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<ProductFilter>,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    #[serde(default)]
    pub products: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct BulkCreated {
    pub products: Vec<Product>,
    pub count: usize,
}

/// Normalize then validate a product payload.
fn prepare(mut product: NewProduct) -> Result<NewProduct, AppError> {
    product.normalize();
    product.validate()?;
    Ok(product)
}

async fn page_of(
    state: &AppState,
    filter: ProductFilter,
    page: PageParams,
    echo_filters: bool,
) -> Result<ProductPage, AppError> {
    let (products, total) = product_queries::list_products(&state.db, &filter, page).await?;
    Ok(ProductPage {
        products,
        pagination: Pagination::new(page, total),
        filters: echo_filters.then_some(filter),
    })
}

/// POST /api/v1/products
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), AppError> {
    let Json(product) = body?;
    let product = prepare(product)?;

    let product = product_queries::create_product(&state.db, &product).await?;
    metrics::counter!("products_created_total").increment(1);
    tracing::info!(product_id = %product.id, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(product, "Product created successfully")),
    ))
}

/// GET /api/v1/products
pub async fn list_products(
    State(state): State<AppState>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
    page: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ApiResponse<ProductPage>>, AppError> {
    let Query(filter) = filter?;
    let Query(page) = page?;

    let data = page_of(&state, filter, page, true).await?;
    Ok(Json(ApiResponse::new(data, "Products retrieved successfully")))
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let id = parse_id(&id)?;
    let product = product_queries::get_product(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ApiResponse::new(product, "Product retrieved successfully")))
}

/// PUT /api/v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let id = parse_id(&id)?;
    let Json(product) = body?;
    let product = prepare(product)?;

    let product = product_queries::update_product(&state.db, id, &product)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    tracing::info!(product_id = %product.id, "Product updated");

    Ok(Json(ApiResponse::new(product, "Product updated successfully")))
}

/// DELETE /api/v1/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let id = parse_id(&id)?;
    let product = product_queries::delete_product(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    tracing::info!(product_id = %product.id, "Product deleted");

    Ok(Json(ApiResponse::new(product, "Product deleted successfully")))
}

/// GET /api/v1/products/category/{category}
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    page: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ApiResponse<ProductPage>>, AppError> {
    let Query(page) = page?;
    let data = page_of(&state, ProductFilter::by_category(category), page, false).await?;
    Ok(Json(ApiResponse::new(data, "Products retrieved successfully")))
}

/// GET /api/v1/products/brand/{brand}
pub async fn products_by_brand(
    State(state): State<AppState>,
    Path(brand): Path<String>,
    page: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ApiResponse<ProductPage>>, AppError> {
    let Query(page) = page?;
    let data = page_of(&state, ProductFilter::by_brand(brand), page, false).await?;
    Ok(Json(ApiResponse::new(data, "Products retrieved successfully")))
}

/// Deserialize and validate every bulk item, collecting errors by index.
pub fn prepare_bulk(items: Vec<Value>) -> Result<Vec<NewProduct>, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Products array is required and cannot be empty".to_string(),
        ));
    }
    if items.len() > MAX_BULK_PRODUCTS {
        return Err(AppError::BadRequest(format!(
            "Maximum {MAX_BULK_PRODUCTS} products allowed per bulk operation"
        )));
    }

    let mut prepared = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let product = serde_json::from_value::<NewProduct>(item)
            .map_err(|e| AppError::Validation(vec![e.to_string()]))
            .and_then(prepare);
        match product {
            Ok(product) => prepared.push(product),
            Err(AppError::Validation(item_errors)) => errors.extend(
                item_errors
                    .into_iter()
                    .map(|error| format!("products[{index}]: {error}")),
            ),
            Err(other) => return Err(other),
        }
    }

    if errors.is_empty() {
        Ok(prepared)
    } else {
        Err(AppError::Validation(errors))
    }
}

/// POST /api/v1/products/bulk
pub async fn bulk_create_products(
    State(state): State<AppState>,
    body: Result<Json<BulkCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<BulkCreated>>), AppError> {
    let Json(request) = body?;
    let products = prepare_bulk(request.products)?;

    let products = product_queries::create_products(&state.db, &products).await?;
    metrics::counter!("products_created_total").increment(products.len() as u64);
    tracing::info!(count = products.len(), "Bulk products created");

    let count = products.len();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            BulkCreated { products, count },
            "Products created successfully",
        )),
    ))
}

/// GET /api/v1/products/stats
pub async fn product_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProductStats>>, AppError> {
    let stats = product_queries::product_stats(&state.db).await?;
    Ok(Json(ApiResponse::new(
        stats,
        "Product statistics retrieved successfully",
    )))
}

/// GET /api/v1/products/metadata/{field}
pub async fn product_metadata(
    State(state): State<AppState>,
    Path(field): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let field = MetadataField::from_str(&field)
        .map_err(|_| AppError::NotFound(format!("Unknown metadata field: {field}")))?;

    let values = product_queries::distinct_values(&state.db, field).await?;
    Ok(Json(ApiResponse::new(
        values,
        format!("Product {field} retrieved successfully"),
    )))
}
