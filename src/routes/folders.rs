use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{folder_queries, product_queries};
use crate::error::AppError;
use crate::models::folder::{
    dedup_ids, CreateFolderRequest, Folder, FolderProductsRequest, FolderQuery,
    UpdateFolderRequest,
};
use crate::models::response::{ApiResponse, PageParams, Pagination};
use crate::routes::parse_id;

#[derive(Debug, Serialize)]
pub struct FolderPage {
    pub folders: Vec<Folder>,
    pub pagination: Pagination,
}

fn folder_not_found() -> AppError {
    AppError::NotFound("Folder not found".to_string())
}

/// Reject the request unless every id names an existing product.
async fn ensure_products_exist(state: &AppState, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
    let ids = dedup_ids(ids);
    if ids.is_empty() {
        return Ok(ids);
    }
    let found = product_queries::count_existing(&state.db, &ids).await?;
    if found != ids.len() as i64 {
        return Err(AppError::BadRequest(
            "One or more product IDs are invalid".to_string(),
        ));
    }
    Ok(ids)
}

/// POST /api/v1/folders
pub async fn create_folder(
    State(state): State<AppState>,
    body: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Folder>>), AppError> {
    let Json(mut body) = body?;
    body.name = body.name.trim().to_string();
    body.validate()?;

    let ids = ensure_products_exist(&state, &body.product_ids).await?;
    let folder = folder_queries::create_folder(&state.db, &body.name, &ids).await?;
    tracing::info!(folder_id = %folder.id, products = folder.product_count, "Folder created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(folder, "Folder created successfully")),
    ))
}

/// GET /api/v1/folders
pub async fn list_folders(
    State(state): State<AppState>,
    query: Result<Query<FolderQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<FolderPage>>, AppError> {
    let Query(query) = query?;
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let (folders, total) =
        folder_queries::list_folders(&state.db, query.search.as_deref(), page).await?;

    Ok(Json(ApiResponse::new(
        FolderPage {
            folders,
            pagination: Pagination::new(page, total),
        },
        "Folders retrieved successfully",
    )))
}

/// GET /api/v1/folders/{id}
pub async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Folder>>, AppError> {
    let id = parse_id(&id)?;
    let folder = folder_queries::get_folder(&state.db, id)
        .await?
        .ok_or_else(folder_not_found)?;

    Ok(Json(ApiResponse::new(folder, "Folder retrieved successfully")))
}

/// PUT /api/v1/folders/{id}
pub async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateFolderRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Folder>>, AppError> {
    let id = parse_id(&id)?;
    let Json(mut body) = body?;
    body.name = body.name.map(|name| name.trim().to_string());
    body.validate()?;

    let ids = match &body.product_ids {
        Some(ids) => Some(ensure_products_exist(&state, ids).await?),
        None => None,
    };

    let folder = folder_queries::update_folder(&state.db, id, body.name.as_deref(), ids.as_deref())
        .await?
        .ok_or_else(folder_not_found)?;
    tracing::info!(folder_id = %folder.id, "Folder updated");

    Ok(Json(ApiResponse::new(folder, "Folder updated successfully")))
}

/// DELETE /api/v1/folders/{id}
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>, AppError> {
    let id = parse_id(&id)?;
    if !folder_queries::delete_folder(&state.db, id).await? {
        return Err(folder_not_found());
    }
    tracing::info!(folder_id = %id, "Folder deleted");

    Ok(Json(ApiResponse::new(None, "Folder deleted successfully")))
}

/// POST /api/v1/folders/{id}/add-products
pub async fn add_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FolderProductsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Folder>>, AppError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    body.validate()?;

    let ids = ensure_products_exist(&state, &body.product_ids).await?;
    let folder = folder_queries::add_products(&state.db, id, &ids)
        .await?
        .ok_or_else(folder_not_found)?;

    Ok(Json(ApiResponse::new(
        folder,
        "Products added to folder successfully",
    )))
}

/// POST /api/v1/folders/{id}/remove-products
pub async fn remove_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FolderProductsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Folder>>, AppError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    body.validate()?;

    let folder = folder_queries::remove_products(&state.db, id, &dedup_ids(&body.product_ids))
        .await?
        .ok_or_else(folder_not_found)?;

    Ok(Json(ApiResponse::new(
        folder,
        "Products removed from folder successfully",
    )))
}

/// GET /api/v1/folders/by-product/{product_id}
pub async fn folders_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Folder>>>, AppError> {
    let product_id = parse_id(&product_id)?;
    if product_queries::get_product(&state.db, product_id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let folders = folder_queries::folders_by_product(&state.db, product_id).await?;
    Ok(Json(ApiResponse::new(
        folders,
        "Folders retrieved successfully",
    )))
}
