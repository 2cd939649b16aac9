use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::response::ErrorBody;

pub mod analysis;
pub mod folders;
pub mod health;
pub mod metrics;
pub mod products;

/// Parse a path id, answering 400 instead of axum's plain-text rejection.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid ID: {raw}")))
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            message: "Route not found".to_string(),
            errors: None,
            timestamp: Utc::now(),
        }),
    )
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            post(products::create_product).get(products::list_products),
        )
        .route("/products/bulk", post(products::bulk_create_products))
        .route("/products/stats", get(products::product_stats))
        .route("/products/metadata/{field}", get(products::product_metadata))
        .route(
            "/products/category/{category}",
            get(products::products_by_category),
        )
        .route("/products/brand/{brand}", get(products::products_by_brand))
        .route("/products/analyze-images", post(analysis::analyze_images))
        .route(
            "/products/analyze-and-create",
            post(analysis::analyze_and_create),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/folders",
            post(folders::create_folder).get(folders::list_folders),
        )
        .route(
            "/folders/by-product/{product_id}",
            get(folders::folders_by_product),
        )
        .route(
            "/folders/{id}",
            get(folders::get_folder)
                .put(folders::update_folder)
                .delete(folders::delete_folder),
        )
        .route("/folders/{id}/add-products", post(folders::add_products))
        .route(
            "/folders/{id}/remove-products",
            post(folders::remove_products),
        )
}

/// Build the full HTTP router. `/metrics` is mounted only when a
/// Prometheus recorder handle is supplied.
pub fn router(
    state: AppState,
    prometheus: Option<PrometheusHandle>,
    max_body_bytes: usize,
) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes());

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(Arc::new(handle)),
        );
    }

    app.fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("not-a-uuid"), Err(AppError::BadRequest(_))));
    }
}
