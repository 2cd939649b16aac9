use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Serialize;

use crate::app_state::AppState;
use crate::db::product_queries;
use crate::error::AppError;
use crate::models::analysis::{
    AnalysisMode, AnalysisOutcome, AnalysisRequest, AnalyzeAndCreateRequest,
    AnalyzeImagesRequest, CombinedAnalysis,
};
use crate::models::product::Product;
use crate::models::response::ApiResponse;
use crate::services::product_mapper::map_product_draft;

#[derive(Debug, Serialize)]
pub struct AnalyzedProduct {
    pub product: Product,
    pub analysis: CombinedAnalysis,
}

/// POST /api/v1/products/analyze-images
pub async fn analyze_images(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeImagesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AnalysisOutcome>>, AppError> {
    let Json(body) = body?;
    body.validate()?;

    let analyzer = state.analyzer()?;
    let mode = body.mode();
    let request = AnalysisRequest::new(body.image_urls, mode)?;

    tracing::info!(
        image_count = request.image_urls().len(),
        mode = mode.as_str(),
        "Analyzing product images"
    );
    let outcome = analyzer.analyze(&request).await?;

    let message = match mode {
        AnalysisMode::Combined => "Images analyzed successfully",
        AnalysisMode::PerImage => "Images analyzed individually",
    };
    Ok(Json(ApiResponse::new(outcome, message)))
}

/// POST /api/v1/products/analyze-and-create
pub async fn analyze_and_create(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeAndCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AnalyzedProduct>>), AppError> {
    let Json(body) = body?;
    body.validate()?;

    let analyzer = state.analyzer()?;
    let request = AnalysisRequest::new(body.image_urls, AnalysisMode::Combined)?;
    let analysis = analyzer.analyze_combined(&request).await?;

    let mut product = map_product_draft(
        &analysis.analysis,
        &body.additional_data,
        request.image_urls(),
    )
    .into_new_product()
    .map_err(AppError::Validation)?;
    product.normalize();
    product.validate()?;

    let product = product_queries::create_product(&state.db, &product).await?;
    metrics::counter!("products_created_total").increment(1);
    tracing::info!(
        product_id = %product.id,
        image_count = request.image_urls().len(),
        "Product created from image analysis"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            AnalyzedProduct { product, analysis },
            "Product created from image analysis successfully",
        )),
    ))
}
