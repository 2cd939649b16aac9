use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::{join_all, try_join_all};
use reqwest::Client;

use crate::config::AnalysisConfig;
use crate::models::analysis::{
    AnalysisMetadata, AnalysisMode, AnalysisOutcome, AnalysisRequest, BatchAnalysis,
    BatchMetadata, CombinedAnalysis, ImageAnalysisOutcome, StructuredRecord,
};
use crate::services::extraction::{FencedJsonExtractor, ResponseExtractor};
use crate::services::gemini::{build_prompt_parts, GeminiClient, VisionModel};
use crate::services::image_fetcher::{HttpImageFetcher, ImageSource};
use crate::services::prompt::{
    COMBINED_INSTRUCTION, PRODUCT_ANALYSIS_SYSTEM_PROMPT, SINGLE_IMAGE_INSTRUCTION,
};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid analysis request: {0}")]
    Validation(String),

    #[error("Failed to fetch image from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to parse AI response as JSON: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("AI analysis is not configured: {0}")]
    UpstreamConfiguration(String),

    #[error("AI model invocation failed: {0}")]
    ModelInvocation(String),
}

/// Coordinates image fetching, model invocation and response extraction.
///
/// Combined mode is all-or-nothing: the first failed fetch aborts the
/// batch and the remaining in-flight fetches are dropped. Per-image mode
/// runs one independent pipeline per URL and reports each outcome at its
/// input index.
pub struct ProductAnalyzer {
    images: Arc<dyn ImageSource>,
    model: Arc<dyn VisionModel>,
    extractor: Arc<dyn ResponseExtractor>,
}

impl ProductAnalyzer {
    pub fn new(
        images: Arc<dyn ImageSource>,
        model: Arc<dyn VisionModel>,
        extractor: Arc<dyn ResponseExtractor>,
    ) -> Self {
        Self {
            images,
            model,
            extractor,
        }
    }

    /// Build the production analyzer (HTTP fetcher + Gemini). Fails when no
    /// API key is configured.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AnalysisError::UpstreamConfiguration("GEMINI_API_KEY is required".to_string())
            })?;

        let http = Client::new();
        let model = GeminiClient::new(
            http.clone(),
            api_key.to_string(),
            config.model.clone(),
            config.base_url.clone(),
            PRODUCT_ANALYSIS_SYSTEM_PROMPT.to_string(),
        );

        Ok(Self::new(
            Arc::new(HttpImageFetcher::new(http)),
            Arc::new(model),
            Arc::new(FencedJsonExtractor),
        ))
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Run the analysis in the mode carried by the request.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        match request.mode() {
            AnalysisMode::Combined => self.analyze_combined(request).await.map(AnalysisOutcome::Combined),
            AnalysisMode::PerImage => Ok(AnalysisOutcome::PerImage(
                self.analyze_individually(request).await,
            )),
        }
    }

    /// One model call spanning every image in the request.
    pub async fn analyze_combined(
        &self,
        request: &AnalysisRequest,
    ) -> Result<CombinedAnalysis, AnalysisError> {
        let urls = request.image_urls();
        let start = Instant::now();
        metrics::counter!("analysis_requests_total", "mode" => "combined").increment(1);

        let result = self.run_combined(urls).await;
        metrics::histogram!("analysis_duration_seconds", "mode" => "combined")
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(analysis) => {
                tracing::info!(
                    image_count = urls.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Combined image analysis complete"
                );
                Ok(CombinedAnalysis {
                    analysis,
                    metadata: AnalysisMetadata {
                        image_count: urls.len(),
                        model_used: self.model_id().to_string(),
                        analysis_timestamp: Utc::now(),
                    },
                })
            }
            Err(e) => {
                metrics::counter!("analysis_requests_failed_total", "mode" => "combined")
                    .increment(1);
                tracing::warn!(image_count = urls.len(), error = %e, "Combined image analysis failed");
                Err(e)
            }
        }
    }

    /// One independent pipeline per image; failures stay with their image.
    pub async fn analyze_individually(&self, request: &AnalysisRequest) -> BatchAnalysis {
        let urls = request.image_urls();
        let start = Instant::now();
        metrics::counter!("analysis_requests_total", "mode" => "per_image").increment(1);

        let analyses = join_all(urls.iter().enumerate().map(|(image_index, url)| async move {
            let result = self.run_single(url).await;
            if let Err(e) = &result {
                tracing::warn!(image_index, url = %url, error = %e, "Image analysis failed");
            }
            ImageAnalysisOutcome {
                image_url: url.clone(),
                image_index,
                result,
            }
        }))
        .await;

        let succeeded = analyses.iter().filter(|a| a.is_success()).count();
        let failed = analyses.len() - succeeded;

        metrics::histogram!("analysis_duration_seconds", "mode" => "per_image")
            .record(start.elapsed().as_secs_f64());
        if failed > 0 {
            metrics::counter!("analysis_images_failed_total").increment(failed as u64);
        }

        tracing::info!(
            image_count = urls.len(),
            succeeded,
            failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Per-image analysis complete"
        );

        BatchAnalysis {
            analyses,
            metadata: BatchMetadata {
                image_count: urls.len(),
                successful_analyses: succeeded,
                failed_analyses: failed,
                model_used: self.model_id().to_string(),
                analysis_timestamp: Utc::now(),
            },
        }
    }

    async fn run_combined(&self, urls: &[String]) -> Result<StructuredRecord, AnalysisError> {
        let payloads = try_join_all(urls.iter().map(|url| self.images.fetch(url))).await?;
        let parts = build_prompt_parts(COMBINED_INSTRUCTION, payloads)?;
        let raw = self.model.generate(&parts).await?;
        self.extractor.extract(&raw)
    }

    async fn run_single(&self, url: &str) -> Result<StructuredRecord, AnalysisError> {
        let payload = self.images.fetch(url).await?;
        let parts = build_prompt_parts(SINGLE_IMAGE_INSTRUCTION, vec![payload])?;
        let raw = self.model.generate(&parts).await?;
        self.extractor.extract(&raw)
    }
}
