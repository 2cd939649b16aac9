use sqlx::PgPool;
use std::sync::Arc;

use crate::error::AppError;
use crate::services::analyzer::{AnalysisError, ProductAnalyzer};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub analyzer: Option<Arc<ProductAnalyzer>>,
}

impl AppState {
    pub fn new(db: PgPool, analyzer: Option<ProductAnalyzer>) -> Self {
        Self {
            db,
            analyzer: analyzer.map(Arc::new),
        }
    }

    /// The configured analyzer, or the configuration error when AI is off.
    pub fn analyzer(&self) -> Result<Arc<ProductAnalyzer>, AppError> {
        self.analyzer.clone().ok_or_else(|| {
            AnalysisError::UpstreamConfiguration("GEMINI_API_KEY is required".to_string()).into()
        })
    }
}
