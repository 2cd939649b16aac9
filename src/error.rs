use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use crate::models::response::ErrorBody;
use crate::services::analyzer::AnalysisError;

/// Errors surfaced by HTTP handlers, rendered as the JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Analysis(e) => match e {
                AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
                AnalysisError::UpstreamConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AnalysisError::Fetch { .. }
                | AnalysisError::MalformedResponse { .. }
                | AnalysisError::ModelInvocation(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, errors) = match self {
            AppError::Validation(errors) => (self.to_string(), Some(errors.clone())),
            AppError::Analysis(AnalysisError::UpstreamConfiguration(_)) => {
                ("AI service is not configured".to_string(), None)
            }
            // Driver messages can leak schema details.
            AppError::Database(_) => ("Internal server error".to_string(), None),
            other => (other.to_string(), None),
        };

        ErrorBody {
            success: false,
            message,
            errors,
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(
            report
                .iter()
                .map(|(path, error)| format!("{path}: {error}"))
                .collect(),
        )
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
