use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::document::parser::ParseError;
use crate::document::render::RenderError;
use crate::workflow::classifier::ClassificationError;
use crate::workflow::engine::WorkflowError;
use crate::workflow::router::RoutingError;
use crate::workflow::store::PersistenceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Classification(e) => AppError::Classification(e),
            WorkflowError::Routing(e) => AppError::Routing(e),
            WorkflowError::Persistence(e) => AppError::Persistence(e),
        }
    }
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::UnsupportedFormat(_) => AppError::Validation(e.to_string()),
            ParseError::Pdf(_) | ParseError::Docx(_) => {
                AppError::Internal(anyhow::anyhow!("Error processing file: {e}"))
            }
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Classification(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Routing(_) | AppError::Render(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Classification(e) => {
                tracing::error!("Classification error: {e}");
                ("CLASSIFICATION_ERROR", e.to_string())
            }
            AppError::Routing(e) => {
                tracing::error!("Routing error: {e}");
                ("ROUTING_ERROR", e.to_string())
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    "PERSISTENCE_ERROR",
                    "The session store is unavailable".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                ("RENDER_ERROR", e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ("INTERNAL_ERROR", e.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}
